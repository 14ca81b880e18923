//! The multicast byte source: joins an IPv4 multicast group on a
//! per-channel UDP port derived from the low octet of the group address,
//! and implements [`nbs_transport::io::Read`] so `FrameReader` can treat
//! it like any other byte source.
//!
//! This is the one minimal, concrete implementation of the out-of-scope
//! "UDP/multicast socket wrapper": it joins, reads, and reports EOF/IO —
//! no loss simulation, no IGMPv3 source filtering.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use nbs_transport::error::Error as CoreError;
use nbs_transport::io::{Read, ReadOutcome};

use crate::error::{PipelineError, Result};

/// A bound, joined UDP multicast socket.
///
/// `socket2` sets up options `std::net::UdpSocket` has no portable way to
/// reach (reuse-address, explicit multicast join); once configured, the
/// socket is converted into a plain `UdpSocket` for the actual reads.
#[derive(Debug)]
pub struct MulticastSocket {
    socket: UdpSocket,
}

impl MulticastSocket {
    /// Joins `group` on `iface`, binding to the UDP port derived from the
    /// group address's low octet, as `spec.md` §6 describes.
    pub fn join(group: Ipv4Addr, iface: Ipv4Addr) -> Result<Self> {
        if !group.is_multicast() {
            return Err(PipelineError::BadAddress(format!(
                "{group} is not a multicast address"
            )));
        }

        let port = 1000 + u16::from(group.octets()[3]);
        let raw = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(PipelineError::Socket)?;
        raw.set_reuse_address(true).map_err(PipelineError::Socket)?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
        raw.bind(&bind_addr.into()).map_err(PipelineError::Socket)?;
        raw.join_multicast_v4(&group, &iface)
            .map_err(PipelineError::Socket)?;
        raw.set_read_timeout(Some(Duration::from_millis(500)))
            .map_err(PipelineError::Socket)?;

        log::info!("joined multicast group {group} on iface {iface}, port {port}");
        Ok(Self { socket: raw.into() })
    }

    /// The local address this socket is bound to, for logging.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(PipelineError::Socket)
    }
}

impl Read for MulticastSocket {
    fn read(&mut self, buf: &mut [u8]) -> nbs_transport::Result<ReadOutcome> {
        match self.socket.recv(buf) {
            Ok(n) => Ok(ReadOutcome::Read(n)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(ReadOutcome::Interrupted),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(ReadOutcome::Interrupted),
            Err(e) => {
                log::error!("multicast socket read failed: {e}");
                Err(CoreError::Io)
            }
        }
    }
}
