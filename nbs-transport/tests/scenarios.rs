//! End-to-end scenarios driving the reader, the queue, and the transport
//! layer together, the way `nbs-pipeline` wires them across two threads.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use nbs_transport::error::Error;
use nbs_transport::header::{
    FrameHeader, ProdType, TransType, FH_SIZE, PDH_MIN_SIZE, SBN_COMMAND_DATA, SBN_COMMAND_SYNC,
    SENTINEL,
};
use nbs_transport::{FrameQueue, FrameReader, PresentationSink, TransportLayer};

#[derive(Default, Clone)]
struct RecordingSink {
    calls: Rc<RefCell<Vec<String>>>,
}

impl PresentationSink for RecordingSink {
    fn gini_start(
        &mut self,
        _buf: &[u8],
        _rec_len: u16,
        _recs_per_block: u8,
        _is_compressed: bool,
        _prod_type: ProdType,
        _size_estimate: u32,
    ) -> nbs_transport::Result<()> {
        self.calls.borrow_mut().push("gini_start".into());
        Ok(())
    }

    fn gini_block(&mut self, _buf: &[u8], block_num: u16, _is_compressed: bool) -> nbs_transport::Result<()> {
        self.calls.borrow_mut().push(format!("gini_block({block_num})"));
        Ok(())
    }

    fn nongoes(&mut self, _buf: &[u8], _is_start: bool, _is_end: bool, _is_compressed: bool) -> nbs_transport::Result<()> {
        Ok(())
    }

    fn nwstg(&mut self, _buf: &[u8], is_start: bool, is_end: bool) -> nbs_transport::Result<()> {
        self.calls.borrow_mut().push(format!("nwstg({is_start},{is_end})"));
        Ok(())
    }

    fn nexrad(&mut self, _buf: &[u8], _is_start: bool, _is_end: bool) -> nbs_transport::Result<()> {
        Ok(())
    }

    fn end_product(&mut self) -> nbs_transport::Result<()> {
        self.calls.borrow_mut().push("end_product".into());
        Ok(())
    }
}

fn encode_data_frame(seq: u32, run: u16, start: bool, prod_seq: u32, prod_type: u8, block: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; FH_SIZE];
    let fh = FrameHeader {
        hdlc_address: SENTINEL,
        hdlc_control: 0,
        sbn_version: 1,
        sbn_length: FH_SIZE as u8,
        sbn_control: 0,
        sbn_command: SBN_COMMAND_DATA,
        sbn_data_stream: 0,
        sbn_source: 0,
        sbn_destination: 0,
        sbn_sequence_num: seq,
        sbn_run: run,
        sbn_checksum: 0,
    };
    fh.encode(&mut out).unwrap();

    let total_header_size: u16 = if start { 48 } else { 16 };
    let mut pdh = vec![0u8; PDH_MIN_SIZE];
    pdh[0] = 0x14;
    pdh[1] = if start {
        TransType::START_OF_PRODUCT.bits()
    } else {
        TransType::TRANSFER_IN_PROGRESS.bits()
    };
    pdh[2..4].copy_from_slice(&total_header_size.to_be_bytes());
    pdh[6..8].copy_from_slice(&total_header_size.to_be_bytes());
    pdh[8..10].copy_from_slice(&(block.len() as u16).to_be_bytes());
    pdh[10] = 1;
    pdh[11] = 1;
    pdh[12..16].copy_from_slice(&prod_seq.to_be_bytes());
    out.extend_from_slice(&pdh);

    if start {
        let mut psh = vec![0u8; 32];
        psh[18] = prod_type;
        out.extend_from_slice(&psh);
    }
    out.extend_from_slice(block);
    out
}

#[test]
fn scenario_1_leading_garbage_byte_is_skipped() {
    let mut bytes = vec![0xFEu8];
    bytes.extend(encode_data_frame(0, 0, true, 1, 5, b"0123456789"));
    let mut reader = FrameReader::new(bytes.as_slice(), 4096);
    let frame = reader.next_frame().unwrap();
    assert_eq!(frame.data(), b"0123456789");
}

#[test]
fn scenario_2_start_then_continuation_via_queue_and_transport() {
    let queue = Arc::new(FrameQueue::new(8192));

    let start = encode_data_frame(0, 0, true, 42, 5, b"start-data");
    let cont = encode_data_frame(1, 0, false, 42, 0, b"cont-data");

    for frame in [&start, &cont] {
        let slice = queue.reserve(frame.len()).unwrap();
        slice.copy_from_slice(frame);
        queue.release(frame.len()).unwrap();
    }
    queue.shutdown();

    let sink = RecordingSink::default();
    let calls = Rc::clone(&sink.calls);
    let mut transport = TransportLayer::new(sink);

    loop {
        match queue.peek() {
            Ok(bytes) => {
                let result = transport.process_bytes(bytes);
                queue.remove().unwrap();
                if let Err(e) = result {
                    assert!(e.is_locally_recovered());
                }
            }
            Err(Error::Shutdown) => break,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    // The continuation carries no PSH; its prod_type is re-derived from
    // the retained start frame's type, so both calls land.
    assert_eq!(
        *calls.borrow(),
        vec!["nwstg(true,false)", "nwstg(false,false)"]
    );
}

#[test]
fn scenario_3_bad_checksum_resyncs_then_recovers() {
    let mut bad = encode_data_frame(0, 0, true, 1, 5, b"abc");
    bad[15] ^= 0xFF;
    let mut bytes = bad;
    bytes.extend(encode_data_frame(1, 0, false, 1, 0, b"defgh"));

    let mut reader = FrameReader::new(bytes.as_slice(), 4096);
    let frame = reader.next_frame().unwrap();
    assert_eq!(frame.data(), b"defgh");
}

#[test]
fn scenario_4_product_transition_then_no_start() {
    let sink = RecordingSink::default();
    let calls = Rc::clone(&sink.calls);
    let mut transport = TransportLayer::new(sink);

    let start = encode_data_frame(0, 0, true, 42, 5, b"a");
    transport.process_bytes(&start).unwrap();

    let other = encode_data_frame(1, 0, false, 99, 0, b"b");
    assert_eq!(transport.process_bytes(&other), Err(Error::NoStart));

    assert_eq!(*calls.borrow(), vec!["nwstg(true,false)", "end_product"]);
}

#[test]
fn scenario_6_time_frame_between_data_frames_leaves_state_unchanged() {
    let mut out = vec![0u8; FH_SIZE];
    let sync_fh = FrameHeader {
        hdlc_address: SENTINEL,
        hdlc_control: 0,
        sbn_version: 1,
        sbn_length: FH_SIZE as u8,
        sbn_control: 0,
        sbn_command: SBN_COMMAND_SYNC,
        sbn_data_stream: 0,
        sbn_source: 0,
        sbn_destination: 0,
        sbn_sequence_num: 5,
        sbn_run: 0,
        sbn_checksum: 0,
    };
    sync_fh.encode(&mut out).unwrap();
    out.extend_from_slice(&[0u8; 32]);

    let mut transport = TransportLayer::new(RecordingSink::default());
    let start = encode_data_frame(0, 0, true, 42, 5, b"a");
    transport.process_bytes(&start).unwrap();
    transport.process_bytes(&out).unwrap();

    let cont = encode_data_frame(2, 0, false, 42, 0, b"b");
    // Continuation dispatches successfully via the retained prod_type,
    // proving start_processed (and the type) survived the intervening
    // sync frame untouched.
    transport.process_bytes(&cont).unwrap();
}

#[test]
fn round_trip_law_decoded_fields_match_originals() {
    let bytes = encode_data_frame(123, 4, true, 99, 6, b"round-trip-block");
    let mut reader = FrameReader::new(bytes.as_slice(), 4096);
    let frame = reader.next_frame().unwrap();

    assert_eq!(frame.fh.sbn_sequence_num, 123);
    assert_eq!(frame.fh.sbn_run, 4);
    let pdh = frame.pdh.unwrap();
    assert_eq!(pdh.prod_sequence_num, 99);
    assert!(pdh.trans_type.contains(TransType::START_OF_PRODUCT));
    let psh = frame.psh.unwrap();
    assert_eq!(psh.prod_type, ProdType::Nexrad);
    assert_eq!(frame.data(), b"round-trip-block");
}

#[test]
fn round_trip_law_n_blocks_then_end_product() {
    // §8 round-trip law #2: a start frame followed by N-1 continuations
    // dispatches one start call, N-1 continuation calls, and exactly one
    // `end_product` once the next product's start frame arrives.
    let sink = RecordingSink::default();
    let calls = Rc::clone(&sink.calls);
    let mut transport = TransportLayer::new(sink);

    let start = encode_data_frame(0, 0, true, 1, 5, b"block-0");
    transport.process_bytes(&start).unwrap();
    for i in 1..5u32 {
        let cont = encode_data_frame(i, 0, false, 1, 0, format!("block-{i}").as_bytes());
        transport.process_bytes(&cont).unwrap();
    }

    let next_start = encode_data_frame(5, 0, true, 2, 5, b"next-product");
    transport.process_bytes(&next_start).unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![
            "nwstg(true,false)",
            "nwstg(false,false)",
            "nwstg(false,false)",
            "nwstg(false,false)",
            "nwstg(false,false)",
            "end_product",
            "nwstg(true,false)",
        ]
    );
}

#[test]
fn reader_and_queue_single_producer_single_consumer_thread_pair() {
    let queue = Arc::new(FrameQueue::new(16 * 1024));
    let frames: Vec<Vec<u8>> = (0..50)
        .map(|i| encode_data_frame(i, 0, i == 0, 7, 5, format!("block-{i}").as_bytes()))
        .collect();
    let mut stream = Vec::new();
    for f in &frames {
        stream.extend_from_slice(f);
    }

    let producer_queue = Arc::clone(&queue);
    let producer = thread::spawn(move || {
        let mut reader = FrameReader::new(stream.as_slice(), 4096);
        loop {
            match reader.next_frame() {
                Ok(frame) => {
                    let slice = producer_queue.reserve(frame.bytes.len()).unwrap();
                    slice.copy_from_slice(frame.bytes);
                    producer_queue.release(frame.bytes.len()).unwrap();
                }
                Err(Error::Eof) => break,
                Err(e) => panic!("unexpected reader error: {e:?}"),
            }
        }
        producer_queue.shutdown();
    });

    let consumer_queue = Arc::clone(&queue);
    let consumer = thread::spawn(move || {
        let sink = RecordingSink::default();
        let mut transport = TransportLayer::new(sink);
        let mut processed = 0;
        loop {
            match consumer_queue.peek() {
                Ok(bytes) => {
                    let _ = transport.process_bytes(bytes);
                    consumer_queue.remove().unwrap();
                    processed += 1;
                }
                Err(Error::Shutdown) => break,
                Err(e) => panic!("unexpected queue error: {e:?}"),
            }
        }
        processed
    });

    producer.join().unwrap();
    let processed = consumer.join().unwrap();
    assert_eq!(processed, 50);
}
