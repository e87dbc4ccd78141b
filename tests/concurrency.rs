#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Concurrency tests: the shared queue under many producers, and the
//! codec hammered from parallel tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use gamewire::core::codec::MessageCodec;
use gamewire::{Message, MessageKind, SharedDeque};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Data,
}

impl MessageKind for Tag {
    fn to_wire(self) -> u32 {
        0
    }

    fn from_wire(raw: u32) -> Option<Self> {
        (raw == 0).then_some(Tag::Data)
    }
}

#[test]
fn concurrent_pushes_drain_exactly_once() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 1_000;

    let queue = Arc::new(SharedDeque::new());

    let mut producers = Vec::new();
    for producer in 0..PRODUCERS {
        let queue = Arc::clone(&queue);
        producers.push(std::thread::spawn(move || {
            for i in 0..PER_PRODUCER {
                queue.push_back((producer, i));
            }
        }));
    }
    for producer in producers {
        producer.join().expect("producer thread");
    }

    // Sequential drain recovers every pushed item, no loss, no
    // duplication.
    let mut seen = vec![[false; PER_PRODUCER]; PRODUCERS];
    let mut drained = 0;
    while let Some((producer, i)) = queue.pop_front() {
        assert!(!seen[producer][i], "duplicate item ({producer}, {i})");
        seen[producer][i] = true;
        drained += 1;
    }
    assert_eq!(drained, PRODUCERS * PER_PRODUCER);
    assert!(queue.is_empty());
}

#[test]
fn wait_wakes_for_each_of_many_producers() {
    const ROUNDS: usize = 20;

    let queue = Arc::new(SharedDeque::new());
    let producer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            for i in 0..ROUNDS {
                std::thread::sleep(Duration::from_millis(5));
                queue.push_back(i);
            }
        })
    };

    let start = Instant::now();
    for _ in 0..ROUNDS {
        queue.wait();
        let _ = queue.pop_front().expect("wait implies non-empty");
    }
    assert!(start.elapsed() < Duration::from_secs(10));

    producer.join().expect("producer thread");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    use tokio::task::JoinSet;

    let iterations = 2_000usize;
    let payload_sizes = [0usize, 64, 512, 4096, 65536];

    let mut tasks = JoinSet::new();
    for &size in &payload_sizes {
        tasks.spawn(async move {
            let mut codec = MessageCodec::<Tag>::default();
            let mut buf = BytesMut::new();
            for i in 0..iterations {
                let mut msg = Message::new(Tag::Data);
                for word in 0..size / 8 {
                    msg.push(((i + word) & 0xFF) as u64);
                }

                codec.encode(msg.clone(), &mut buf).expect("encode");
                let decoded = codec
                    .decode(&mut buf)
                    .expect("decode")
                    .expect("complete frame");
                assert_eq!(decoded, msg);
                buf.clear();
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("codec task");
    }
}
