use frag_ring::{MessageStream, RingBufferBuilder, RingError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Message body: producer id, sequence number, then filler derived from both,
/// so a consumer can tell a spliced message from an intact one.
fn encode(producer: u32, seq: u32, len: usize) -> Vec<u8> {
    let mut m = Vec::with_capacity(8 + len);
    m.extend_from_slice(&producer.to_le_bytes());
    m.extend_from_slice(&seq.to_le_bytes());
    m.extend((0..len).map(|i| (producer as usize * 31 + seq as usize + i) as u8));
    m
}

fn decode(m: &[u8]) -> (u32, u32) {
    let producer = u32::from_le_bytes(m[0..4].try_into().unwrap());
    let seq = u32::from_le_bytes(m[4..8].try_into().unwrap());
    let len = m.len() - 8;
    assert_eq!(m, encode(producer, seq, len).as_slice(), "message corrupted");
    (producer, seq)
}

#[test]
fn two_producers_do_not_interleave() {
    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(4)
        .build_channel()
        .unwrap();

    let p1 = producer.clone();
    let p2 = producer.clone();
    let a = thread::spawn(move || p1.send(b"PRODUCER1\0"));
    let b = thread::spawn(move || p2.send(b"PRODUCER2\0"));

    let mut got = vec![
        consumer.receive_blocking().unwrap(),
        consumer.receive_blocking().unwrap(),
    ];
    assert_eq!(a.join().unwrap(), Ok(10));
    assert_eq!(b.join().unwrap(), Ok(10));

    got.sort();
    assert_eq!(got, vec![b"PRODUCER1\0".to_vec(), b"PRODUCER2\0".to_vec()]);
}

#[test]
fn spsc_preserves_call_order() {
    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(5)
        .build_channel()
        .unwrap();

    let writer = thread::spawn(move || {
        for seq in 0..500u32 {
            producer.send(encode(0, seq, (seq as usize * 7) % 300)).unwrap();
        }
    });

    for expected in 0..500u32 {
        let message = consumer.receive_blocking().unwrap();
        assert_eq!(decode(&message), (0, expected));
    }
    writer.join().unwrap();
}

#[test]
fn mpmc_correctness_many_threads() {
    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(64)
        .build_channel()
        .unwrap();

    let producers = 4;
    let consumers = 4;
    let msgs_per_producer = 500u32;
    let total = producers as u64 * msgs_per_producer as u64;

    let mut handles = vec![];
    for p_id in 0..producers {
        let producer = producer.clone();
        handles.push(thread::spawn(move || {
            for seq in 0..msgs_per_producer {
                // Mix single-slot and multi-slot messages.
                let len = if seq % 3 == 0 { 4 } else { 150 };
                producer.send(encode(p_id, seq, len)).unwrap();
            }
        }));
    }

    let received = Arc::new(AtomicU64::new(0));
    let mut readers = vec![];
    for _ in 0..consumers {
        let consumer = consumer.clone();
        let received = received.clone();
        readers.push(thread::spawn(move || {
            let mut last_seen: HashMap<u32, u32> = HashMap::new();
            loop {
                match consumer.receive_timeout(Duration::from_millis(50)) {
                    Ok(Some(message)) => {
                        let (p, seq) = decode(&message);
                        // Each consumer sees a producer's messages in order.
                        if let Some(prev) = last_seen.insert(p, seq) {
                            assert!(seq > prev);
                        }
                        received.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {
                        if received.load(Ordering::Relaxed) >= total {
                            break;
                        }
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(received.load(Ordering::SeqCst), total);
    assert!(producer.ring().is_empty());
}

#[test]
fn stream_collects_until_close() {
    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(16)
        .build_channel()
        .unwrap();
    let stream = MessageStream::spawn(consumer, 4).unwrap();

    let writers: Vec<_> = (0..3u32)
        .map(|p| {
            let producer = producer.clone();
            thread::spawn(move || {
                for seq in 0..50u32 {
                    producer.send(encode(p, seq, 90)).unwrap();
                }
            })
        })
        .collect();

    let mut count = 0;
    while count < 150 {
        let message = stream.recv_timeout(Duration::from_secs(5)).unwrap();
        decode(&message);
        count += 1;
    }
    for w in writers {
        w.join().unwrap();
    }

    stream.stop();
    assert_eq!(producer.send(b"after stop"), Err(RingError::Closed));
}

#[test]
fn close_mid_send_discards_truncated_message() {
    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(3)
        .build_channel()
        .unwrap();
    let ring = producer.ring().clone();

    // Five fragments into two usable slots: the send stalls after two.
    let writer = thread::spawn(move || producer.send(vec![b'Z'; 320]));
    let stalled = (0..500).any(|_| {
        thread::sleep(Duration::from_millis(10));
        ring.is_full()
    });
    assert!(stalled);

    ring.close();
    assert_eq!(writer.join().unwrap(), Err(RingError::Closed));

    // The two published fragments drain, then the partial message is dropped.
    assert_eq!(consumer.receive_blocking(), Err(RingError::Closed));
    assert!(ring.is_empty());
    assert_eq!(ring.discarded_messages(), 1);
    assert_eq!(consumer.received(), 0);
}

#[test]
fn read_fragment_returns_raw_fragments() {
    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(8)
        .build_channel()
        .unwrap();
    let data: Vec<u8> = (0..130u8).collect();
    producer.send(&data).unwrap();

    let mut rebuilt = Vec::new();
    for (offset, len) in [(0u64, 64usize), (64, 64), (128, 2)] {
        let fragment = consumer.read_fragment().unwrap();
        assert_eq!(fragment.meta.total_length, 130);
        assert_eq!(fragment.meta.fragment_offset, offset);
        assert_eq!(fragment.payload.len(), len);
        assert_eq!(fragment.meta.fragment_len(), len);
        rebuilt.extend_from_slice(&fragment.payload);
    }
    assert_eq!(rebuilt, data);
    assert!(consumer.ring().is_empty());

    producer.close();
    assert_eq!(consumer.read_fragment(), Err(RingError::Closed));
}
