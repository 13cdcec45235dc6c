use frag_ring::MPMC::Buffer::{RingBuffer, Slot};
use frag_ring::{RingBufferBuilder, RingError};
use std::sync::Arc;
use std::thread;

#[test]
fn repeated_init_destroy_cycles() {
    let mut storage = vec![Slot::new(); 8].into_boxed_slice();
    for cycle in 0..1000u32 {
        let rb = RingBuffer::init(storage).unwrap();
        rb.write(&cycle.to_le_bytes()).unwrap();
        {
            let slot = rb.peek_read_slot().unwrap();
            assert_eq!(slot.payload(), cycle.to_le_bytes());
            slot.advance_read_index();
        }
        storage = rb.destroy();
    }
    assert_eq!(storage.len(), 8);
}

#[test]
fn destroy_after_threads_exit() {
    for _ in 0..50 {
        let (producer, consumer) = RingBufferBuilder::new()
            .with_capacity(4)
            .build_channel()
            .unwrap();
        let ring = producer.ring().clone();

        let p = thread::spawn(move || {
            for i in 0..20u8 {
                producer.send(vec![i; 100]).unwrap();
            }
        });
        let c = thread::spawn(move || {
            for i in 0..20u8 {
                assert_eq!(consumer.receive_blocking().unwrap(), vec![i; 100]);
            }
        });
        p.join().unwrap();
        c.join().unwrap();

        let storage = RingBuffer::destroy_shared(ring).unwrap();
        assert_eq!(storage.len(), 4);
    }
}

#[test]
fn destroy_while_shared_is_refused() {
    let (producer, _consumer) = RingBufferBuilder::new()
        .with_capacity(2)
        .build_channel()
        .unwrap();
    let ring = producer.ring().clone();
    assert!(matches!(
        RingBuffer::destroy_shared(ring),
        Err(RingError::PreconditionViolation(_))
    ));
}

#[test]
fn memory_is_returned_across_cycles() {
    use memory_stats::memory_stats;

    let before = memory_stats();
    for _ in 0..200 {
        let ring = RingBuffer::with_capacity(4096).unwrap();
        ring.write(&[1u8; 1000]).unwrap();
        let ring = Arc::new(ring);
        drop(RingBuffer::destroy_shared(ring).unwrap());
    }
    let after = memory_stats();
    println!("Memory before: {:?}, after: {:?}", before, after);

    if let (Some(b), Some(a)) = (before, after) {
        let delta = a.physical_mem as i64 - b.physical_mem as i64;
        println!("Memory delta: {} bytes ({:.2} KB)", delta, delta as f64 / 1024.0);
        // 200 leaked rings would be ~100 MiB; allow allocator slack only.
        assert!(delta < 16 * 1024 * 1024);
    }
}
