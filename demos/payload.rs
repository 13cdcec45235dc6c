// Pushes a large generated payload through a ring buffer and verifies it on
// the other side.
//
//   cargo run --release --example payload -- <mebibytes> [capacity]
//   RUST_LOG=frag_ring=trace cargo run --example payload -- 1
use frag_ring::{MessageStream, RingBufferBuilder};
use sha2::{Digest, Sha256};
use std::env;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const MB: usize = 1024 * 1024;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <mebibytes> [capacity]", args[0]);
        std::process::exit(1);
    }
    let mbs: usize = args[1].parse().expect("Invalid size");
    let capacity: usize = args.get(2).map(|s| s.parse().expect("Invalid capacity")).unwrap_or(10);

    let (producer, consumer) = RingBufferBuilder::new()
        .with_capacity(capacity)
        .build_channel()?;
    let stream = MessageStream::spawn(consumer, 1)?;

    // Ctrl+C closes the ring; the blocked write and the reader both unwind.
    let ring = producer.ring().clone();
    ctrlc::set_handler(move || ring.close()).expect("Error setting Ctrl+C handler");

    println!("Generating {} MiB payload...", mbs);
    let bytes = vec![b'A'; mbs * MB];
    let sent_digest = Sha256::digest(&bytes);

    println!("Sending bytes...");
    let start = Instant::now();
    producer.send(&bytes)?;
    println!("Done sending bytes!");
    drop(bytes);

    let Some(data) = stream.recv() else {
        eprintln!("Stream ended before the payload arrived");
        std::process::exit(1);
    };
    let elapsed = start.elapsed();

    let preview = String::from_utf8_lossy(&data[..data.len().min(64)]);
    println!("Read {} bytes...\nPreview: {}...", data.len(), preview);
    println!(
        "Avg speed: {:.2} GiB/s",
        mbs as f64 / 1024.0 / elapsed.as_secs_f64()
    );
    println!("Time elapsed: {:.2?}", elapsed);

    let received_digest = Sha256::digest(&data);
    if received_digest != sent_digest {
        eprintln!("Digest mismatch: {:x} != {:x}", received_digest, sent_digest);
        std::process::exit(1);
    }
    println!("SHA-256 verified: {:x}", received_digest);

    stream.stop();
    Ok(())
}
