//! Bitlane demo & micro-benchmark
//!
//! Usage:
//!   bitlane [stream|codec|alloc|all]
//!
//! Log level lewat `RUST_LOG` (default: `bitlane=info`).

use bitlane::codec::{CompressionModel, DataStreamReader, DataStreamWriter, FixedString64};
use bitlane::memory::{AllocatorHandle, MemoryBlock, CACHE_LINE_SIZE};
use bitlane::stream::{BlockStream, StreamConfig};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bitlane=info")),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());

    println!("🧵 Bitlane - Block Streams & Bit-Packed Codec");
    println!("=============================================\n");

    let result = match mode.as_str() {
        "stream" => benchmark_stream(),
        "codec" => benchmark_codec(),
        "alloc" => benchmark_alloc(),
        "all" => benchmark_alloc()
            .and_then(|_| benchmark_stream())
            .and_then(|_| benchmark_codec()),
        other => {
            eprintln!("unknown mode '{other}', expected one of: stream, codec, alloc, all");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => {
            println!("\n✅ All benchmarks complete!");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "benchmark failed");
            ExitCode::FAILURE
        }
    }
}

type DemoResult = Result<(), Box<dyn std::error::Error>>;

fn benchmark_alloc() -> DemoResult {
    println!("📊 Allocator Benchmark (resize grow-by-doubling)");
    println!("------------------------------------------------");

    const ITERATIONS: usize = 10_000;

    for (name, handle) in [("heap", AllocatorHandle::HEAP), ("mapped", AllocatorHandle::MAPPED)] {
        let start = Instant::now();
        for _ in 0..ITERATIONS / 100 {
            let mut block = MemoryBlock::empty(handle, CACHE_LINE_SIZE);
            let mut size = 64;
            while size <= 64 * 1024 {
                block.resize(size)?;
                size *= 2;
            }
            block.free()?;
        }
        let duration = start.elapsed();
        let per_cycle = duration.as_nanos() as f64 / (ITERATIONS / 100) as f64;

        println!(
            "  {:<7} grow 64B→64KiB: {:.2} μs/cycle",
            name,
            per_cycle / 1000.0
        );
    }
    println!();
    Ok(())
}

fn benchmark_stream() -> DemoResult {
    println!("📊 Block Stream Benchmark (per-lane writers)");
    println!("--------------------------------------------");

    const LANES: usize = 8;
    const ITEMS_PER_LANE: usize = 250_000;

    let stream = BlockStream::with_config(StreamConfig::new(LANES).with_validation(false))?;

    let start = Instant::now();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..LANES)
            .map(|lane| {
                let stream = &stream;
                scope.spawn(move || -> Result<(), bitlane::StreamError> {
                    let mut writer = stream.partitioned_writer(lane..lane + 1)?;
                    writer.begin_for_each_index(lane)?;
                    for i in 0..ITEMS_PER_LANE {
                        writer.write((lane * ITEMS_PER_LANE + i) as u64)?;
                    }
                    writer.end_for_each_index()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Result<Vec<_>, _>>()
    })?;
    let write_duration = start.elapsed();

    let start = Instant::now();
    let mut reader = stream.reader();
    let mut checksum = 0u64;
    for lane in 0..LANES {
        let items = reader.begin_for_each_index(lane)?;
        for _ in 0..items {
            checksum = checksum.wrapping_add(reader.read::<u64>()?);
        }
        reader.end_for_each_index()?;
    }
    let read_duration = start.elapsed();

    let total = LANES * ITEMS_PER_LANE;
    println!("  Lanes: {}, items: {}", LANES, total);
    println!("  Blocks: {}", stream.block_count());
    println!(
        "  Write throughput: {:.2} M items/sec",
        total as f64 / write_duration.as_secs_f64() / 1_000_000.0
    );
    println!(
        "  Read throughput:  {:.2} M items/sec",
        total as f64 / read_duration.as_secs_f64() / 1_000_000.0
    );
    println!("  Checksum: {:#x}\n", checksum);

    stream.schedule_dispose().run();
    Ok(())
}

fn benchmark_codec() -> DemoResult {
    println!("📊 Codec Benchmark (packed delta encoding)");
    println!("------------------------------------------");

    const ITERATIONS: usize = 100_000;
    let model = CompressionModel::standard();
    let baseline_name = FixedString64::from_str("player_one").unwrap_or_default();
    let name = FixedString64::from_str("player_one_renamed").unwrap_or_default();

    let mut buf = vec![0u8; 256];
    let mut encoded_len = 0;

    let start = Instant::now();
    for i in 0..ITERATIONS {
        let mut writer = DataStreamWriter::new(&mut buf);
        let tick = i as u32;
        writer.write_packed_uint_delta(tick, tick.wrapping_sub(1), model);
        writer.write_packed_int_delta(-(i as i32 % 100), 0, model);
        writer.write_packed_float_delta(i as f32 * 0.5, (i as f32 - 1.0) * 0.5);
        writer.write_packed_fixed_string_delta(&name, &baseline_name, model);
        writer.flush();
        if writer.has_failed_writes() {
            return Err("codec buffer too small".into());
        }
        encoded_len = writer.length();
    }
    let encode_duration = start.elapsed();

    let start = Instant::now();
    // Buffer berisi snapshot dari iterasi terakhir
    let last = ITERATIONS - 1;
    for _ in 0..ITERATIONS {
        let mut reader = DataStreamReader::new(&buf[..encoded_len]);
        std::hint::black_box(reader.read_packed_uint_delta((last as u32).wrapping_sub(1), model));
        std::hint::black_box(reader.read_packed_int_delta(0, model));
        std::hint::black_box(reader.read_packed_float_delta((last as f32 - 1.0) * 0.5));
        std::hint::black_box(reader.read_packed_fixed_string_delta(&baseline_name, model));
    }
    let decode_duration = start.elapsed();

    let encode_ns = encode_duration.as_nanos() as f64 / ITERATIONS as f64;
    let decode_ns = decode_duration.as_nanos() as f64 / ITERATIONS as f64;

    println!("  Snapshot size: {} bytes (raw: {} bytes)", encoded_len, 4 + 4 + 4 + 2 + name.len());
    println!("  Encode latency: {:.2} ns/snapshot", encode_ns);
    println!("  Decode latency: {:.2} ns/snapshot", decode_ns);
    println!(
        "  Encode throughput: {:.2} M snapshots/sec",
        ITERATIONS as f64 / encode_duration.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}
