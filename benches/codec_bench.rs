//! Criterion benchmark untuk codec dan block stream
//!
//! Run dengan: cargo bench

use bitlane::codec::{CompressionModel, DataStreamReader, DataStreamWriter};
use bitlane::memory::AllocatorHandle;
use bitlane::stream::BlockStream;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn bench_packed(c: &mut Criterion) {
    let model = CompressionModel::standard();
    let mut group = c.benchmark_group("packed");
    group.throughput(Throughput::Elements(1));

    // Benchmark packed encode: small, medium, large magnitude
    for (name, value) in [("small", 3u32), ("medium", 40_000), ("large", u32::MAX)] {
        group.bench_function(format!("write_{}", name), |b| {
            let mut buf = vec![0u8; 64 * 1024];
            let mut writer = DataStreamWriter::new(&mut buf);
            b.iter(|| {
                if !writer.write_packed_uint(black_box(value), model) {
                    writer.clear();
                }
            });
        });
    }

    // Benchmark packed decode
    group.bench_function("read_mixed", |b| {
        let mut buf = vec![0u8; 64 * 1024];
        let mut writer = DataStreamWriter::new(&mut buf);
        let mut count = 0u64;
        while writer.write_packed_uint((count as u32).wrapping_mul(2654435761) >> (count % 32), model) {
            count += 1;
        }
        writer.flush();
        let len = writer.length();
        let encoded = &buf[..len];

        let mut reader = DataStreamReader::new(encoded);
        b.iter(|| {
            if reader.get_bytes_read() + 8 >= len {
                reader.seek_set(0);
            }
            black_box(reader.read_packed_uint(model));
        });
    });

    group.finish();
}

fn bench_delta(c: &mut Criterion) {
    let model = CompressionModel::standard();
    let mut group = c.benchmark_group("delta");

    for batch_size in [100u32, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_function(format!("uint_delta_batch_{}", batch_size), |b| {
            let mut buf = vec![0u8; 256 * 1024];
            b.iter(|| {
                let mut writer = DataStreamWriter::new(&mut buf);
                let mut baseline = 0u32;
                for i in 0..*batch_size {
                    let value = baseline + (i % 7);
                    writer.write_packed_uint_delta(black_box(value), baseline, model);
                    baseline = value;
                }
                black_box(writer.length())
            });
        });
    }

    group.finish();
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_stream");

    for items in [1_000usize, 100_000].iter() {
        group.throughput(Throughput::Elements(*items as u64));
        group.bench_function(format!("write_read_{}", items), |b| {
            b.iter(|| {
                let stream = BlockStream::new(1, AllocatorHandle::HEAP).unwrap();
                let mut writer = stream.writer();
                writer.begin_for_each_index(0).unwrap();
                for i in 0..*items {
                    writer.write(black_box(i as u64)).unwrap();
                }
                writer.end_for_each_index().unwrap();
                drop(writer);

                let mut reader = stream.reader();
                let n = reader.begin_for_each_index(0).unwrap();
                let mut sum = 0u64;
                for _ in 0..n {
                    sum = sum.wrapping_add(reader.read::<u64>().unwrap());
                }
                reader.end_for_each_index().unwrap();
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_packed, bench_delta, bench_stream);
criterion_main!(benches);
