//! Property tests untuk codec, resize, dan block stream.

use bitlane::codec::{CompressionModel, DataStreamReader, DataStreamWriter, FixedString32};
use bitlane::memory::{AllocatorHandle, MemoryBlock};
use bitlane::stream::BlockStream;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Mixed op sequences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    RawBits(u32, u32),
    Byte(u8),
    Int(i32),
    PackedUint(u32),
    PackedInt(i32),
    PackedLong(i64),
    UintDelta(u32, u32),
    FloatDelta(f32, f32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..=32)
            .prop_flat_map(|bits| {
                let max = if bits == 32 { u32::MAX } else { (1u32 << bits).wrapping_sub(1) };
                (0..=max, Just(bits))
            })
            .prop_map(|(v, bits)| Op::RawBits(v, bits)),
        any::<u8>().prop_map(Op::Byte),
        any::<i32>().prop_map(Op::Int),
        any::<u32>().prop_map(Op::PackedUint),
        any::<i32>().prop_map(Op::PackedInt),
        any::<i64>().prop_map(Op::PackedLong),
        (any::<u32>(), any::<u32>()).prop_map(|(v, b)| Op::UintDelta(v, b)),
        (any::<f32>(), any::<f32>()).prop_map(|(v, b)| Op::FloatDelta(v, b)),
    ]
}

fn write_op(writer: &mut DataStreamWriter<'_>, op: &Op, model: &CompressionModel) -> bool {
    match *op {
        Op::RawBits(v, bits) => writer.write_raw_bits(v, bits),
        Op::Byte(v) => writer.write_byte(v),
        Op::Int(v) => writer.write_int(v),
        Op::PackedUint(v) => writer.write_packed_uint(v, model),
        Op::PackedInt(v) => writer.write_packed_int(v, model),
        Op::PackedLong(v) => writer.write_packed_long(v, model),
        Op::UintDelta(v, b) => writer.write_packed_uint_delta(v, b, model),
        Op::FloatDelta(v, b) => writer.write_packed_float_delta(v, b),
    }
}

fn check_op(reader: &mut DataStreamReader<'_>, op: &Op, model: &CompressionModel) {
    match *op {
        Op::RawBits(v, bits) => assert_eq!(reader.read_raw_bits(bits), v),
        Op::Byte(v) => assert_eq!(reader.read_byte(), v),
        Op::Int(v) => assert_eq!(reader.read_int(), v),
        Op::PackedUint(v) => assert_eq!(reader.read_packed_uint(model), v),
        Op::PackedInt(v) => assert_eq!(reader.read_packed_int(model), v),
        Op::PackedLong(v) => assert_eq!(reader.read_packed_long(model), v),
        Op::UintDelta(v, b) => assert_eq!(reader.read_packed_uint_delta(b, model), v),
        Op::FloatDelta(v, b) => {
            assert_eq!(reader.read_packed_float_delta(b).to_bits(), v.to_bits())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_mixed_ops_roundtrip(ops in prop::collection::vec(op(), 0..64)) {
        let model = CompressionModel::standard();
        let mut buf = vec![0u8; 1024];
        let mut writer = DataStreamWriter::new(&mut buf);
        for op in &ops {
            prop_assert!(write_op(&mut writer, op, model));
        }
        writer.flush();
        let len = writer.length();

        let mut reader = DataStreamReader::new(&buf[..len]);
        for op in &ops {
            check_op(&mut reader, op, model);
        }
        prop_assert!(!reader.has_failed_reads());
    }

    /// Failed write tidak pernah mengubah posisi, dan invariant kapasitas selalu terjaga.
    #[test]
    fn prop_capacity_never_exceeded(
        capacity in 0usize..24,
        ops in prop::collection::vec(op(), 0..32),
    ) {
        let model = CompressionModel::standard();
        let mut buf = vec![0u8; capacity];
        let mut writer = DataStreamWriter::new(&mut buf);
        let mut failures = 0;
        for op in &ops {
            let bits_before = writer.length_in_bits();
            if !write_op(&mut writer, op, model) {
                failures += 1;
                prop_assert_eq!(writer.length_in_bits(), bits_before);
            }
            prop_assert!(writer.length() <= capacity);
        }
        prop_assert_eq!(writer.failed_writes(), failures);
        prop_assert_eq!(writer.has_failed_writes(), failures > 0);
    }

    #[test]
    fn prop_packed_cost_matches_model(value in any::<u32>()) {
        let model = CompressionModel::standard();
        let mut buf = [0u8; 8];
        let mut writer = DataStreamWriter::new(&mut buf);
        prop_assert!(writer.write_packed_uint(value, model));
        prop_assert_eq!(writer.length_in_bits() as u32, model.packed_bit_len(value));
    }

    /// Magnitude kecil (positif atau negatif) tidak pernah lebih mahal dari magnitude besar.
    #[test]
    fn prop_zigzag_small_is_cheap(a in -1000i32..1000, b in 1_000_000i32..i32::MAX) {
        let model = CompressionModel::standard();
        let cost = |v: i32| {
            let mut buf = [0u8; 8];
            let mut writer = DataStreamWriter::new(&mut buf);
            writer.write_packed_int(v, model);
            writer.length_in_bits()
        };
        prop_assert!(cost(a) <= cost(b));
        prop_assert!(cost(a) <= cost(-b));
    }

    #[test]
    fn prop_string_delta_roundtrip(
        value in "[ -~]{0,29}",
        baseline in "[ -~]{0,29}",
    ) {
        let model = CompressionModel::standard();
        let value = FixedString32::from_str(&value).unwrap();
        let baseline = FixedString32::from_str(&baseline).unwrap();

        let mut buf = vec![0u8; 512];
        let mut writer = DataStreamWriter::new(&mut buf);
        prop_assert!(writer.write_packed_fixed_string_delta(&value, &baseline, model));
        writer.flush();
        let len = writer.length();

        let mut reader = DataStreamReader::new(&buf[..len]);
        prop_assert_eq!(reader.read_packed_fixed_string_delta(&baseline, model), value);
        prop_assert!(!reader.has_failed_reads());
    }

    /// Jika string delta gagal, writer kembali persis ke state sebelumnya.
    #[test]
    fn prop_string_delta_rollback(capacity in 0usize..12, value in "[a-z]{10,29}") {
        let model = CompressionModel::standard();
        let value = FixedString32::from_str(&value).unwrap();
        let mut buf = vec![0u8; capacity];
        let mut writer = DataStreamWriter::new(&mut buf);
        let wrote_prefix = writer.write_raw_bits(1, 3);

        let bits_before = writer.length_in_bits();
        let failures_before = writer.failed_writes();
        if !writer.write_packed_fixed_string_delta(&value, &FixedString32::new(), model) {
            prop_assert_eq!(writer.length_in_bits(), bits_before);
            prop_assert_eq!(writer.failed_writes(), failures_before + 1);
        }
        prop_assert_eq!(wrote_prefix, capacity > 0);
    }

    #[test]
    fn prop_resize_preserves_prefix(
        old in 0usize..4096,
        new in 0usize..4096,
        mapped in any::<bool>(),
    ) {
        let handle = if mapped { AllocatorHandle::MAPPED } else { AllocatorHandle::HEAP };
        let mut block = MemoryBlock::allocate(handle, old, 16).unwrap();
        for (i, b) in block.as_mut_slice().iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }

        block.resize(new).unwrap();
        prop_assert_eq!(block.bytes(), new);
        let kept = old.min(new);
        let slice = block.as_slice();
        prop_assert!(slice[..kept].iter().enumerate().all(|(i, &b)| b == (i % 251) as u8));
        prop_assert!(slice[kept..].iter().all(|&b| b == 0));
    }

    #[test]
    fn prop_lane_roundtrip(lanes in prop::collection::vec(prop::collection::vec(any::<u64>(), 0..1200), 1..6)) {
        let stream = BlockStream::new(lanes.len(), AllocatorHandle::HEAP).unwrap();
        let mut writer = stream.writer();
        // Tulis lane dari belakang
        for (lane, values) in lanes.iter().enumerate().rev() {
            writer.begin_for_each_index(lane).unwrap();
            for &v in values {
                writer.write(v).unwrap();
            }
            writer.end_for_each_index().unwrap();
        }
        drop(writer);

        let expected: Vec<u64> = lanes.iter().flatten().copied().collect();
        prop_assert_eq!(stream.count(), expected.len());
        prop_assert_eq!(stream.to_vec::<u64>().unwrap(), expected);
    }
}
