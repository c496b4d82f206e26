//! Compression Model: bucketed variable-length integer code
//!
//! Value dipetakan ke salah satu dari 16 bucket. Wire format:
//! `<prefix code bucket><value - offset dalam bucket_sizes[bucket] bits>`
//!
//! Prefix code adalah canonical prefix code yang bit-nya dibalik, karena
//! bitstream ditulis LSB-first. Decoder cukup peek `MAX_SYMBOL_LENGTH` bits
//! dan lookup `decode_table`.
//!
//! Model adalah bagian dari wire contract: encoder dan decoder harus memakai
//! tabel yang identik.

use crate::error::ModelError;
use std::sync::OnceLock;

/// Jumlah bucket (alphabet prefix code).
pub const ALPHABET_SIZE: usize = 16;

/// Panjang prefix code terpanjang (lebar peek decoder).
pub const MAX_SYMBOL_LENGTH: u32 = 6;

const DECODE_TABLE_SIZE: usize = 1 << MAX_SYMBOL_LENGTH;

/// Lebar payload mentah per bucket.
pub const BUCKET_SIZES: [u8; ALPHABET_SIZE] =
    [0, 0, 1, 2, 3, 4, 6, 8, 10, 12, 15, 18, 21, 24, 27, 32];

/// Batas bawah range setiap bucket.
pub const BUCKET_OFFSETS: [u32; ALPHABET_SIZE] = [
    0, 1, 2, 4, 8, 16, 32, 96, 352, 1376, 5472, 38240, 300384, 2397536, 19174752, 153392480,
];

/// Panjang prefix code model default: value kecil dapat code pendek.
pub const DEFAULT_SYMBOL_LENGTHS: [u8; ALPHABET_SIZE] =
    [2, 3, 3, 3, 4, 4, 4, 5, 5, 5, 6, 6, 6, 6, 6, 6];

/// Tabel immutable untuk packed encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionModel {
    /// `code << 8 | length` per bucket.
    encode_table: [u16; ALPHABET_SIZE],
    /// `bucket << 8 | length` per pola peek.
    decode_table: [u16; DECODE_TABLE_SIZE],
    bucket_offsets: [u32; ALPHABET_SIZE],
    bucket_sizes: [u8; ALPHABET_SIZE],
}

impl Default for CompressionModel {
    fn default() -> Self {
        Self::default_model()
    }
}

impl CompressionModel {
    /// Model default dengan `DEFAULT_SYMBOL_LENGTHS`.
    pub fn default_model() -> Self {
        Self::build(&DEFAULT_SYMBOL_LENGTHS)
    }

    /// Instance default process-wide. Dibangun sekali, immutable.
    pub fn standard() -> &'static CompressionModel {
        static STANDARD: OnceLock<CompressionModel> = OnceLock::new();
        STANDARD.get_or_init(Self::default_model)
    }

    /// Bangun model dari panjang prefix code per bucket.
    ///
    /// Panjang harus 1..=6 dan membentuk prefix code yang lengkap
    /// (Kraft sum tepat 1), supaya setiap pola peek punya tepat satu bucket.
    pub fn from_symbol_lengths(lengths: &[u8; ALPHABET_SIZE]) -> Result<Self, ModelError> {
        let mut kraft = 0u32;
        for (symbol, &length) in lengths.iter().enumerate() {
            if length == 0 || u32::from(length) > MAX_SYMBOL_LENGTH {
                return Err(ModelError::InvalidSymbolLength {
                    symbol,
                    length,
                    max: MAX_SYMBOL_LENGTH as u8,
                });
            }
            kraft += 1 << (MAX_SYMBOL_LENGTH - u32::from(length));
        }
        if kraft != 1 << MAX_SYMBOL_LENGTH {
            return Err(ModelError::IncompletePrefixCode);
        }
        Ok(Self::build(lengths))
    }

    fn build(lengths: &[u8; ALPHABET_SIZE]) -> Self {
        let codes = canonical_codes(lengths);

        let mut encode_table = [0u16; ALPHABET_SIZE];
        let mut decode_table = [0u16; DECODE_TABLE_SIZE];
        for symbol in 0..ALPHABET_SIZE {
            let length = u32::from(lengths[symbol]);
            let code = codes[symbol];
            encode_table[symbol] = (code << 8) | length as u16;

            // Semua pola peek yang diawali code ini → symbol
            for suffix in 0..(1u16 << (MAX_SYMBOL_LENGTH - length)) {
                let peek = (suffix << length) | code;
                decode_table[peek as usize] = ((symbol as u16) << 8) | length as u16;
            }
        }

        Self {
            encode_table,
            decode_table,
            bucket_offsets: BUCKET_OFFSETS,
            bucket_sizes: BUCKET_SIZES,
        }
    }

    /// Bucket yang range-nya berisi `value`.
    #[inline(always)]
    pub fn bucket_for(&self, value: u32) -> usize {
        // Offset terurut naik: cari bucket terakhir dengan offset <= value
        self.bucket_offsets
            .iter()
            .rposition(|&offset| offset <= value)
            .unwrap_or(0)
    }

    /// `(code, length)` prefix untuk `bucket`.
    #[inline(always)]
    pub fn encode_entry(&self, bucket: usize) -> (u32, u32) {
        let entry = self.encode_table[bucket];
        (u32::from(entry >> 8), u32::from(entry & 0xFF))
    }

    /// `(bucket, length)` untuk pola peek `MAX_SYMBOL_LENGTH` bits.
    #[inline(always)]
    pub fn decode_entry(&self, peek: u32) -> (usize, u32) {
        let entry = self.decode_table[(peek as usize) & (DECODE_TABLE_SIZE - 1)];
        (usize::from(entry >> 8), u32::from(entry & 0xFF))
    }

    #[inline(always)]
    pub fn bucket_offset(&self, bucket: usize) -> u32 {
        self.bucket_offsets[bucket]
    }

    #[inline(always)]
    pub fn bucket_size(&self, bucket: usize) -> u32 {
        u32::from(self.bucket_sizes[bucket])
    }

    /// Total bits (prefix + payload) untuk packed `value`.
    #[inline(always)]
    pub fn packed_bit_len(&self, value: u32) -> u32 {
        let bucket = self.bucket_for(value);
        self.encode_entry(bucket).1 + self.bucket_size(bucket)
    }
}

/// Canonical code per symbol, bit-nya dibalik untuk bitstream LSB-first.
fn canonical_codes(lengths: &[u8; ALPHABET_SIZE]) -> [u16; ALPHABET_SIZE] {
    let mut codes = [0u16; ALPHABET_SIZE];
    let mut next = 0u32;
    for length in 1..=MAX_SYMBOL_LENGTH {
        for symbol in 0..ALPHABET_SIZE {
            if u32::from(lengths[symbol]) == length {
                codes[symbol] = reverse_bits(next, length) as u16;
                next += 1;
            }
        }
        next <<= 1;
    }
    codes
}

#[inline(always)]
fn reverse_bits(value: u32, bits: u32) -> u32 {
    value.reverse_bits() >> (32 - bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_partition_u32() {
        let model = CompressionModel::default_model();
        for bucket in 0..ALPHABET_SIZE - 1 {
            let end = u64::from(model.bucket_offset(bucket)) + (1u64 << model.bucket_size(bucket));
            assert_eq!(end, u64::from(model.bucket_offset(bucket + 1)), "gap after bucket {bucket}");
        }
        let last = ALPHABET_SIZE - 1;
        let end = u64::from(model.bucket_offset(last)) + (1u64 << model.bucket_size(last));
        assert!(end > u64::from(u32::MAX));
    }

    #[test]
    fn test_bucket_for_boundaries() {
        let model = CompressionModel::standard();
        assert_eq!(model.bucket_for(0), 0);
        assert_eq!(model.bucket_for(1), 1);
        assert_eq!(model.bucket_for(3), 2);
        assert_eq!(model.bucket_for(95), 6);
        assert_eq!(model.bucket_for(96), 7);
        assert_eq!(model.bucket_for(u32::MAX), 15);
    }

    #[test]
    fn test_decode_table_inverts_encode_table() {
        let model = CompressionModel::default_model();
        for bucket in 0..ALPHABET_SIZE {
            let (code, length) = model.encode_entry(bucket);
            for suffix in 0..(1 << (MAX_SYMBOL_LENGTH - length)) {
                assert_eq!(model.decode_entry((suffix << length) | code), (bucket, length));
            }
        }
    }

    #[test]
    fn test_cost_non_decreasing() {
        let model = CompressionModel::standard();
        let costs: Vec<u32> = BUCKET_OFFSETS.iter().map(|&o| model.packed_bit_len(o)).collect();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]), "{costs:?}");
        assert_eq!(model.packed_bit_len(0), 2);
    }

    #[test]
    fn test_invalid_models_rejected() {
        let mut lengths = DEFAULT_SYMBOL_LENGTHS;
        lengths[3] = 7;
        assert!(matches!(
            CompressionModel::from_symbol_lengths(&lengths),
            Err(ModelError::InvalidSymbolLength { symbol: 3, .. })
        ));

        let mut lengths = DEFAULT_SYMBOL_LENGTHS;
        lengths[0] = 3;
        assert_eq!(
            CompressionModel::from_symbol_lengths(&lengths),
            Err(ModelError::IncompletePrefixCode)
        );

        // Flat 4-bit code juga lengkap
        assert!(CompressionModel::from_symbol_lengths(&[4; ALPHABET_SIZE]).is_ok());
    }
}
