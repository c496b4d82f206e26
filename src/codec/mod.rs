//! Codec module: Bit-Packed Wire Encoding
//!
//! Prinsip desain:
//! - No-Allocation: writer/reader bekerja di atas slice milik caller
//! - All-or-nothing: write yang tidak muat tidak mengubah state sama sekali
//! - Sticky failure: caller cukup cek `has_failed_*` sekali di akhir
//! - Bucketed packing: integer kecil = bits sedikit, lihat `CompressionModel`
//!
//! Bits ditulis LSB-first. Byte-aligned write selalu flush bits pending dulu.

mod fixed_string;
mod model;
mod reader;
mod writer;

pub use fixed_string::{
    FixedString, FixedString128, FixedString32, FixedString4096, FixedString512, FixedString64,
};
pub use model::{
    CompressionModel, ALPHABET_SIZE, BUCKET_OFFSETS, BUCKET_SIZES, DEFAULT_SYMBOL_LENGTHS,
    MAX_SYMBOL_LENGTH,
};
pub use reader::DataStreamReader;
pub use writer::DataStreamWriter;
