//! Bitlane - Block Streams & Bit-Packed Codec
//!
//! Arsitektur:
//! - memory: allocator registry + satu primitive `resize`
//! - stream: multi-lane append-only stream di atas chained blocks
//! - codec: bit-packed writer/reader dengan bucketed integer packing
//!
//! Alur umum: worker menulis record ke lane miliknya lewat `StreamWriter`,
//! isi record di-encode dengan `DataStreamWriter` langsung ke slot yang
//! dialokasikan stream, lalu consumer membaca lane per lane.

pub mod codec;
pub mod error;
pub mod memory;
pub mod stream;

pub use codec::{CompressionModel, DataStreamReader, DataStreamWriter, FixedString};
pub use error::{AllocError, ModelError, StreamError};
pub use memory::{AllocatorHandle, MemoryBlock};
pub use stream::{BlockStream, StreamConfig, StreamReader, StreamWriter};
