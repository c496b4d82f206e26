//! Stream module: Block-Chained multi-lane stream
//!
//! Prinsip desain:
//! - Append-only: setiap lane adalah chain of fixed-size blocks
//! - No-copy growth: lane tumbuh dengan me-link block baru, tanpa realloc
//! - Lane isolation: lane berbeda = memory berbeda, tidak perlu sinkronisasi
//! - Index arena: link antar block adalah index ke block pool, bukan pointer
//!
//! Layout satu block:
//! ┌──────────────────────────┬──────────────────────────────────────┐
//! │ Header (8 bytes)         │ Payload (BLOCK_SIZE - 8 bytes)       │
//! │ [next: u32][reserved]    │ item, item, item, ...                │
//! └──────────────────────────┴──────────────────────────────────────┘

mod block_stream;
mod element;
mod pool;
mod reader;
mod writer;

pub use block_stream::{BlockStream, DisposeJob, StreamConfig};
pub use element::Element;
pub use pool::{BLOCK_HEADER_SIZE, BLOCK_SIZE, MAX_ALLOCATION_SIZE};
pub use reader::StreamReader;
pub use writer::StreamWriter;

use crate::error::StreamError;

/// Laporkan usage error sebelum dikembalikan ke caller.
#[inline(never)]
#[cold]
fn usage_error(err: StreamError) -> StreamError {
    tracing::warn!(%err, "stream usage error");
    err
}
