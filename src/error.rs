//! Error types untuk bitlane
//!
//! Tiga kategori error:
//! - `AllocError`: fatal untuk caller, dipropagasi langsung dengan `?`
//! - `StreamError`: usage error pada session lane (begin/end, partition, read past end)
//! - `ModelError`: tabel compression model tidak valid
//!
//! Capacity exhaustion pada codec BUKAN error di sini: writer mengembalikan
//! `bool` dan menyimpan sticky failure counter.

use crate::memory::AllocatorHandle;
use thiserror::Error;

/// Error dari allocator registry dan raw buffer primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Perkalian `count * elem_size` overflow.
    #[error("allocation size overflow: {count} items of {elem_size} bytes")]
    SizeOverflow {
        /// Jumlah elemen yang diminta.
        count: usize,
        /// Ukuran satu elemen.
        elem_size: usize,
    },

    /// Total bytes di atas batas sanity (1 TiB).
    #[error("allocation of {bytes} bytes exceeds the {limit} byte ceiling")]
    ExceedsMaxSize {
        /// Bytes yang diminta.
        bytes: usize,
        /// Batas atas.
        limit: usize,
    },

    /// Ukuran elemen nol.
    #[error("element size must be greater than zero")]
    ZeroElementSize,

    /// Alignment bukan power of two.
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    /// Handle tidak menunjuk ke allocator manapun.
    #[error("allocator handle {0} is not registered")]
    UnknownHandle(AllocatorHandle),

    /// Handle menunjuk ke slot yang sudah di-unregister.
    #[error("allocator handle {0} is stale")]
    StaleHandle(AllocatorHandle),

    /// Semua slot custom allocator sudah terpakai.
    #[error("no free custom allocator slot")]
    RegistryFull,

    /// Custom allocator menolak request.
    #[error("custom allocator {handle} failed with code {code}")]
    CustomFailure {
        /// Allocator yang gagal.
        handle: AllocatorHandle,
        /// Kode error dari allocator.
        code: i32,
    },

    /// Page mapping gagal.
    #[error("failed to map {bytes} bytes: {cause}")]
    MapFailed {
        /// Bytes yang diminta.
        bytes: usize,
        /// Penyebab dari OS.
        cause: String,
    },
}

/// Error session lane pada `BlockStream`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream requires at least one lane, got {0}")]
    InvalidLaneCount(usize),

    #[error("lane {lane} is out of range (lane count {lane_count})")]
    LaneOutOfRange { lane: usize, lane_count: usize },

    #[error("partition {start}..{end} is not a valid lane range (lane count {lane_count})")]
    InvalidPartition { start: usize, end: usize, lane_count: usize },

    #[error("lane {lane} is outside the writer partition {start}..{end}")]
    LaneOutsidePartition { lane: usize, start: usize, end: usize },

    #[error("lane {0} has already been written")]
    LaneAlreadyWritten(usize),

    #[error("lane {0} is still being written")]
    LaneBeingWritten(usize),

    #[error("a session on lane {0} is already open")]
    SessionAlreadyOpen(usize),

    #[error("no lane session is open")]
    NoActiveSession,

    #[error("allocation of {size} bytes exceeds the {max} byte block payload")]
    AllocationTooLarge { size: usize, max: usize },

    #[error("read of {size} bytes past the end of lane {lane}")]
    ReadPastEnd { lane: usize, size: usize },

    #[error("lane {lane} ended with {items} items and {bytes} bytes unread")]
    UnconsumedData { lane: usize, items: usize, bytes: usize },

    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Error konstruksi compression model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("symbol {symbol} has code length {length}, expected 1..={max}")]
    InvalidSymbolLength { symbol: usize, length: u8, max: u8 },

    #[error("symbol lengths do not form a complete prefix code")]
    IncompletePrefixCode,
}

pub type AllocResult<T> = Result<T, AllocError>;
pub type StreamResult<T> = Result<T, StreamError>;
