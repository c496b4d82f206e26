//! Block pool: arena index-based untuk semua block milik satu stream
//!
//! Block dialokasikan lewat allocator registry dan tidak pernah di-resize,
//! jadi base pointer-nya stabil sampai stream di-drop. Lock hanya diambil
//! saat block baru dialokasikan atau saat cursor pindah ke block berikutnya.

use crate::error::StreamResult;
use crate::memory::{AllocatorHandle, MemoryBlock};
use parking_lot::Mutex;

/// Ukuran satu block (termasuk header).
pub const BLOCK_SIZE: usize = 4096;

/// Bytes yang dicadangkan di awal block untuk link ke block berikutnya.
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Allocation terbesar yang muat dalam satu call.
pub const MAX_ALLOCATION_SIZE: usize = BLOCK_SIZE - BLOCK_HEADER_SIZE;

const BLOCK_ALIGNMENT: usize = 16;

/// Index block di dalam pool.
pub(crate) type BlockId = u32;

/// Sentinel "tidak ada block".
pub(crate) const NO_BLOCK: BlockId = u32::MAX;

pub(crate) struct BlockPool {
    allocator: AllocatorHandle,
    blocks: Mutex<Vec<MemoryBlock>>,
}

impl BlockPool {
    pub(crate) fn new(allocator: AllocatorHandle) -> Self {
        Self {
            allocator,
            blocks: Mutex::new(Vec::new()),
        }
    }

    /// Alokasi block baru (zeroed, header = NO_BLOCK).
    ///
    /// Returns id block dan base pointer-nya.
    pub(crate) fn allocate(&self) -> StreamResult<(BlockId, *mut u8)> {
        let mut block = MemoryBlock::allocate(self.allocator, BLOCK_SIZE, BLOCK_ALIGNMENT)?;
        let base = block.as_mut_ptr();
        write_next(base, NO_BLOCK);

        let mut blocks = self.blocks.lock();
        let id = blocks.len() as BlockId;
        blocks.push(block);
        Ok((id, base))
    }

    /// Base pointer block `id`, atau None jika id tidak ada di pool.
    pub(crate) fn base(&self, id: BlockId) -> Option<*mut u8> {
        let blocks = self.blocks.lock();
        blocks
            .get(id as usize)
            .map(|block| block.as_ptr() as *mut u8)
    }

    /// Jumlah block yang sudah dialokasikan.
    pub(crate) fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub(crate) fn allocator(&self) -> AllocatorHandle {
        self.allocator
    }
}

/// Tulis link `next` ke header block.
#[inline(always)]
pub(crate) fn write_next(base: *mut u8, next: BlockId) {
    // SAFETY: base menunjuk ke block BLOCK_SIZE bytes; header berada di 4 byte pertama
    unsafe { std::ptr::write_unaligned(base as *mut [u8; 4], next.to_le_bytes()) };
}

/// Baca link `next` dari header block.
#[inline(always)]
pub(crate) fn read_next(base: *const u8) -> Option<BlockId> {
    // SAFETY: lihat write_next
    let raw = unsafe { std::ptr::read_unaligned(base as *const [u8; 4]) };
    match u32::from_le_bytes(raw) {
        NO_BLOCK => None,
        id => Some(id),
    }
}
