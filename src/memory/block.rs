//! MemoryBlock: owning byte buffer di atas `resize`

use super::allocator::AllocatorHandle;
use super::resize::resize;
use crate::error::AllocResult;
use std::ptr;

/// Raw byte buffer dengan tepat satu owner.
///
/// Null dengan `bytes == 0`, atau menunjuk ke tepat `bytes` byte yang hidup.
/// Isi selalu ter-inisialisasi (bytes baru di-zero), jadi aman dibaca
/// sebagai slice.
#[derive(Debug)]
pub struct MemoryBlock {
    ptr: *mut u8,
    bytes: usize,
    alignment: usize,
    allocator: AllocatorHandle,
}

// SAFETY: buffer dimiliki eksklusif oleh MemoryBlock; akses mutable butuh &mut
unsafe impl Send for MemoryBlock {}
unsafe impl Sync for MemoryBlock {}

impl MemoryBlock {
    /// Block kosong yang nanti dialokasikan lewat `allocator`.
    pub const fn empty(allocator: AllocatorHandle, alignment: usize) -> Self {
        Self {
            ptr: ptr::null_mut(),
            bytes: 0,
            alignment,
            allocator,
        }
    }

    /// Alokasi `bytes` byte yang sudah di-zero.
    pub fn allocate(allocator: AllocatorHandle, bytes: usize, alignment: usize) -> AllocResult<Self> {
        let mut block = Self::empty(allocator, alignment);
        block.resize(bytes)?;
        Ok(block)
    }

    /// Resize ke `new_bytes`. Prefix dipertahankan, tail baru di-zero.
    pub fn resize(&mut self, new_bytes: usize) -> AllocResult<()> {
        // SAFETY: self.ptr selalu hasil resize sebelumnya dengan parameter yang sama
        let new_ptr = unsafe {
            resize(
                self.ptr,
                self.bytes,
                new_bytes,
                self.allocator,
                1,
                self.alignment,
            )?
        };

        if new_bytes > self.bytes {
            // SAFETY: [old, new) berada di dalam allocation baru
            unsafe { ptr::write_bytes(new_ptr.add(self.bytes), 0, new_bytes - self.bytes) };
        }

        self.ptr = new_ptr;
        self.bytes = new_bytes;
        Ok(())
    }

    /// Free buffer, block menjadi kosong.
    pub fn free(&mut self) -> AllocResult<()> {
        self.resize(0)
    }

    #[inline(always)]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    #[inline(always)]
    pub fn allocator(&self) -> AllocatorHandle {
        self.allocator
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        // SAFETY: ptr valid untuk `bytes` byte yang sudah ter-inisialisasi
        unsafe { std::slice::from_raw_parts(self.ptr, self.bytes) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.ptr.is_null() {
            return &mut [];
        }
        // SAFETY: sama seperti as_slice, ditambah &mut self menjamin eksklusif
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.bytes) }
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        if let Err(err) = self.free() {
            tracing::error!(allocator = %self.allocator, bytes = self.bytes, %err, "failed to free memory block");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_zeroed() {
        let block = MemoryBlock::allocate(AllocatorHandle::HEAP, 256, 16).unwrap();
        assert_eq!(block.bytes(), 256);
        assert!(block.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_resize_keeps_prefix_and_zeroes_tail() {
        let mut block = MemoryBlock::allocate(AllocatorHandle::HEAP, 4, 8).unwrap();
        block.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);

        block.resize(8).unwrap();
        assert_eq!(block.as_slice(), &[1, 2, 3, 4, 0, 0, 0, 0]);

        block.resize(2).unwrap();
        assert_eq!(block.as_slice(), &[1, 2]);

        block.free().unwrap();
        assert!(block.is_empty());
        assert!(block.as_ptr().is_null());
        assert_eq!(block.as_slice(), &[] as &[u8]);
    }

    #[test]
    fn test_mapped_block() {
        let mut block = MemoryBlock::allocate(AllocatorHandle::MAPPED, 10_000, 64).unwrap();
        block.as_mut_slice()[9_999] = 0xAB;
        block.resize(20_000).unwrap();
        assert_eq!(block.as_slice()[9_999], 0xAB);
        assert_eq!(block.as_slice()[19_999], 0);
    }

    #[test]
    fn test_empty_block_has_no_memory() {
        let block = MemoryBlock::empty(AllocatorHandle::NONE, 8);
        assert!(block.is_empty());
        assert!(block.as_slice().is_empty());
        // Drop lewat NONE untuk block kosong tidak boleh error
    }
}
