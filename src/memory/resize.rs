//! Raw Buffer Primitive: resize-copy-free
//!
//! Satu-satunya operasi memory management yang dipakai container lain.
//! Urutan selalu: allocate baru → copy prefix → free lama, jadi ownership
//! berpindah hanya setelah buffer baru terisi.

use super::allocator::{self, AllocatorHandle, ResizeRequest};
use super::mapped;
use crate::error::{AllocError, AllocResult};
use std::alloc::{self, Layout};
use std::ptr;

/// Alignment minimal untuk built-in allocator (64 bytes pada x86-64).
pub const CACHE_LINE_SIZE: usize = 64;

/// Batas sanity: request di atas 1 TiB hampir pasti overflow atau misuse.
pub const MAX_ALLOCATION_BYTES: usize = if usize::BITS >= 64 {
    (1u64 << 40) as usize
} else {
    isize::MAX as usize
};

/// Resize buffer `old_ptr` (berisi `old_count` elemen) menjadi `new_count` elemen.
///
/// - `new_count == 0`: free buffer lama, return null.
/// - `new_count > 0`: allocate baru, copy `min(old_count, new_count)` elemen,
///   lalu free buffer lama.
///
/// Heap yang habis adalah kondisi fatal (`handle_alloc_error`).
///
/// # Safety
/// `old_ptr` harus null, atau hasil `resize` sebelumnya dengan `handle`,
/// `elem_size` dan `alignment` yang sama dan tepat `old_count` elemen.
/// Setelah call sukses, `old_ptr` tidak boleh dipakai lagi.
pub unsafe fn resize(
    old_ptr: *mut u8,
    old_count: usize,
    new_count: usize,
    handle: AllocatorHandle,
    elem_size: usize,
    alignment: usize,
) -> AllocResult<*mut u8> {
    if elem_size == 0 {
        return Err(AllocError::ZeroElementSize);
    }
    if !alignment.is_power_of_two() {
        return Err(AllocError::InvalidAlignment(alignment));
    }

    let new_bytes = checked_bytes(new_count, elem_size)?;
    let old_bytes = if old_ptr.is_null() {
        0
    } else {
        checked_bytes(old_count, elem_size)?
    };

    if old_bytes == 0 && new_bytes == 0 {
        return Ok(ptr::null_mut());
    }

    match handle {
        AllocatorHandle::HEAP => resize_heap(old_ptr, old_bytes, new_bytes, alignment),
        AllocatorHandle::MAPPED => resize_mapped(old_ptr, old_bytes, new_bytes, alignment),
        h if h.is_custom() => resize_custom(old_ptr, old_count, new_count, h, elem_size, alignment),
        h => Err(AllocError::UnknownHandle(h)),
    }
}

#[inline(always)]
fn checked_bytes(count: usize, elem_size: usize) -> AllocResult<usize> {
    let bytes = count
        .checked_mul(elem_size)
        .ok_or(AllocError::SizeOverflow { count, elem_size })?;
    if bytes > MAX_ALLOCATION_BYTES {
        return Err(AllocError::ExceedsMaxSize {
            bytes,
            limit: MAX_ALLOCATION_BYTES,
        });
    }
    Ok(bytes)
}

unsafe fn resize_heap(
    old_ptr: *mut u8,
    old_bytes: usize,
    new_bytes: usize,
    alignment: usize,
) -> AllocResult<*mut u8> {
    let align = alignment.max(CACHE_LINE_SIZE);

    let new_ptr = if new_bytes > 0 {
        let layout = Layout::from_size_align(new_bytes, align)
            .map_err(|_| AllocError::InvalidAlignment(align))?;
        let p = alloc::alloc(layout);
        if p.is_null() {
            alloc::handle_alloc_error(layout);
        }
        p
    } else {
        ptr::null_mut()
    };

    if old_bytes > 0 {
        if !new_ptr.is_null() {
            ptr::copy_nonoverlapping(old_ptr, new_ptr, old_bytes.min(new_bytes));
        }
        // SAFETY: layout sama dengan saat alokasi (dijamin caller)
        alloc::dealloc(old_ptr, Layout::from_size_align_unchecked(old_bytes, align));
    }

    Ok(new_ptr)
}

unsafe fn resize_mapped(
    old_ptr: *mut u8,
    old_bytes: usize,
    new_bytes: usize,
    alignment: usize,
) -> AllocResult<*mut u8> {
    let align = alignment.max(CACHE_LINE_SIZE);

    let new_ptr = if new_bytes > 0 {
        mapped::allocate(new_bytes, align)?
    } else {
        ptr::null_mut()
    };

    if old_bytes > 0 {
        if !new_ptr.is_null() {
            ptr::copy_nonoverlapping(old_ptr, new_ptr, old_bytes.min(new_bytes));
        }
        mapped::free(old_ptr);
    }

    Ok(new_ptr)
}

unsafe fn resize_custom(
    old_ptr: *mut u8,
    old_count: usize,
    new_count: usize,
    handle: AllocatorHandle,
    elem_size: usize,
    alignment: usize,
) -> AllocResult<*mut u8> {
    let custom = allocator::lookup(handle)?;
    let fail = |code| AllocError::CustomFailure { handle, code };

    let mut new_ptr = ptr::null_mut();
    if new_count > 0 {
        let mut request = ResizeRequest {
            pointer: ptr::null_mut(),
            items: new_count,
            allocated_items: 0,
            bytes_per_item: elem_size,
            alignment,
            allocator: handle,
        };
        custom.try_resize(&mut request).map_err(fail)?;
        new_ptr = request.pointer;
        if new_ptr.is_null() {
            return Err(fail(0));
        }
    }

    if !old_ptr.is_null() && old_count > 0 {
        if !new_ptr.is_null() {
            ptr::copy_nonoverlapping(old_ptr, new_ptr, old_count.min(new_count) * elem_size);
        }
        let mut request = ResizeRequest {
            pointer: old_ptr,
            items: 0,
            allocated_items: old_count,
            bytes_per_item: elem_size,
            alignment,
            allocator: handle,
        };
        if let Err(code) = custom.try_resize(&mut request) {
            // Buffer baru tidak pernah sampai ke caller, kembalikan ke allocator
            if !new_ptr.is_null() {
                let mut undo = ResizeRequest {
                    pointer: new_ptr,
                    items: 0,
                    allocated_items: new_count,
                    bytes_per_item: elem_size,
                    alignment,
                    allocator: handle,
                };
                if let Err(undo_code) = custom.try_resize(&mut undo) {
                    tracing::error!(
                        %handle,
                        code = undo_code,
                        bytes = new_count * elem_size,
                        "custom allocator failed to release replacement buffer; memory leaked"
                    );
                }
            }
            return Err(fail(code));
        }
    }

    Ok(new_ptr)
}
