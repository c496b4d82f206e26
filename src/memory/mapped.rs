//! Built-in `MAPPED` allocator: anonymous page mapping
//!
//! Setiap allocation adalah satu `MmapMut` anonymous:
//! - Page-aligned: alignment sampai ukuran page gratis
//! - Kernel-managed: page baru sudah zero-filled
//! - Free = drop mapping (munmap)
//!
//! Mapping yang hidup disimpan di table berdasarkan alamat base-nya,
//! karena `free` hanya menerima raw pointer.

use crate::error::{AllocError, AllocResult};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Mapping hidup, key = alamat base.
static MAPPINGS: OnceLock<Mutex<HashMap<usize, MmapMut>>> = OnceLock::new();

fn mappings() -> &'static Mutex<HashMap<usize, MmapMut>> {
    MAPPINGS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Ukuran page OS.
#[cfg(unix)]
pub(crate) fn page_size() -> usize {
    // SAFETY: sysconf tidak punya precondition
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

#[cfg(not(unix))]
pub(crate) fn page_size() -> usize {
    4096
}

/// Map `bytes` bytes (dibulatkan ke kelipatan page).
pub(crate) fn allocate(bytes: usize, alignment: usize) -> AllocResult<*mut u8> {
    let page = page_size();
    if alignment > page {
        return Err(AllocError::InvalidAlignment(alignment));
    }

    let len = bytes
        .checked_add(page - 1)
        .map(|n| n & !(page - 1))
        .ok_or(AllocError::SizeOverflow {
            count: bytes,
            elem_size: 1,
        })?;

    let mut mmap = MmapOptions::new()
        .len(len)
        .map_anon()
        .map_err(|e| AllocError::MapFailed {
            bytes: len,
            cause: e.to_string(),
        })?;

    let ptr = mmap.as_mut_ptr();
    mappings().lock().insert(ptr as usize, mmap);
    Ok(ptr)
}

/// Unmap buffer yang sebelumnya dikembalikan `allocate`.
///
/// Returns false untuk pointer asing (tidak ada mapping yang cocok);
/// memory-nya tidak disentuh dan kejadian ini di-log.
pub(crate) fn free(ptr: *mut u8) -> bool {
    let mapping = mappings().lock().remove(&(ptr as usize));
    if mapping.is_none() {
        tracing::warn!(
            ptr = ptr as usize,
            "free of a pointer that was not mapped by the MAPPED allocator"
        );
        return false;
    }
    drop(mapping);
    true
}
