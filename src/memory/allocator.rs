//! Allocator handles dan registry untuk custom allocator
//!
//! Handle di bawah `FIRST_USER_INDEX` adalah built-in (di-dispatch langsung,
//! tanpa lock). Handle di atasnya di-resolve lewat slot table.

use crate::error::{AllocError, AllocResult};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Index pertama yang dicadangkan untuk allocator milik user.
pub const FIRST_USER_INDEX: u16 = 64;

/// Opaque allocator handle: index ke function table + version slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocatorHandle {
    index: u16,
    version: u16,
}

impl AllocatorHandle {
    /// Handle kosong, tidak pernah valid.
    pub const INVALID: Self = Self::builtin(0);
    /// Tidak ada allocator: hanya valid untuk buffer kosong.
    pub const NONE: Self = Self::builtin(1);
    /// Global heap, alignment minimal satu cache line.
    pub const HEAP: Self = Self::builtin(2);
    /// Anonymous page mapping (`memmap2`), untuk buffer besar.
    pub const MAPPED: Self = Self::builtin(3);

    const fn builtin(index: u16) -> Self {
        Self { index, version: 0 }
    }

    #[inline(always)]
    pub const fn index(&self) -> u16 {
        self.index
    }

    #[inline(always)]
    pub const fn version(&self) -> u16 {
        self.version
    }

    /// `true` jika handle menunjuk ke allocator yang di-register user.
    #[inline(always)]
    pub const fn is_custom(&self) -> bool {
        self.index >= FIRST_USER_INDEX
    }
}

impl Default for AllocatorHandle {
    fn default() -> Self {
        Self::HEAP
    }
}

impl fmt::Display for AllocatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.version)
    }
}

/// Descriptor yang diterima custom allocator.
///
/// - `items > 0` dan `pointer` null: allocate `items * bytes_per_item` bytes,
///   tulis hasilnya ke `pointer` dan set `allocated_items = items`.
/// - `items == 0`: free `pointer` (berisi `allocated_items` item), set
///   `pointer` ke null dan `allocated_items` ke 0.
#[derive(Debug)]
pub struct ResizeRequest {
    pub pointer: *mut u8,
    pub items: usize,
    pub allocated_items: usize,
    pub bytes_per_item: usize,
    pub alignment: usize,
    pub allocator: AllocatorHandle,
}

impl ResizeRequest {
    /// Total bytes untuk `items`.
    #[inline(always)]
    pub fn bytes(&self) -> usize {
        self.items * self.bytes_per_item
    }

    /// Total bytes yang saat ini dialokasikan.
    #[inline(always)]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_items * self.bytes_per_item
    }
}

/// Allocator yang di-register user.
///
/// Implementasi harus thread-safe jika handle-nya dipakai dari beberapa
/// thread untuk buffer yang berbeda.
pub trait CustomAllocator: Send + Sync {
    /// Jalankan request. `Err(code)` dianggap fatal oleh caller.
    fn try_resize(&self, request: &mut ResizeRequest) -> Result<(), i32>;
}

struct Slot {
    version: u16,
    allocator: Option<Arc<dyn CustomAllocator>>,
}

static REGISTRY: RwLock<Vec<Slot>> = parking_lot::const_rwlock(Vec::new());

/// Register custom allocator, mengembalikan handle dengan index >= `FIRST_USER_INDEX`.
///
/// Slot yang sudah di-unregister dipakai ulang dengan version baru.
pub fn register_allocator(allocator: Arc<dyn CustomAllocator>) -> AllocResult<AllocatorHandle> {
    let mut slots = REGISTRY.write();

    let position = match slots.iter().position(|slot| slot.allocator.is_none()) {
        Some(position) => {
            slots[position].allocator = Some(allocator);
            position
        }
        None => {
            if slots.len() >= usize::from(u16::MAX - FIRST_USER_INDEX) {
                return Err(AllocError::RegistryFull);
            }
            slots.push(Slot {
                version: 1,
                allocator: Some(allocator),
            });
            slots.len() - 1
        }
    };

    let handle = AllocatorHandle {
        index: FIRST_USER_INDEX + position as u16,
        version: slots[position].version,
    };
    tracing::debug!(%handle, "registered custom allocator");
    Ok(handle)
}

/// Unregister custom allocator. Handle lama menjadi stale.
pub fn unregister_allocator(handle: AllocatorHandle) -> AllocResult<()> {
    let mut slots = REGISTRY.write();
    let slot = slot_mut(&mut slots, handle)?;
    slot.allocator = None;
    slot.version = slot.version.wrapping_add(1).max(1);
    tracing::debug!(%handle, "unregistered custom allocator");
    Ok(())
}

/// `true` jika handle built-in yang bisa mengalokasi, atau custom yang masih aktif.
pub fn is_registered(handle: AllocatorHandle) -> bool {
    if !handle.is_custom() {
        return handle == AllocatorHandle::HEAP || handle == AllocatorHandle::MAPPED;
    }
    lookup(handle).is_ok()
}

/// Resolve custom handle. Lock dilepas sebelum allocator dipanggil.
pub(crate) fn lookup(handle: AllocatorHandle) -> AllocResult<Arc<dyn CustomAllocator>> {
    let slots = REGISTRY.read();
    let position = usize::from(handle.index - FIRST_USER_INDEX);
    let slot = slots
        .get(position)
        .ok_or(AllocError::UnknownHandle(handle))?;
    if slot.version != handle.version {
        return Err(AllocError::StaleHandle(handle));
    }
    slot.allocator
        .clone()
        .ok_or(AllocError::StaleHandle(handle))
}

fn slot_mut(slots: &mut [Slot], handle: AllocatorHandle) -> AllocResult<&mut Slot> {
    if !handle.is_custom() {
        return Err(AllocError::UnknownHandle(handle));
    }
    let position = usize::from(handle.index - FIRST_USER_INDEX);
    let slot = slots
        .get_mut(position)
        .ok_or(AllocError::UnknownHandle(handle))?;
    if slot.version != handle.version || slot.allocator.is_none() {
        return Err(AllocError::StaleHandle(handle));
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refuses;

    impl CustomAllocator for Refuses {
        fn try_resize(&self, _request: &mut ResizeRequest) -> Result<(), i32> {
            Err(-1)
        }
    }

    #[test]
    fn test_builtin_handles() {
        assert!(!AllocatorHandle::HEAP.is_custom());
        assert!(is_registered(AllocatorHandle::HEAP));
        assert!(is_registered(AllocatorHandle::MAPPED));
        assert!(!is_registered(AllocatorHandle::NONE));
        assert!(!is_registered(AllocatorHandle::INVALID));
    }

    #[test]
    fn test_register_unregister() {
        let handle = register_allocator(Arc::new(Refuses)).unwrap();
        assert!(handle.is_custom());
        assert!(handle.index() >= FIRST_USER_INDEX);
        assert!(is_registered(handle));

        unregister_allocator(handle).unwrap();
        assert!(!is_registered(handle));
        assert_eq!(lookup(handle).err(), Some(AllocError::StaleHandle(handle)));

        // Double unregister ditolak
        assert!(unregister_allocator(handle).is_err());
    }

    #[test]
    fn test_slot_reuse_bumps_version() {
        let first = register_allocator(Arc::new(Refuses)).unwrap();
        unregister_allocator(first).unwrap();

        // Slot bisa direbut test lain yang jalan paralel, jadi cukup cek
        // bahwa handle lama tidak pernah hidup lagi.
        let second = register_allocator(Arc::new(Refuses)).unwrap();
        assert_ne!(first, second);
        assert!(!is_registered(first));
        assert!(is_registered(second));
        unregister_allocator(second).unwrap();
    }
}
