//! FixedString: string UTF-8 inline dengan kapasitas tetap
//!
//! Layout `N` bytes: 2 byte length + `N - 3` byte data + 1 byte cadangan,
//! sehingga `FixedString32` memuat 29 bytes. Tidak ada alokasi heap.

use std::fmt;
use std::hash::{Hash, Hasher};

/// String inline maksimal `N - 3` bytes.
#[derive(Clone, Copy)]
pub struct FixedString<const N: usize> {
    len: u16,
    bytes: [u8; N],
}

pub type FixedString32 = FixedString<32>;
pub type FixedString64 = FixedString<64>;
pub type FixedString128 = FixedString<128>;
pub type FixedString512 = FixedString<512>;
pub type FixedString4096 = FixedString<4096>;

impl<const N: usize> FixedString<N> {
    /// Kapasitas dalam bytes.
    pub const CAPACITY: usize = N - 3;

    pub const fn new() -> Self {
        Self {
            len: 0,
            bytes: [0; N],
        }
    }

    /// Copy `s`, atau None jika tidak muat.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let mut out = Self::new();
        out.set_str(s).then_some(out)
    }

    /// Ganti isi dengan `s`. Returns false (tanpa perubahan) jika tidak muat.
    pub fn set_str(&mut self, s: &str) -> bool {
        if s.len() > Self::CAPACITY {
            return false;
        }
        self.bytes[..s.len()].copy_from_slice(s.as_bytes());
        self.len = s.len() as u16;
        true
    }

    /// Isi dari raw bytes (dipakai decoder). Returns false jika tidak muat.
    pub(crate) fn set_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > Self::CAPACITY {
            return false;
        }
        self.bytes[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len() as u16;
        true
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Isi sebagai `&str`, atau None jika hasil decode bukan UTF-8 valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        Self::new()
    }
}

// Hanya isi yang dibandingkan, sisa buffer bisa berisi data lama
impl<const N: usize> PartialEq for FixedString<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const N: usize> Eq for FixedString<N> {}

impl<const N: usize> Hash for FixedString<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedString<{}>({:?})", N, String::from_utf8_lossy(self.as_bytes()))
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}
