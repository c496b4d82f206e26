//! DataStreamReader: decoder kebalikan persis dari `DataStreamWriter`
//!
//! Zero-copy: `read_bytes` mengembalikan slice yang meminjam buffer input.
//! Read yang gagal mengembalikan nilai default, state cursor tidak berubah,
//! dan flag `has_failed_reads` menyala (sticky).

use super::fixed_string::FixedString;
use super::model::{CompressionModel, MAX_SYMBOL_LENGTH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ReaderState {
    /// Bytes yang sudah ditarik ke `bit_buffer` atau dibaca langsung.
    read_byte_index: usize,
    bit_buffer: u64,
    /// Bits yang belum dikonsumsi di `bit_buffer`.
    bit_index: u32,
    failed_reads: u32,
}

/// Bit-packed reader di atas `&[u8]`.
pub struct DataStreamReader<'a> {
    buffer: &'a [u8],
    state: ReaderState,
}

macro_rules! read_fixed {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty => $from_bytes:ident;)*) => {
        $(
            $(#[$doc])*
            #[inline(always)]
            pub fn $name(&mut self) -> $ty {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                self.read_bytes_into(&mut raw);
                <$ty>::$from_bytes(raw)
            }
        )*
    };
}

impl<'a> DataStreamReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            state: ReaderState::default(),
        }
    }

    /// Panjang buffer input.
    #[inline(always)]
    pub fn length(&self) -> usize {
        self.buffer.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline(always)]
    pub fn has_failed_reads(&self) -> bool {
        self.state.failed_reads > 0
    }

    /// Bytes yang sudah dikonsumsi (byte yang baru terbaca sebagian ikut dihitung).
    #[inline(always)]
    pub fn get_bytes_read(&self) -> usize {
        self.state.read_byte_index - (self.state.bit_index >> 3) as usize
    }

    #[inline(always)]
    pub fn get_bits_read(&self) -> usize {
        self.state.read_byte_index * 8 - self.state.bit_index as usize
    }

    /// Pindah ke byte `position` dan buang bits yang sedang di-buffer.
    pub fn seek_set(&mut self, position: usize) -> bool {
        if position > self.buffer.len() {
            return self.fail();
        }
        self.state.read_byte_index = position;
        self.state.bit_buffer = 0;
        self.state.bit_index = 0;
        true
    }

    #[cold]
    fn fail(&mut self) -> bool {
        self.state.failed_reads += 1;
        false
    }

    /// Jalankan `op`; jika gagal, kembalikan state semula dan tandai failure.
    #[inline(always)]
    fn atomically<T: Default>(&mut self, op: impl FnOnce(&mut Self) -> Option<T>) -> T {
        let snapshot = self.state;
        match op(self) {
            Some(value) => value,
            None => {
                self.state = snapshot;
                self.fail();
                T::default()
            }
        }
    }

    // ------------------------------------------------------------------
    // Byte-aligned
    // ------------------------------------------------------------------

    /// Buang byte pending di bit buffer; byte yang terbaca sebagian dianggap selesai.
    #[inline(always)]
    fn align(&mut self) {
        self.state.read_byte_index -= (self.state.bit_index >> 3) as usize;
        self.state.bit_index = 0;
        self.state.bit_buffer = 0;
    }

    fn take_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let start = self.get_bytes_read();
        let end = start.checked_add(len)?;
        let bytes = self.buffer.get(start..end)?;
        self.align();
        self.state.read_byte_index = end;
        Some(bytes)
    }

    /// `len` bytes berikutnya tanpa copy. Slice kosong jika tidak cukup.
    pub fn read_bytes(&mut self, len: usize) -> &'a [u8] {
        self.atomically(|r| r.take_bytes(len))
    }

    /// Isi `out` penuh, atau nol semua jika tidak cukup.
    pub fn read_bytes_into(&mut self, out: &mut [u8]) -> bool {
        let failed = self.state.failed_reads;
        let bytes = self.read_bytes(out.len());
        if self.state.failed_reads != failed {
            out.fill(0);
            return false;
        }
        out.copy_from_slice(bytes);
        true
    }

    read_fixed! {
        read_byte -> u8 => from_ne_bytes;
        read_sbyte -> i8 => from_ne_bytes;
        read_short -> i16 => from_ne_bytes;
        read_ushort -> u16 => from_ne_bytes;
        read_int -> i32 => from_ne_bytes;
        read_uint -> u32 => from_ne_bytes;
        read_long -> i64 => from_ne_bytes;
        read_ulong -> u64 => from_ne_bytes;
        read_float -> f32 => from_ne_bytes;
        read_double -> f64 => from_ne_bytes;
        read_short_network_byte_order -> i16 => from_be_bytes;
        read_ushort_network_byte_order -> u16 => from_be_bytes;
        read_int_network_byte_order -> i32 => from_be_bytes;
        read_uint_network_byte_order -> u32 => from_be_bytes;
        read_long_network_byte_order -> i64 => from_be_bytes;
        read_ulong_network_byte_order -> u64 => from_be_bytes;
    }

    // ------------------------------------------------------------------
    // Bit-level
    // ------------------------------------------------------------------

    #[inline(always)]
    fn fill_bit_buffer(&mut self) {
        while self.state.bit_index <= 56 {
            let Some(&byte) = self.buffer.get(self.state.read_byte_index) else {
                break;
            };
            self.state.bit_buffer |= u64::from(byte) << self.state.bit_index;
            self.state.read_byte_index += 1;
            self.state.bit_index += 8;
        }
    }

    #[inline(always)]
    fn take_bits(&mut self, num_bits: u32) -> Option<u32> {
        self.fill_bit_buffer();
        if self.state.bit_index < num_bits {
            return None;
        }
        let value = self.state.bit_buffer & ((1u64 << num_bits) - 1);
        self.state.bit_buffer >>= num_bits;
        self.state.bit_index -= num_bits;
        Some(value as u32)
    }

    /// Baca `num_bits` (0..=32) bits LSB-first.
    pub fn read_raw_bits(&mut self, num_bits: u32) -> u32 {
        debug_assert!(num_bits <= 32, "num_bits must be in 0..=32, got {num_bits}");
        self.atomically(|r| r.take_bits(num_bits))
    }

    // ------------------------------------------------------------------
    // Packed
    // ------------------------------------------------------------------

    fn take_packed(&mut self, model: &CompressionModel) -> Option<u32> {
        self.fill_bit_buffer();
        let peek = (self.state.bit_buffer & ((1u64 << MAX_SYMBOL_LENGTH) - 1)) as u32;
        let (bucket, length) = model.decode_entry(peek);
        self.take_bits(length)?;
        let payload = self.take_bits(model.bucket_size(bucket))?;
        Some(payload.wrapping_add(model.bucket_offset(bucket)))
    }

    pub fn read_packed_uint(&mut self, model: &CompressionModel) -> u32 {
        self.atomically(|r| r.take_packed(model))
    }

    pub fn read_packed_int(&mut self, model: &CompressionModel) -> i32 {
        unzigzag32(self.read_packed_uint(model))
    }

    pub fn read_packed_ulong(&mut self, model: &CompressionModel) -> u64 {
        self.atomically(|r| {
            let high = r.take_packed(model)?;
            let low = r.take_packed(model)?;
            Some((u64::from(high) << 32) | u64::from(low))
        })
    }

    pub fn read_packed_long(&mut self, model: &CompressionModel) -> i64 {
        unzigzag64(self.read_packed_ulong(model))
    }

    /// Kebalikan `write_packed_uint_delta`. Gagal → `baseline - 0`, yaitu baseline.
    pub fn read_packed_uint_delta(&mut self, baseline: u32, model: &CompressionModel) -> u32 {
        baseline.wrapping_sub(self.read_packed_int(model) as u32)
    }

    pub fn read_packed_int_delta(&mut self, baseline: i32, model: &CompressionModel) -> i32 {
        baseline.wrapping_sub(self.read_packed_int(model))
    }

    pub fn read_packed_ulong_delta(&mut self, baseline: u64, model: &CompressionModel) -> u64 {
        baseline.wrapping_sub(self.read_packed_long(model) as u64)
    }

    pub fn read_packed_long_delta(&mut self, baseline: i64, model: &CompressionModel) -> i64 {
        baseline.wrapping_sub(self.read_packed_long(model))
    }

    pub fn read_packed_float(&mut self) -> f32 {
        self.read_packed_float_delta(0.0)
    }

    pub fn read_packed_float_delta(&mut self, baseline: f32) -> f32 {
        let bits = self.atomically(|r| match r.take_bits(1)? {
            0 => Some(baseline.to_bits()),
            _ => r.take_bits(32),
        });
        f32::from_bits(bits)
    }

    pub fn read_packed_double(&mut self) -> f64 {
        self.read_packed_double_delta(0.0)
    }

    pub fn read_packed_double_delta(&mut self, baseline: f64) -> f64 {
        let bits = self.atomically(|r| match r.take_bits(1)? {
            0 => Some(baseline.to_bits()),
            _ => {
                let low = r.take_bits(32)?;
                let high = r.take_bits(32)?;
                Some((u64::from(high) << 32) | u64::from(low))
            }
        });
        f64::from_bits(bits)
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// u16 length + raw bytes. String kosong jika gagal atau length > kapasitas.
    pub fn read_fixed_string<const N: usize>(&mut self) -> FixedString<N> {
        self.atomically(|r| {
            let len = r.take_bytes(2)?;
            let len = usize::from(u16::from_ne_bytes([len[0], len[1]]));
            let mut out = FixedString::new();
            out.set_bytes(r.take_bytes(len)?).then_some(out)
        })
    }

    /// Kebalikan `write_packed_fixed_string_delta`.
    pub fn read_packed_fixed_string_delta<const N: usize>(
        &mut self,
        baseline: &FixedString<N>,
        model: &CompressionModel,
    ) -> FixedString<N> {
        self.atomically(|r| {
            let base = baseline.as_bytes();
            let diff = unzigzag32(r.take_packed(model)?);
            let len = (base.len() as u32).wrapping_sub(diff as u32) as usize;
            if len > FixedString::<N>::CAPACITY {
                return None;
            }

            let mut bytes = [0u8; N];
            for (i, slot) in bytes[..len].iter_mut().enumerate() {
                let value = match base.get(i) {
                    Some(&b) => u32::from(b).wrapping_sub(unzigzag32(r.take_packed(model)?) as u32),
                    None => r.take_packed(model)?,
                };
                *slot = value as u8;
            }

            let mut out = FixedString::new();
            out.set_bytes(&bytes[..len]).then_some(out)
        })
    }
}

#[inline(always)]
pub(crate) fn unzigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline(always)]
pub(crate) fn unzigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
