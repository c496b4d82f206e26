//! DataStreamWriter: bit-packed encoder ke pre-allocated buffer
//!
//! Semua operasi encode dilakukan langsung ke buffer milik caller,
//! tidak ada alokasi dinamis. Setiap write mengembalikan `bool`:
//! - `true`: write diterapkan penuh
//! - `false`: buffer tidak cukup, state TIDAK berubah, failure counter naik
//!
//! Bits ditulis LSB-first ke accumulator 64-bit dan di-flush per byte.

use super::fixed_string::FixedString;
use super::model::CompressionModel;

/// Cursor state. `Copy` supaya bisa di-snapshot dan di-restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WriterState {
    /// Bytes yang sudah di-commit ke buffer.
    length: usize,
    /// Bits pending (LSB-first).
    bit_buffer: u64,
    /// Jumlah bits valid di `bit_buffer`.
    bit_index: u32,
    failed_writes: u32,
}

/// Bit-packed writer di atas `&mut [u8]`.
///
/// Invariant: `length + ceil(bit_index / 8) <= capacity` setelah setiap operasi.
pub struct DataStreamWriter<'a> {
    buffer: &'a mut [u8],
    state: WriterState,
}

macro_rules! write_fixed {
    ($($(#[$doc:meta])* $name:ident($ty:ty) => $to_bytes:ident;)*) => {
        $(
            $(#[$doc])*
            #[inline(always)]
            pub fn $name(&mut self, value: $ty) -> bool {
                self.write_bytes(&value.$to_bytes())
            }
        )*
    };
}

impl<'a> DataStreamWriter<'a> {
    /// Membuat writer di atas `buffer`. Kapasitas = panjang buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            state: WriterState::default(),
        }
    }

    /// `true` pada host little-endian.
    #[inline(always)]
    pub const fn is_little_endian() -> bool {
        cfg!(target_endian = "little")
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes yang dipakai, termasuk bits pending yang dibulatkan ke atas.
    #[inline(always)]
    pub fn length(&self) -> usize {
        self.state.length + ((self.state.bit_index + 7) >> 3) as usize
    }

    #[inline(always)]
    pub fn length_in_bits(&self) -> usize {
        self.state.length * 8 + self.state.bit_index as usize
    }

    /// Sticky: true jika ada write yang gagal sejak `clear` terakhir.
    #[inline(always)]
    pub fn has_failed_writes(&self) -> bool {
        self.state.failed_writes > 0
    }

    #[inline(always)]
    pub fn failed_writes(&self) -> u32 {
        self.state.failed_writes
    }

    /// Reset writer untuk reuse (termasuk failure counter).
    pub fn clear(&mut self) {
        self.state = WriterState::default();
    }

    /// Bytes yang sudah di-commit. Panggil `flush` dulu untuk ikut
    /// menyertakan bits pending.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.state.length]
    }

    /// Paksa bits pending keluar ke buffer (di-pad dengan nol).
    pub fn flush(&mut self) {
        while self.state.bit_index > 0 {
            self.buffer[self.state.length] = self.state.bit_buffer as u8;
            self.state.length += 1;
            self.state.bit_buffer >>= 8;
            self.state.bit_index = self.state.bit_index.saturating_sub(8);
        }
        self.state.bit_buffer = 0;
    }

    /// Cek apakah `extra_bits` lagi masih muat.
    #[inline(always)]
    fn fits_bits(&self, extra_bits: u32) -> bool {
        self.state.length + ((self.state.bit_index + extra_bits + 7) >> 3) as usize
            <= self.buffer.len()
    }

    /// Cek apakah `bytes` byte-aligned lagi masih muat (setelah flush).
    #[inline(always)]
    fn fits_bytes(&self, bytes: usize) -> bool {
        self.length() + bytes <= self.buffer.len()
    }

    #[cold]
    fn fail(&mut self) -> bool {
        self.state.failed_writes += 1;
        false
    }

    #[inline(always)]
    fn push_bits(&mut self, value: u32, num_bits: u32) {
        let mask = (1u64 << num_bits) - 1;
        self.state.bit_buffer |= (u64::from(value) & mask) << self.state.bit_index;
        self.state.bit_index += num_bits;
    }

    #[inline(always)]
    fn flush_bits(&mut self) {
        while self.state.bit_index >= 8 {
            self.buffer[self.state.length] = self.state.bit_buffer as u8;
            self.state.length += 1;
            self.state.bit_buffer >>= 8;
            self.state.bit_index -= 8;
        }
    }

    // ------------------------------------------------------------------
    // Byte-aligned
    // ------------------------------------------------------------------

    /// Copy raw bytes setelah flush bits pending.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> bool {
        if !self.fits_bytes(bytes.len()) {
            return self.fail();
        }
        self.flush();
        let start = self.state.length;
        self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
        self.state.length += bytes.len();
        true
    }

    write_fixed! {
        write_byte(u8) => to_ne_bytes;
        write_sbyte(i8) => to_ne_bytes;
        write_short(i16) => to_ne_bytes;
        write_ushort(u16) => to_ne_bytes;
        write_int(i32) => to_ne_bytes;
        write_uint(u32) => to_ne_bytes;
        write_long(i64) => to_ne_bytes;
        write_ulong(u64) => to_ne_bytes;
        write_float(f32) => to_ne_bytes;
        write_double(f64) => to_ne_bytes;
        /// Big-endian, apapun endianness host.
        write_short_network_byte_order(i16) => to_be_bytes;
        /// Big-endian, apapun endianness host.
        write_ushort_network_byte_order(u16) => to_be_bytes;
        /// Big-endian, apapun endianness host.
        write_int_network_byte_order(i32) => to_be_bytes;
        /// Big-endian, apapun endianness host.
        write_uint_network_byte_order(u32) => to_be_bytes;
        /// Big-endian, apapun endianness host.
        write_long_network_byte_order(i64) => to_be_bytes;
        /// Big-endian, apapun endianness host.
        write_ulong_network_byte_order(u64) => to_be_bytes;
    }

    // ------------------------------------------------------------------
    // Bit-level
    // ------------------------------------------------------------------

    /// Tulis `num_bits` bit terbawah dari `value` (0..=32 bits).
    pub fn write_raw_bits(&mut self, value: u32, num_bits: u32) -> bool {
        debug_assert!(num_bits <= 32, "num_bits must be in 0..=32, got {num_bits}");
        debug_assert!(
            num_bits == 32 || value >> num_bits == 0,
            "value {value} does not fit in {num_bits} bits"
        );
        if !self.fits_bits(num_bits) {
            return self.fail();
        }
        self.push_bits(value, num_bits);
        self.flush_bits();
        true
    }

    // ------------------------------------------------------------------
    // Packed
    // ------------------------------------------------------------------

    #[inline(always)]
    fn push_packed(&mut self, value: u32, model: &CompressionModel) {
        let bucket = model.bucket_for(value);
        let (code, length) = model.encode_entry(bucket);
        self.push_bits(code, length);
        self.push_bits(value - model.bucket_offset(bucket), model.bucket_size(bucket));
        self.flush_bits();
    }

    /// Prefix bucket + payload. Semua atau tidak sama sekali.
    pub fn write_packed_uint(&mut self, value: u32, model: &CompressionModel) -> bool {
        if !self.fits_bits(model.packed_bit_len(value)) {
            return self.fail();
        }
        self.push_packed(value, model);
        true
    }

    /// Zig-zag (`0, -1, 1, -2, ...` ↦ `0, 1, 2, 3, ...`) lalu packed.
    #[inline(always)]
    pub fn write_packed_int(&mut self, value: i32, model: &CompressionModel) -> bool {
        self.write_packed_uint(zigzag32(value), model)
    }

    /// Dua half 32-bit (high dulu) dengan satu capacity check.
    pub fn write_packed_ulong(&mut self, value: u64, model: &CompressionModel) -> bool {
        let high = (value >> 32) as u32;
        let low = value as u32;
        if !self.fits_bits(model.packed_bit_len(high) + model.packed_bit_len(low)) {
            return self.fail();
        }
        self.push_packed(high, model);
        self.push_packed(low, model);
        true
    }

    #[inline(always)]
    pub fn write_packed_long(&mut self, value: i64, model: &CompressionModel) -> bool {
        self.write_packed_ulong(zigzag64(value), model)
    }

    /// Delta terhadap `baseline`: menulis `baseline - value` sebagai signed packed.
    #[inline(always)]
    pub fn write_packed_uint_delta(
        &mut self,
        value: u32,
        baseline: u32,
        model: &CompressionModel,
    ) -> bool {
        self.write_packed_int(baseline.wrapping_sub(value) as i32, model)
    }

    #[inline(always)]
    pub fn write_packed_int_delta(
        &mut self,
        value: i32,
        baseline: i32,
        model: &CompressionModel,
    ) -> bool {
        self.write_packed_int(baseline.wrapping_sub(value), model)
    }

    #[inline(always)]
    pub fn write_packed_ulong_delta(
        &mut self,
        value: u64,
        baseline: u64,
        model: &CompressionModel,
    ) -> bool {
        self.write_packed_long(baseline.wrapping_sub(value) as i64, model)
    }

    #[inline(always)]
    pub fn write_packed_long_delta(
        &mut self,
        value: i64,
        baseline: i64,
        model: &CompressionModel,
    ) -> bool {
        self.write_packed_long(baseline.wrapping_sub(value), model)
    }

    /// Float "packed" = delta terhadap 0.0.
    #[inline(always)]
    pub fn write_packed_float(&mut self, value: f32) -> bool {
        self.write_packed_float_delta(value, 0.0)
    }

    /// Presence bit (0 = sama dengan baseline), lalu 32 raw bits jika berubah.
    ///
    /// "Sama" dibandingkan per bit pattern, jadi `-0.0` dan NaN ikut terkirim.
    pub fn write_packed_float_delta(&mut self, value: f32, baseline: f32) -> bool {
        let changed = value.to_bits() != baseline.to_bits();
        if !self.fits_bits(if changed { 33 } else { 1 }) {
            return self.fail();
        }
        if changed {
            self.push_bits(1, 1);
            self.push_bits(value.to_bits(), 32);
        } else {
            self.push_bits(0, 1);
        }
        self.flush_bits();
        true
    }

    #[inline(always)]
    pub fn write_packed_double(&mut self, value: f64) -> bool {
        self.write_packed_double_delta(value, 0.0)
    }

    /// Presence bit, lalu 64 raw bits (low half dulu) jika berubah.
    pub fn write_packed_double_delta(&mut self, value: f64, baseline: f64) -> bool {
        let bits = value.to_bits();
        let changed = bits != baseline.to_bits();
        if !self.fits_bits(if changed { 65 } else { 1 }) {
            return self.fail();
        }
        if changed {
            self.push_bits(1, 1);
            self.push_bits(bits as u32, 32);
            self.flush_bits();
            self.push_bits((bits >> 32) as u32, 32);
        } else {
            self.push_bits(0, 1);
        }
        self.flush_bits();
        true
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Length (u16, host order) + raw bytes, satu capacity check.
    pub fn write_fixed_string<const N: usize>(&mut self, value: &FixedString<N>) -> bool {
        let bytes = value.as_bytes();
        if !self.fits_bytes(2 + bytes.len()) {
            return self.fail();
        }
        self.write_ushort(bytes.len() as u16) && self.write_bytes(bytes)
    }

    /// Packed delta string terhadap `baseline`.
    ///
    /// Wire: delta length, lalu delta per byte untuk prefix yang overlap dan
    /// packed biasa untuk byte baru. Jika ada bagian yang gagal, seluruh
    /// state di-rollback ke posisi sebelum call ini.
    pub fn write_packed_fixed_string_delta<const N: usize>(
        &mut self,
        value: &FixedString<N>,
        baseline: &FixedString<N>,
        model: &CompressionModel,
    ) -> bool {
        self.write_packed_bytes_delta(value.as_bytes(), baseline.as_bytes(), model)
    }

    fn write_packed_bytes_delta(
        &mut self,
        data: &[u8],
        baseline: &[u8],
        model: &CompressionModel,
    ) -> bool {
        let snapshot = self.state;

        if !self.write_packed_uint_delta(data.len() as u32, baseline.len() as u32, model) {
            return false;
        }

        let overlap = data.len().min(baseline.len());
        let ok = data[..overlap]
            .iter()
            .zip(&baseline[..overlap])
            .all(|(&b, &base)| self.write_packed_uint_delta(u32::from(b), u32::from(base), model))
            && data[overlap..]
                .iter()
                .all(|&b| self.write_packed_uint(u32::from(b), model));

        if !ok {
            self.state = snapshot;
            self.state.failed_writes += 1;
        }
        ok
    }
}

#[inline(always)]
pub(crate) fn zigzag32(value: i32) -> u32 {
    ((value >> 31) ^ (value << 1)) as u32
}

#[inline(always)]
pub(crate) fn zigzag64(value: i64) -> u64 {
    ((value >> 63) ^ (value << 1)) as u64
}
