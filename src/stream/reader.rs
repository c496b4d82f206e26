//! StreamReader: cursor baca per lane (zero-copy)

use super::block_stream::{BlockStream, LaneState};
use super::element::Element;
use super::pool::{read_next, BLOCK_HEADER_SIZE, BLOCK_SIZE};
use super::usage_error;
use crate::error::{StreamError, StreamResult};
use std::ptr;

struct ReadSession {
    lane: usize,
    /// Base pointer block saat ini (null untuk lane kosong).
    current: *const u8,
    offset: usize,
    remaining_items: usize,
    remaining_bytes: usize,
}

/// Reader untuk lane yang sudah di-commit.
///
/// Slice hasil `read_bytes` meminjam stream, bukan reader: lane yang sudah
/// ditulis tidak pernah berubah lagi sampai stream di-drop.
pub struct StreamReader<'a> {
    stream: &'a BlockStream,
    session: Option<ReadSession>,
}

// SAFETY: pointer hanya menunjuk ke block lane yang sudah immutable
unsafe impl Send for StreamReader<'_> {}

impl<'a> StreamReader<'a> {
    pub(crate) fn new(stream: &'a BlockStream) -> Self {
        Self {
            stream,
            session: None,
        }
    }

    /// Posisikan reader di awal `lane`. Returns jumlah item yang bisa dibaca.
    pub fn begin_for_each_index(&mut self, lane: usize) -> StreamResult<usize> {
        if let Some(session) = &self.session {
            return Err(usage_error(StreamError::SessionAlreadyOpen(session.lane)));
        }

        let range = self.stream.lane(lane)?;
        let (current, items, bytes) = match range.state {
            LaneState::Empty => (ptr::null(), 0, 0),
            LaneState::Writing => return Err(usage_error(StreamError::LaneBeingWritten(lane))),
            LaneState::Written => {
                let base = self
                    .stream
                    .pool
                    .base(range.first_block)
                    .map_or(ptr::null(), |p| p as *const u8);
                (base, range.item_count, range.byte_count)
            }
        };

        self.session = Some(ReadSession {
            lane,
            current,
            offset: BLOCK_HEADER_SIZE,
            remaining_items: items,
            remaining_bytes: bytes,
        });
        Ok(items)
    }

    /// Baca `size` bytes sebagai satu item.
    pub fn read_bytes(&mut self, size: usize) -> StreamResult<&'a [u8]> {
        let located = self.locate(size)?;
        let session = self
            .session
            .as_mut()
            .ok_or(StreamError::NoActiveSession)?;
        session.current = located.block;
        session.offset = located.end;
        session.remaining_items = session.remaining_items.saturating_sub(1);
        session.remaining_bytes -= size;

        if size == 0 {
            return Ok(&[]);
        }
        // SAFETY: locate menjamin [data, data + size) di dalam satu block yang immutable
        Ok(unsafe { std::slice::from_raw_parts(located.data, size) })
    }

    /// Baca satu value dan maju ke item berikutnya.
    #[inline(always)]
    pub fn read<T: Element>(&mut self) -> StreamResult<T> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        // SAFETY: Element valid untuk semua bit pattern
        Ok(unsafe { ptr::read_unaligned(bytes.as_ptr() as *const T) })
    }

    /// Baca value berikutnya tanpa memajukan cursor.
    pub fn peek<T: Element>(&self) -> StreamResult<T> {
        let size = std::mem::size_of::<T>();
        let located = self.locate(size)?;
        // SAFETY: sama seperti read
        Ok(unsafe { ptr::read_unaligned(located.data as *const T) })
    }

    /// Sisa item pada session aktif.
    pub fn remaining_item_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.remaining_items)
    }

    /// Tutup session. Dengan validasi aktif, semua item dan bytes harus sudah dibaca.
    ///
    /// Caller yang sengaja tidak membaca habis cukup tidak memanggil ini
    /// (atau memanggil `begin_for_each_index` berikutnya setelah `abandon`).
    pub fn end_for_each_index(&mut self) -> StreamResult<()> {
        let session = self
            .session
            .take()
            .ok_or_else(|| usage_error(StreamError::NoActiveSession))?;

        if self.stream.validate && (session.remaining_items != 0 || session.remaining_bytes != 0) {
            return Err(usage_error(StreamError::UnconsumedData {
                lane: session.lane,
                items: session.remaining_items,
                bytes: session.remaining_bytes,
            }));
        }
        Ok(())
    }

    /// Tutup session tanpa pengecekan konsumsi.
    pub fn abandon(&mut self) {
        self.session = None;
    }

    /// Cari lokasi `size` bytes berikutnya tanpa mengubah state.
    fn locate(&self, size: usize) -> StreamResult<Located> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| usage_error(StreamError::NoActiveSession))?;

        let past_end = || {
            usage_error(StreamError::ReadPastEnd {
                lane: session.lane,
                size,
            })
        };

        let past_items = self.stream.validate && session.remaining_items == 0;
        if past_items || size > session.remaining_bytes {
            return Err(past_end());
        }
        if size == 0 {
            return Ok(Located {
                block: session.current,
                data: ptr::NonNull::<u8>::dangling().as_ptr(),
                end: session.offset,
            });
        }

        if session.offset + size <= BLOCK_SIZE {
            return Ok(Located {
                block: session.current,
                // SAFETY: masih di dalam block saat ini
                data: unsafe { session.current.add(session.offset) },
                end: session.offset + size,
            });
        }

        // Writer pindah block di titik yang sama, jadi reader mengikuti link.
        if BLOCK_HEADER_SIZE + size > BLOCK_SIZE {
            return Err(past_end());
        }
        let block = read_next(session.current)
            .and_then(|id| self.stream.pool.base(id))
            .ok_or_else(past_end)? as *const u8;

        Ok(Located {
            block,
            // SAFETY: size <= payload satu block
            data: unsafe { block.add(BLOCK_HEADER_SIZE) },
            end: BLOCK_HEADER_SIZE + size,
        })
    }
}

/// Posisi item berikutnya: block tempat data berada, pointer data, dan
/// offset setelah item.
struct Located {
    block: *const u8,
    data: *const u8,
    end: usize,
}
