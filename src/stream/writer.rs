//! StreamWriter: cursor tulis per lane
//!
//! Cursor bersifat move-only dan hanya dimutasi lewat `&mut`, jadi progress
//! tidak bisa hilang karena copy. State lokal di-commit ke record lane saat
//! `end_for_each_index`.

use super::block_stream::{BlockStream, LaneState};
use super::element::Element;
use super::pool::{write_next, BlockId, BLOCK_HEADER_SIZE, BLOCK_SIZE, MAX_ALLOCATION_SIZE};
use super::usage_error;
use crate::error::{StreamError, StreamResult};
use std::ops::Range;
use std::ptr;

/// Session tulis yang sedang terbuka.
struct WriteSession {
    lane: usize,
    first_block: Option<BlockId>,
    /// Base pointer block terakhir (null sebelum allocation pertama).
    current: *mut u8,
    /// Offset tulis di dalam block terakhir.
    offset: usize,
    item_count: usize,
    byte_count: usize,
}

/// Writer untuk lane-lane di dalam satu partition.
pub struct StreamWriter<'a> {
    stream: &'a BlockStream,
    partition: Range<usize>,
    session: Option<WriteSession>,
}

// SAFETY: pointer di session hanya menunjuk ke block milik lane yang sedang
// di-claim writer ini; tidak ada thread lain yang menyentuhnya.
unsafe impl Send for StreamWriter<'_> {}

impl<'a> StreamWriter<'a> {
    pub(crate) fn new(stream: &'a BlockStream, partition: Range<usize>) -> Self {
        Self {
            stream,
            partition,
            session: None,
        }
    }

    /// Partition lane yang boleh ditulis writer ini.
    pub fn partition(&self) -> Range<usize> {
        self.partition.clone()
    }

    /// Buka session tulis pada `lane`. Setiap lane hanya boleh ditulis sekali.
    pub fn begin_for_each_index(&mut self, lane: usize) -> StreamResult<()> {
        if let Some(session) = &self.session {
            return Err(usage_error(StreamError::SessionAlreadyOpen(session.lane)));
        }

        let lane_count = self.stream.lanes.len();
        let record = self.stream.lanes.get(lane).ok_or_else(|| {
            usage_error(StreamError::LaneOutOfRange { lane, lane_count })
        })?;

        if !self.partition.contains(&lane) {
            return Err(usage_error(StreamError::LaneOutsidePartition {
                lane,
                start: self.partition.start,
                end: self.partition.end,
            }));
        }

        {
            let mut range = record.lock();
            if range.state != LaneState::Empty {
                return Err(usage_error(StreamError::LaneAlreadyWritten(lane)));
            }
            range.state = LaneState::Writing;
        }

        self.session = Some(WriteSession {
            lane,
            first_block: None,
            current: ptr::null_mut(),
            offset: 0,
            item_count: 0,
            byte_count: 0,
        });
        Ok(())
    }

    /// Reservasi `size` bytes di tail block lane yang aktif.
    ///
    /// Block baru di-link jika block terakhir tidak cukup. Slice yang
    /// dikembalikan menunjuk ke memory stream dan stabil sampai stream di-drop.
    pub fn allocate(&mut self, size: usize) -> StreamResult<&mut [u8]> {
        if size > MAX_ALLOCATION_SIZE {
            return Err(usage_error(StreamError::AllocationTooLarge {
                size,
                max: MAX_ALLOCATION_SIZE,
            }));
        }

        let stream = self.stream;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| usage_error(StreamError::NoActiveSession))?;

        if size == 0 {
            // Item kosong tidak butuh block; reader juga tidak menyentuh memory
            session.item_count += 1;
            return Ok(&mut []);
        }

        if session.current.is_null() || session.offset + size > BLOCK_SIZE {
            let (id, base) = stream.pool.allocate()?;
            match session.first_block {
                None => session.first_block = Some(id),
                Some(_) => write_next(session.current, id),
            }
            tracing::trace!(lane = session.lane, block = id, "linked stream block");
            session.current = base;
            session.offset = BLOCK_HEADER_SIZE;
        }

        // SAFETY: offset + size <= BLOCK_SIZE, block milik lane ini secara eksklusif
        let data = unsafe { session.current.add(session.offset) };
        session.offset += size;
        session.item_count += 1;
        session.byte_count += size;

        Ok(unsafe { std::slice::from_raw_parts_mut(data, size) })
    }

    /// Tulis satu value sebagai satu item.
    #[inline(always)]
    pub fn write<T: Element>(&mut self, value: T) -> StreamResult<()> {
        let slot = self.allocate(std::mem::size_of::<T>())?;
        // SAFETY: slot tepat size_of::<T>() bytes
        unsafe { ptr::write_unaligned(slot.as_mut_ptr() as *mut T, value) };
        Ok(())
    }

    /// Tulis bytes sebagai satu item.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> StreamResult<()> {
        self.allocate(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Tutup session dan commit lane. Lane menjadi immutable.
    pub fn end_for_each_index(&mut self) -> StreamResult<()> {
        let session = self
            .session
            .take()
            .ok_or_else(|| usage_error(StreamError::NoActiveSession))?;

        let mut range = self.stream.lanes[session.lane].lock();
        range.first_block = session.first_block.unwrap_or(super::pool::NO_BLOCK);
        range.item_count = session.item_count;
        range.byte_count = session.byte_count;
        range.state = LaneState::Written;
        Ok(())
    }

    /// Jumlah item yang sudah ditulis pada session aktif.
    pub fn item_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.item_count)
    }
}

impl Drop for StreamWriter<'_> {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            tracing::warn!(
                lane = session.lane,
                items = session.item_count,
                "stream writer dropped with an open session; lane stays uncommitted"
            );
        }
    }
}
