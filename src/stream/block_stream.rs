//! BlockStream: N lane append-only di atas satu block pool

use super::element::Element;
use super::pool::{BlockId, BlockPool, NO_BLOCK};
use super::reader::StreamReader;
use super::usage_error;
use super::writer::StreamWriter;
use crate::error::{StreamError, StreamResult};
use crate::memory::AllocatorHandle;
use parking_lot::Mutex;
use std::ops::Range;

/// Konfigurasi stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Jumlah lane (harus > 0).
    pub lane_count: usize,
    /// Allocator untuk block pool.
    pub allocator: AllocatorHandle,
    /// Aktifkan pengecekan item/byte count pada reader.
    pub validate: bool,
}

impl StreamConfig {
    pub fn new(lane_count: usize) -> Self {
        Self {
            lane_count,
            allocator: AllocatorHandle::HEAP,
            validate: cfg!(debug_assertions),
        }
    }

    pub fn with_allocator(mut self, allocator: AllocatorHandle) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LaneState {
    Empty,
    Writing,
    Written,
}

/// Record shared satu lane. Hanya di-update saat begin/end session.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LaneRange {
    pub(crate) state: LaneState,
    pub(crate) first_block: BlockId,
    pub(crate) item_count: usize,
    pub(crate) byte_count: usize,
}

impl LaneRange {
    const EMPTY: Self = Self {
        state: LaneState::Empty,
        first_block: NO_BLOCK,
        item_count: 0,
        byte_count: 0,
    };
}

/// Container N lane append-only.
///
/// Lane berbeda boleh ditulis/dibaca dari thread berbeda secara bersamaan.
/// Satu lane: tepat satu writer menyelesaikan session-nya dulu, baru reader.
pub struct BlockStream {
    pub(crate) lanes: Box<[Mutex<LaneRange>]>,
    pub(crate) pool: BlockPool,
    pub(crate) validate: bool,
}

impl BlockStream {
    /// Membuat stream dengan `lane_count` lane.
    pub fn new(lane_count: usize, allocator: AllocatorHandle) -> StreamResult<Self> {
        Self::with_config(StreamConfig::new(lane_count).with_allocator(allocator))
    }

    pub fn with_config(config: StreamConfig) -> StreamResult<Self> {
        if config.lane_count == 0 {
            return Err(usage_error(StreamError::InvalidLaneCount(config.lane_count)));
        }

        let lanes = (0..config.lane_count)
            .map(|_| Mutex::new(LaneRange::EMPTY))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(
            lanes = config.lane_count,
            allocator = %config.allocator,
            validate = config.validate,
            "created block stream"
        );

        Ok(Self {
            lanes,
            pool: BlockPool::new(config.allocator),
            validate: config.validate,
        })
    }

    /// Writer untuk semua lane.
    pub fn writer(&self) -> StreamWriter<'_> {
        StreamWriter::new(self, 0..self.lanes.len())
    }

    /// Writer yang hanya boleh menulis lane di dalam `partition`.
    pub fn partitioned_writer(&self, partition: Range<usize>) -> StreamResult<StreamWriter<'_>> {
        if partition.end > self.lanes.len() || partition.start > partition.end {
            return Err(usage_error(StreamError::InvalidPartition {
                start: partition.start,
                end: partition.end,
                lane_count: self.lanes.len(),
            }));
        }
        Ok(StreamWriter::new(self, partition))
    }

    pub fn reader(&self) -> StreamReader<'_> {
        StreamReader::new(self)
    }

    #[inline(always)]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Total item di semua lane yang sudah selesai ditulis.
    pub fn count(&self) -> usize {
        self.lanes
            .iter()
            .map(|lane| lane.lock())
            .filter(|lane| lane.state == LaneState::Written)
            .map(|lane| lane.item_count)
            .sum()
    }

    /// Jumlah item di satu lane (0 jika belum ditulis).
    pub fn lane_item_count(&self, lane: usize) -> StreamResult<usize> {
        let range = self.lane(lane)?;
        Ok(match range.state {
            LaneState::Written => range.item_count,
            _ => 0,
        })
    }

    /// Jumlah block yang sudah dialokasikan di semua lane.
    pub fn block_count(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Baca semua item (bertipe `T`) dari semua lane, urut per lane.
    pub fn to_vec<T: Element>(&self) -> StreamResult<Vec<T>> {
        let mut out = Vec::with_capacity(self.count());
        let mut reader = self.reader();
        for lane in 0..self.lanes.len() {
            let items = reader.begin_for_each_index(lane)?;
            for _ in 0..items {
                out.push(reader.read::<T>()?);
            }
            reader.end_for_each_index()?;
        }
        Ok(out)
    }

    /// Free semua block sekarang.
    pub fn dispose(self) {
        drop(self);
    }

    /// Bungkus disposal sebagai job untuk scheduler eksternal.
    ///
    /// Job dijalankan setelah semua producer/consumer selesai; isinya tetap
    /// walk-and-free yang sama dengan `dispose`.
    pub fn schedule_dispose(self) -> DisposeJob {
        DisposeJob { stream: self }
    }

    pub(crate) fn lane(&self, lane: usize) -> StreamResult<LaneRange> {
        self.lanes
            .get(lane)
            .map(|range| *range.lock())
            .ok_or_else(|| {
                usage_error(StreamError::LaneOutOfRange {
                    lane,
                    lane_count: self.lanes.len(),
                })
            })
    }
}

impl Drop for BlockStream {
    fn drop(&mut self) {
        tracing::debug!(
            lanes = self.lanes.len(),
            blocks = self.pool.len(),
            allocator = %self.pool.allocator(),
            "disposing block stream"
        );
    }
}

/// Disposal yang ditunda.
#[must_use = "the stream is only freed when the job runs or is dropped"]
pub struct DisposeJob {
    stream: BlockStream,
}

impl DisposeJob {
    pub fn run(self) {
        self.stream.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_lanes_rejected() {
        let err = BlockStream::new(0, AllocatorHandle::HEAP).err();
        assert_eq!(err, Some(StreamError::InvalidLaneCount(0)));
    }

    #[test]
    fn test_lane_isolation_any_write_order() {
        let stream = BlockStream::new(3, AllocatorHandle::HEAP).unwrap();
        let mut writer = stream.writer();

        // Tulis lane dengan urutan acak: 2, 0, 1
        for &lane in &[2usize, 0, 1] {
            writer.begin_for_each_index(lane).unwrap();
            for i in 0..5u32 {
                writer.write(lane as u32 * 100 + i).unwrap();
            }
            writer.end_for_each_index().unwrap();
        }

        let mut reader = stream.reader();
        for lane in 0..3 {
            assert_eq!(reader.begin_for_each_index(lane).unwrap(), 5);
            for i in 0..5u32 {
                assert_eq!(reader.read::<u32>().unwrap(), lane as u32 * 100 + i);
            }
            reader.end_for_each_index().unwrap();
        }

        assert_eq!(stream.count(), 15);
        assert_eq!(stream.to_vec::<u32>().unwrap()[..5], [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_lane_crossing_many_blocks() {
        let stream = BlockStream::new(1, AllocatorHandle::HEAP).unwrap();
        let mut writer = stream.writer();

        writer.begin_for_each_index(0).unwrap();
        for i in 0..10_000u64 {
            writer.write(i).unwrap();
        }
        writer.end_for_each_index().unwrap();

        // 10_000 * 8 bytes tidak muat di satu block
        assert!(stream.block_count() > 1);

        let values = stream.to_vec::<u64>().unwrap();
        assert_eq!(values.len(), 10_000);
        assert!(values.iter().enumerate().all(|(i, &v)| v == i as u64));
    }

    #[test]
    fn test_unwritten_lane_reads_empty() {
        let stream = BlockStream::new(2, AllocatorHandle::HEAP).unwrap();
        let mut reader = stream.reader();
        assert_eq!(reader.begin_for_each_index(1).unwrap(), 0);
        reader.end_for_each_index().unwrap();
        assert_eq!(stream.lane_item_count(1).unwrap(), 0);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_partition_out_of_range() {
        let stream = BlockStream::new(4, AllocatorHandle::HEAP).unwrap();
        assert!(stream.partitioned_writer(2..5).is_err());
        assert!(stream.partitioned_writer(1..3).is_ok());
    }

    #[test]
    fn test_reversed_partition_reports_bounds() {
        let stream = BlockStream::new(4, AllocatorHandle::HEAP).unwrap();
        #[allow(clippy::reversed_empty_ranges)]
        let err = stream.partitioned_writer(3..1).err();
        assert_eq!(
            err,
            Some(StreamError::InvalidPartition {
                start: 3,
                end: 1,
                lane_count: 4
            })
        );
        assert_eq!(
            stream.partitioned_writer(2..5).err(),
            Some(StreamError::InvalidPartition {
                start: 2,
                end: 5,
                lane_count: 4
            })
        );
    }

    #[test]
    fn test_mapped_allocator_stream() {
        let stream = BlockStream::new(2, AllocatorHandle::MAPPED).unwrap();
        let mut writer = stream.writer();
        writer.begin_for_each_index(1).unwrap();
        writer.write(7u16).unwrap();
        writer.end_for_each_index().unwrap();
        assert_eq!(stream.to_vec::<u16>().unwrap(), vec![7]);
    }

    #[test]
    fn test_scheduled_dispose() {
        let stream = BlockStream::new(1, AllocatorHandle::HEAP).unwrap();
        let mut writer = stream.writer();
        writer.begin_for_each_index(0).unwrap();
        writer.write(1u8).unwrap();
        writer.end_for_each_index().unwrap();
        drop(writer);

        let job = stream.schedule_dispose();
        std::thread::spawn(move || job.run()).join().unwrap();
    }
}
