//! Chunked transfer of the system record.
//!
//! The record is larger than one report can carry, so reads go out in
//! slices of at most [`READ_CHUNK`] bytes and writes in slices of at most
//! [`WRITE_CHUNK`] bytes. Read slices must come back in request order.

use crate::error::{ProtocolError, ProtocolResult};
use crate::memory::{Location, RECORD_BASE, RECORD_SIZE};
use crate::record::SystemRecord;
use tracing::{debug, info};

/// Largest slice one get-response can carry.
pub const READ_CHUNK: usize = 217;
/// Largest slice that fits a set-request next to its offset/size header.
pub const WRITE_CHUNK: usize = 53;

fn split(chunk: usize) -> Vec<Location> {
    let mut out = Vec::with_capacity(RECORD_SIZE.div_ceil(chunk));
    let mut start = 0usize;
    while start < RECORD_SIZE {
        let len = chunk.min(RECORD_SIZE.saturating_sub(start));
        let (Ok(offset), Ok(size)) = (u32::try_from(start), u8::try_from(len)) else {
            break;
        };
        out.push(Location::new(RECORD_BASE.saturating_add(offset), size));
        start = start.saturating_add(len);
    }
    out
}

/// Slices of a full record read, in request order.
pub fn read_chunks() -> Vec<Location> {
    split(READ_CHUNK)
}

/// Slices of a full record write, in request order.
pub fn write_chunks() -> Vec<Location> {
    split(WRITE_CHUNK)
}

/// Bytes of `image` covered by `chunk`.
pub fn chunk_bytes(image: &[u8], chunk: Location) -> Option<&[u8]> {
    let start = usize::try_from(chunk.offset.checked_sub(RECORD_BASE)?).ok()?;
    image.get(start..start.checked_add(chunk.len())?)
}

/// Reassembles read slices into a record.
#[derive(Debug, Default, Clone)]
pub struct RecordAssembler {
    buffer: Vec<u8>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends one slice. Returns the decoded record once the last slice is
    /// in, `None` while more are expected. Out-of-order or wrongly sized
    /// slices reset the assembler.
    pub fn push(&mut self, chunk: Location, data: &[u8]) -> ProtocolResult<Option<SystemRecord>> {
        let expected = u32::try_from(self.buffer.len())
            .unwrap_or(u32::MAX)
            .saturating_add(RECORD_BASE);
        if chunk.offset != expected {
            self.reset();
            return Err(ProtocolError::ChunkOutOfOrder {
                expected,
                actual: chunk.offset,
            });
        }
        if data.len() != chunk.len() {
            self.reset();
            return Err(ProtocolError::SizeMismatch {
                declared: u32::from(chunk.size),
                actual: data.len(),
            });
        }
        self.buffer.extend_from_slice(data);
        debug!(
            "record chunk at {} ({} bytes), {}/{} assembled",
            chunk.offset,
            data.len(),
            self.buffer.len(),
            RECORD_SIZE
        );
        if self.buffer.len() < RECORD_SIZE {
            return Ok(None);
        }
        let image = std::mem::take(&mut self.buffer);
        let record = SystemRecord::from_bytes(&image)?;
        info!("system record reassembled ({} bytes)", image.len());
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_counts() {
        let reads = read_chunks();
        assert_eq!(reads.len(), 5);
        assert_eq!(reads[4], Location::new(868, 85));
        let writes = write_chunks();
        assert_eq!(writes.len(), 18);
        assert_eq!(writes[17], Location::new(901, 52));
        let total: usize = writes.iter().map(Location::len).sum();
        assert_eq!(total, RECORD_SIZE);
    }

    #[test]
    fn test_in_order_reassembly() {
        let record = SystemRecord::factory_default();
        let image = record.to_bytes();
        let mut assembler = RecordAssembler::new();
        let chunks = read_chunks();
        let (last, head) = chunks.split_last().expect("five chunks");
        for chunk in head {
            let data = chunk_bytes(&image, *chunk).expect("in range");
            assert_eq!(assembler.push(*chunk, data), Ok(None));
        }
        let data = chunk_bytes(&image, *last).expect("in range");
        let decoded = assembler.push(*last, data).expect("valid image");
        assert_eq!(decoded, Some(record));
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let image = SystemRecord::factory_default().to_bytes();
        let chunks = read_chunks();
        let mut assembler = RecordAssembler::new();
        let second = chunks[1];
        let err = assembler
            .push(second, chunk_bytes(&image, second).expect("in range"))
            .expect_err("second slice first");
        assert_eq!(
            err,
            ProtocolError::ChunkOutOfOrder {
                expected: 0,
                actual: 217
            }
        );
    }

    #[test]
    fn test_short_slice_rejected() {
        let chunks = read_chunks();
        let mut assembler = RecordAssembler::new();
        assert!(assembler.push(chunks[0], &[0u8; 10]).is_err());
        assert_eq!(assembler.len(), 0);
    }
}
