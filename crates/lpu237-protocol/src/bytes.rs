//! Sequential little-endian readers and writers for fixed-layout records.

use crate::error::{ProtocolError, ProtocolResult};

pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn read_bytes(&mut self, count: usize) -> ProtocolResult<&'a [u8]> {
        let end = self.position.saturating_add(count);
        let Some(data) = self.buffer.get(self.position..end) else {
            return Err(ProtocolError::RecordTooShort {
                expected: end,
                actual: self.buffer.len(),
            });
        };
        self.position = end;
        Ok(data)
    }

    pub fn read_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    pub fn read_u32_le(&mut self) -> ProtocolResult<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn skip(&mut self, count: usize) -> ProtocolResult<()> {
        self.read_bytes(count).map(|_| ())
    }
}

#[derive(Debug, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Writes `data` into a fixed-width slot, zero padding or cutting it to
    /// exactly `width` bytes.
    pub fn write_fixed(&mut self, data: &[u8], width: usize) -> &mut Self {
        let start = self.buffer.len();
        self.buffer.extend(data.iter().copied().take(width));
        self.buffer.resize(start.saturating_add(width), 0);
        self
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sequence() {
        let data = [0x01, 0x78, 0x56, 0x34, 0x12, 0xAA, 0xBB];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8().expect("u8"), 0x01);
        assert_eq!(reader.read_u32_le().expect("u32"), 0x1234_5678);
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.read_bytes(2).expect("bytes"), &[0xAA, 0xBB]);
        assert_eq!(reader.position(), 7);
    }

    #[test]
    fn test_reader_reports_shortfall() {
        let data = [0u8; 3];
        let mut reader = ByteReader::new(&data);
        let err = reader.read_u32_le().expect_err("needs four bytes");
        assert_eq!(
            err,
            ProtocolError::RecordTooShort {
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_writer_fixed_pads_and_cuts() {
        let mut writer = ByteWriter::default();
        writer
            .write_fixed(b"ab", 4)
            .write_fixed(b"xyz", 2)
            .write_u32_le(953);
        assert_eq!(
            writer.into_inner(),
            vec![b'a', b'b', 0, 0, b'x', b'y', 0xB9, 0x03, 0, 0]
        );
    }
}
