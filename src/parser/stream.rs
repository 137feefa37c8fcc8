use crate::error::{DzgError, FileType, Result};

/// Little-endian reader over an in-memory DZT file
pub struct DztDataStream<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> DztDataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.pos + N <= self.end {
            let mut bytes = [0u8; N];
            bytes.copy_from_slice(&self.data[self.pos..self.pos + N]);
            self.pos += N;
            Ok(bytes)
        } else {
            Err(DzgError::format(
                FileType::Dzt,
                format!("unexpected end of file reading {} bytes at offset {}", N, self.pos),
            ))
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take::<4>()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take::<4>()?))
    }

    /// Read one amplitude sample of the given width.
    /// 8- and 16-bit samples are unsigned, 32-bit samples are signed.
    pub fn read_sample(&mut self, bits: u16) -> Result<i32> {
        match bits {
            8 => Ok(self.read_byte()? as i32),
            16 => Ok(self.read_u16()? as i32),
            32 => self.read_i32(),
            _ => Err(DzgError::format(
                FileType::Dzt,
                format!("unsupported sample width of {} bits", bits),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let data = [0x34, 0x12, 0xff, 0xff, 0x01, 0x00, 0x00, 0x80, 0x07];
        let mut stream = DztDataStream::new(&data);
        assert_eq!(stream.read_u16().unwrap(), 0x1234);
        assert_eq!(stream.read_sample(16).unwrap(), 0xffff);
        assert_eq!(stream.read_i32().unwrap(), i32::MIN + 1);
        assert_eq!(stream.read_sample(8).unwrap(), 7);
        assert_eq!(stream.remaining(), 0);
        assert!(stream.read_byte().is_err());
    }

    #[test]
    fn test_set_position_and_remaining() {
        let data = [0u8; 10];
        let mut stream = DztDataStream::new(&data);
        stream.set_position(6);
        assert_eq!(stream.remaining(), 4);
        assert!(stream.read_f32().is_ok());
        assert!(stream.read_sample(16).is_err());
        assert!(stream.read_sample(12).is_err());
    }
}
