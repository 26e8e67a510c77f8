//! Bit-granular input over an in-memory byte slice, the counterpart of
//! [`BitWriter`](crate::BitWriter).

use runmerge_common::{Result, error::Error, verify_arg};

use crate::BitPosition;

pub struct BitReader<'a> {
    data: &'a [u8],
    byte: usize,
    bit: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            byte: 0,
            bit: 0,
        }
    }

    /// Creates a reader positioned at `start`.
    pub fn at(data: &'a [u8], start: BitPosition) -> Result<BitReader<'a>> {
        verify_arg!(start, start.bit < 8);
        verify_arg!(start, start.byte <= data.len() as u64);
        Ok(BitReader {
            data,
            byte: start.byte as usize,
            bit: start.bit,
        })
    }

    pub fn position(&self) -> BitPosition {
        BitPosition {
            byte: self.byte as u64,
            bit: self.bit,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        let Some(&b) = self.data.get(self.byte) else {
            return Err(Error::invalid_format(
                "bit stream",
                format!("unexpected end of data at byte {}", self.byte),
            ));
        };
        let value = (b << self.bit) & 0x80 != 0;
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
        }
        Ok(value)
    }

    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        verify_arg!(count, count <= 64);
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    pub fn read_unary(&mut self) -> Result<u64> {
        let mut value = 1;
        while !self.read_bit()? {
            value += 1;
        }
        Ok(value)
    }

    pub fn read_gamma(&mut self) -> Result<u64> {
        let len = self.read_unary()?;
        if len > 64 {
            return Err(Error::invalid_format(
                "bit stream",
                format!("gamma code length {len} exceeds 64 bits"),
            ));
        }
        let rest = self.read_bits(len as u32 - 1)?;
        Ok((1u64 << (len - 1)) | rest)
    }
}
