//! Bit-granular output stream.
//!
//! Bits are packed most-significant first within each byte. Complete bytes are
//! accumulated in a staging buffer and handed to the underlying [`SealingWrite`]
//! once the buffer fills up, so the writer can report its exact [`BitPosition`]
//! at any time without flushing.

use runmerge_common::{Result, error::Error, verify_arg};

use crate::{BitPosition, SealingWrite};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

pub struct BitWriter<W: SealingWrite> {
    inner: W,
    /// Complete bytes not yet handed to `inner`.
    buf: Vec<u8>,
    buffer_size: usize,
    /// Number of bytes already written to `inner`.
    flushed: u64,
    /// Partially filled byte, bits are taken from the top.
    current: u8,
    /// Number of valid bits in `current` (0..8).
    used_bits: u8,
    sealed: bool,
}

impl<W: SealingWrite> BitWriter<W> {
    pub fn new(inner: W) -> BitWriter<W> {
        BitWriter::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    pub fn with_capacity(buffer_size: usize, inner: W) -> BitWriter<W> {
        let buffer_size = buffer_size.max(1);
        BitWriter {
            inner,
            buf: Vec::with_capacity(buffer_size),
            buffer_size,
            flushed: 0,
            current: 0,
            used_bits: 0,
            sealed: false,
        }
    }

    /// The position at which the next bit will be written.
    pub fn position(&self) -> BitPosition {
        BitPosition {
            byte: self.flushed + self.buf.len() as u64,
            bit: self.used_bits,
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.check_not_sealed()?;
        if bit {
            self.current |= 0x80 >> self.used_bits;
        }
        self.used_bits += 1;
        if self.used_bits == 8 {
            self.push_current()?;
        }
        Ok(())
    }

    /// Writes the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<()> {
        verify_arg!(count, count <= 64);
        for i in (0..count).rev() {
            self.write_bit((value >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// Unary code of `value >= 1`: `value - 1` zero bits followed by a one bit.
    pub fn write_unary(&mut self, value: u64) -> Result<()> {
        verify_arg!(value, value >= 1);
        for _ in 1..value {
            self.write_bit(false)?;
        }
        self.write_bit(true)
    }

    /// Elias-gamma code of `value >= 1`: the bit length in unary, followed by the
    /// value without its leading one bit.
    pub fn write_gamma(&mut self, value: u64) -> Result<()> {
        verify_arg!(value, value >= 1);
        let len = 64 - value.leading_zeros();
        self.write_unary(len as u64)?;
        self.write_bits(value, len - 1)
    }

    /// Pads the current byte with zero bits, if it is partially filled.
    pub fn pad_to_byte(&mut self) -> Result<()> {
        self.check_not_sealed()?;
        if self.used_bits != 0 {
            self.push_current()?;
        }
        Ok(())
    }

    /// Pads the last byte, flushes the staging buffer and seals the underlying writer.
    pub fn seal(&mut self) -> Result<()> {
        self.pad_to_byte()?;
        self.flush_buffer()?;
        self.sealed = true;
        self.inner
            .seal()
            .map_err(|e| Error::io("sealing bit stream", e))
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn push_current(&mut self) -> Result<()> {
        self.buf.push(self.current);
        self.current = 0;
        self.used_bits = 0;
        if self.buf.len() >= self.buffer_size {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.inner
            .write_all(&self.buf)
            .map_err(|e| Error::io("writing bit stream", e))?;
        self.flushed += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }

    fn check_not_sealed(&self) -> Result<()> {
        if self.sealed {
            Err(Error::invalid_operation("write to sealed bit stream"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::BitPosition;

    use super::BitWriter;

    #[test]
    fn test_bits_are_packed_msb_first() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0b101, 3).unwrap();
        assert_eq!(writer.position(), BitPosition::new(0, 3));
        writer.write_bits(0b11111, 5).unwrap();
        assert_eq!(writer.position(), BitPosition::new(1, 0));
        writer.write_bit(true).unwrap();
        writer.seal().unwrap();
        assert_eq!(out, [0b1011_1111, 0b1000_0000]);
    }

    #[test]
    fn test_unary_and_gamma() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        // unary(3) = 001, gamma(5) = 001 01
        writer.write_unary(3).unwrap();
        writer.write_gamma(5).unwrap();
        assert_eq!(writer.position().as_bits(), 8);
        writer.write_gamma(1).unwrap();
        writer.seal().unwrap();
        assert_eq!(out, [0b0010_0101, 0b1000_0000]);
    }

    #[test]
    fn test_zero_is_not_encodable() {
        let mut writer = BitWriter::new(Vec::new());
        assert!(writer.write_gamma(0).is_err());
        assert!(writer.write_unary(0).is_err());
        assert!(writer.write_bits(0, 65).is_err());
    }

    #[test]
    fn test_small_staging_buffer_keeps_positions() {
        let mut out = Vec::new();
        let mut writer = BitWriter::with_capacity(2, &mut out);
        for i in 0..40u64 {
            writer.write_bits(i, 8).unwrap();
        }
        assert_eq!(writer.position(), BitPosition::new(40, 0));
        writer.write_bit(true).unwrap();
        assert_eq!(writer.position(), BitPosition::new(40, 1));
        writer.seal().unwrap();
        assert!(writer.write_bit(true).is_err());
        drop(writer);
        assert_eq!(out.len(), 41);
        assert_eq!(out[39], 39);
    }
}
