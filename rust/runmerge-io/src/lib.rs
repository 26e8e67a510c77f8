//! I/O abstractions for the merge output:
//! - `SealingWrite`: sequential writer with a `seal()` operation, committing the write activity.
//! - `BitWriter` / `BitReader`: bit-granular streams addressed by [`BitPosition`].
//!
//! Provides a couple of simple `SealingWrite` implementations: memory-based and file-based.

use std::fmt;

pub mod bit_reader;
pub mod bit_writer;
pub mod file;
pub mod memory;

pub use bit_reader::BitReader;
pub use bit_writer::BitWriter;
pub use file::FileWriter;

/// A trait for sequential writing with explicit sealing semantics.
///
/// Unlike [`std::io::Write`], the writer must be sealed to ensure that buffered data
/// is flushed and committed to the underlying storage. Writes after sealing fail.
///
/// Implementations must be [`Send`] so that a writer can be handed to the thread
/// driving a merge, but exclusive access through `&mut self` is assumed.
pub trait SealingWrite: Send {
    /// Appends the entire buffer to the underlying storage.
    ///
    /// Either all bytes are written or an error is returned.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes any buffered data and commits the written content.
    ///
    /// Once sealed, the writer should not accept any further write operations.
    fn seal(&mut self) -> std::io::Result<()>;
}

impl<W> SealingWrite for &mut W
where
    W: SealingWrite + ?Sized,
{
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        (**self).write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        (**self).seal()
    }
}

impl<W> SealingWrite for Box<W>
where
    W: SealingWrite + ?Sized,
{
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        (**self).write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        (**self).seal()
    }
}

/// A location in a bit-granular stream: a byte offset plus the number of bits
/// (0..8) already consumed within that byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BitPosition {
    pub byte: u64,
    pub bit: u8,
}

impl BitPosition {
    pub fn new(byte: u64, bit: u8) -> BitPosition {
        assert!(bit < 8, "bit offset {bit} out of range");
        BitPosition { byte, bit }
    }

    /// Total number of bits preceding this position.
    pub fn as_bits(&self) -> u64 {
        self.byte * 8 + self.bit as u64
    }

    pub fn from_bits(bits: u64) -> BitPosition {
        BitPosition {
            byte: bits / 8,
            bit: (bits % 8) as u8,
        }
    }
}

impl fmt::Display for BitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.byte, self.bit)
    }
}
