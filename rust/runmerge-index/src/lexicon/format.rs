//! Lexicon file format (little-endian):
//!
//! ```text
//! header:  magic u32 | version u16 | field_count u16 | flags u16
//! entry:   TAG_ENTRY u8 | term_len u16 | term bytes | term_id u32
//!          | document_frequency u32 | frequency u64 | field_frequency u64 * field_count
//!          | byte_offset u64 | bit_offset u8
//! trailer: TAG_TRAILER u8 | entry_count u64
//! ```

pub(super) const LEXICON_MAGIC: u32 = 0x4e58_4c52;
pub(super) const LEXICON_VERSION: u16 = 1;

pub(super) const FLAG_BLOCKS: u16 = 0x1;

pub(super) const TAG_ENTRY: u8 = 1;
pub(super) const TAG_TRAILER: u8 = 0xff;
