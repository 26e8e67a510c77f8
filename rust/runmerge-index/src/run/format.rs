//! On-disk run format.
//!
//! All integers are little-endian.
//!
//! ```text
//! header:  magic u32 | version u16 | field_count u16 | flags u16 | run_index u32
//!          | term_count u32 | first_doc u32 | last_doc u32 | posting_count u64
//! term:    term_len u16 | term bytes | document_frequency u32 | frequency u64
//!          | field_frequency u64 * field_count | postings_len u64 | postings
//! posting: doc_id u32 | frequency u32 | field_frequency u32 * field_count
//!          | [block_count u32 | block u32 * block_count]   (if FLAG_BLOCKS)
//! ```
//!
//! `postings_len` is the byte length of the term's postings, which lets a reader
//! skip the postings it did not consume.

use std::io::Read;

use runmerge_common::{Result, error::Error, verify_data};

use crate::{
    codec::{put_u16, put_u32, put_u64, read_u16, read_u32, read_u64},
    posting::{Posting, PostingLayout},
    statistics::TermStatistics,
};

use super::RunTermEntry;

pub const RUN_MAGIC: u32 = 0x4e52_4d52;
pub const RUN_VERSION: u16 = 1;
pub const FLAG_BLOCKS: u16 = 0x1;

/// Longest term (in bytes) a run can store.
pub const MAX_TERM_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHeader {
    pub run_index: u32,
    pub layout: PostingLayout,
    pub term_count: u32,
    /// Smallest document id in the run, zero for an empty run.
    pub first_doc: u32,
    /// Largest document id in the run, zero for an empty run.
    pub last_doc: u32,
    pub posting_count: u64,
}

impl RunHeader {
    pub fn is_empty(&self) -> bool {
        self.term_count == 0
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        put_u32(buf, RUN_MAGIC);
        put_u16(buf, RUN_VERSION);
        put_u16(buf, self.layout.field_count);
        put_u16(buf, if self.layout.blocks { FLAG_BLOCKS } else { 0 });
        put_u32(buf, self.run_index);
        put_u32(buf, self.term_count);
        put_u32(buf, self.first_doc);
        put_u32(buf, self.last_doc);
        put_u64(buf, self.posting_count);
    }

    pub fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<RunHeader> {
        let magic = read_u32(reader)?;
        verify_data!(magic, magic == RUN_MAGIC);
        let version = read_u16(reader)?;
        if version != RUN_VERSION {
            return Err(Error::invalid_format(
                "run header",
                format!("unsupported version {version}"),
            ));
        }
        let field_count = read_u16(reader)?;
        let flags = read_u16(reader)?;
        verify_data!(flags, flags & !FLAG_BLOCKS == 0);
        let header = RunHeader {
            layout: PostingLayout {
                field_count,
                blocks: flags & FLAG_BLOCKS != 0,
            },
            run_index: read_u32(reader)?,
            term_count: read_u32(reader)?,
            first_doc: read_u32(reader)?,
            last_doc: read_u32(reader)?,
            posting_count: read_u64(reader)?,
        };
        verify_data!(header, header.first_doc <= header.last_doc);
        Ok(header)
    }
}

pub(crate) fn encode_term(buf: &mut Vec<u8>, layout: PostingLayout, entry: &RunTermEntry) {
    put_u16(buf, entry.term.len() as u16);
    buf.extend_from_slice(&entry.term);
    encode_statistics(buf, &entry.statistics);

    let len_pos = buf.len();
    put_u64(buf, 0);
    let start = buf.len();
    for posting in &entry.postings {
        encode_posting(buf, layout, posting);
    }
    let postings_len = (buf.len() - start) as u64;
    buf[len_pos..len_pos + 8].copy_from_slice(&postings_len.to_le_bytes());
}

fn encode_statistics(buf: &mut Vec<u8>, statistics: &TermStatistics) {
    put_u32(buf, statistics.document_frequency);
    put_u64(buf, statistics.frequency);
    for &f in &statistics.field_frequencies {
        put_u64(buf, f);
    }
}

fn encode_posting(buf: &mut Vec<u8>, layout: PostingLayout, posting: &Posting) {
    put_u32(buf, posting.doc_id);
    put_u32(buf, posting.frequency);
    for &f in &posting.field_frequencies {
        put_u32(buf, f);
    }
    if layout.blocks {
        put_u32(buf, posting.blocks.len() as u32);
        for &block in &posting.blocks {
            put_u32(buf, block);
        }
    }
}

/// Reads a term entry header into `term`, returning its statistics and the byte
/// length of its postings.
pub(crate) fn decode_term_header<R: Read + ?Sized>(
    reader: &mut R,
    layout: PostingLayout,
    term: &mut Vec<u8>,
) -> Result<(TermStatistics, u64)> {
    let term_len = read_u16(reader)? as usize;
    term.resize(term_len, 0);
    reader.read_exact(term)?;

    let document_frequency = read_u32(reader)?;
    let frequency = read_u64(reader)?;
    let field_frequencies = (0..layout.field_count)
        .map(|_| read_u64(reader))
        .collect::<std::io::Result<Vec<_>>>()?;
    let postings_len = read_u64(reader)?;
    verify_data!(document_frequency, document_frequency != 0);
    Ok((
        TermStatistics {
            document_frequency,
            frequency,
            field_frequencies,
            term_id: None,
            pointer: None,
        },
        postings_len,
    ))
}

/// Decodes one posting, returning it along with its encoded size in bytes.
pub(crate) fn decode_posting<R: Read + ?Sized>(
    reader: &mut R,
    layout: PostingLayout,
) -> Result<(Posting, u64)> {
    let doc_id = read_u32(reader)?;
    let frequency = read_u32(reader)?;
    let field_frequencies = (0..layout.field_count)
        .map(|_| read_u32(reader))
        .collect::<std::io::Result<Vec<_>>>()?;
    let mut size = 8 + 4 * layout.field_count as u64;
    let blocks = if layout.blocks {
        let count = read_u32(reader)?;
        size += 4 + 4 * count as u64;
        (0..count)
            .map(|_| read_u32(reader))
            .collect::<std::io::Result<Vec<_>>>()?
    } else {
        Vec::new()
    };
    Ok((
        Posting {
            doc_id,
            frequency,
            field_frequencies,
            blocks,
        },
        size,
    ))
}
