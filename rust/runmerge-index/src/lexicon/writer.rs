use runmerge_common::{Result, ensure_invariant, error::Error};
use runmerge_io::SealingWrite;

use crate::{
    codec::{put_u16, put_u32, put_u64},
    posting::PostingLayout,
    run::MAX_TERM_LEN,
    statistics::TermStatistics,
};

use super::{
    DictionaryWriter,
    format::{FLAG_BLOCKS, LEXICON_MAGIC, LEXICON_VERSION, TAG_ENTRY, TAG_TRAILER},
};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Serializes lexicon entries.
///
/// Entries must arrive with strictly increasing terms and contiguous term ids
/// starting at zero, each carrying the pointer of its posting list.
pub struct LexiconWriter<W: SealingWrite> {
    inner: W,
    buf: Vec<u8>,
    buffer_size: usize,
    field_count: u16,
    last_term: Option<Vec<u8>>,
    entry_count: u64,
    finished: bool,
}

impl<W: SealingWrite> LexiconWriter<W> {
    /// Creates a writer for the lexicon of an index with the given posting layout.
    pub fn new(inner: W, layout: PostingLayout) -> LexiconWriter<W> {
        LexiconWriter::with_capacity(DEFAULT_BUFFER_SIZE, inner, layout)
    }

    pub fn with_capacity(buffer_size: usize, inner: W, layout: PostingLayout) -> LexiconWriter<W> {
        let mut buf = Vec::with_capacity(buffer_size);
        put_u32(&mut buf, LEXICON_MAGIC);
        put_u16(&mut buf, LEXICON_VERSION);
        put_u16(&mut buf, layout.field_count);
        put_u16(&mut buf, if layout.blocks { FLAG_BLOCKS } else { 0 });
        LexiconWriter {
            inner,
            buf,
            buffer_size: buffer_size.max(1),
            field_count: layout.field_count,
            last_term: None,
            entry_count: 0,
            finished: false,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Writes the trailer and seals the underlying writer. Returns the number of
    /// entries written.
    pub fn finish(&mut self) -> Result<u64> {
        if self.finished {
            return Err(Error::invalid_operation("finish on a finished lexicon writer"));
        }
        self.finished = true;
        self.buf.push(TAG_TRAILER);
        put_u64(&mut self.buf, self.entry_count);
        self.flush()?;
        self.inner
            .seal()
            .map_err(|e| Error::io("sealing lexicon", e))?;
        Ok(self.entry_count)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn flush(&mut self) -> Result<()> {
        self.inner
            .write_all(&self.buf)
            .map_err(|e| Error::io("writing lexicon", e))?;
        self.buf.clear();
        Ok(())
    }
}

impl<W: SealingWrite> DictionaryWriter for LexiconWriter<W> {
    fn write_entry(&mut self, term: &[u8], statistics: &TermStatistics) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_operation("write to a finished lexicon writer"));
        }
        if term.len() > MAX_TERM_LEN {
            return Err(Error::invalid_arg(
                "term",
                format!("{} bytes exceeds the {MAX_TERM_LEN} byte limit", term.len()),
            ));
        }
        if statistics.field_frequencies.len() != self.field_count as usize {
            return Err(Error::invalid_arg(
                "statistics",
                format!(
                    "{} field frequencies, lexicon has {} fields",
                    statistics.field_frequencies.len(),
                    self.field_count
                ),
            ));
        }
        let (Some(term_id), Some(pointer)) = (statistics.term_id, statistics.pointer) else {
            return Err(Error::invalid_arg(
                "statistics",
                format!("'{}' has no term id or pointer", term.escape_ascii()),
            ));
        };
        if let Some(last) = &self.last_term {
            ensure_invariant!(
                term > last.as_slice(),
                "lexicon term '{}' does not follow '{}'",
                term.escape_ascii(),
                last.escape_ascii()
            );
        }
        ensure_invariant!(
            term_id as u64 == self.entry_count,
            "term id {term_id} of '{}' breaks the sequence at {}",
            term.escape_ascii(),
            self.entry_count
        );

        self.buf.push(TAG_ENTRY);
        put_u16(&mut self.buf, term.len() as u16);
        self.buf.extend_from_slice(term);
        put_u32(&mut self.buf, term_id);
        put_u32(&mut self.buf, statistics.document_frequency);
        put_u64(&mut self.buf, statistics.frequency);
        for &f in &statistics.field_frequencies {
            put_u64(&mut self.buf, f);
        }
        put_u64(&mut self.buf, pointer.byte_offset);
        self.buf.push(pointer.bit_offset);

        match &mut self.last_term {
            Some(last) => {
                last.clear();
                last.extend_from_slice(term);
            }
            None => self.last_term = Some(term.to_vec()),
        }
        self.entry_count += 1;
        if self.buf.len() >= self.buffer_size {
            self.flush()?;
        }
        Ok(())
    }
}
