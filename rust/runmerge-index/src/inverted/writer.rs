//! Bit-level posting list encoder.
//!
//! A posting list is written as a sequence of postings, with no length prefix
//! (the document frequency kept in the lexicon delimits it):
//!
//! ```text
//! posting: gamma(doc gap) | gamma(frequency) | gamma(field frequency + 1) * field_count
//!          | [gamma(block count + 1) | gamma(block gap) * block count]   (if blocks)
//! ```
//!
//! The first document gap of a list is `doc_id + 1`, later ones the difference
//! from the previous document. Block gaps follow the same scheme within a posting.

use runmerge_common::{Result, error::Error};
use runmerge_io::{BitWriter, SealingWrite};

use crate::{
    posting::{Posting, PostingLayout, PostingSource},
    statistics::Pointer,
};

use super::{DocOrder, PostingSink};

pub struct BitPostingWriter<W: SealingWrite> {
    bits: BitWriter<W>,
    layout: PostingLayout,
    closed: bool,
}

impl<W: SealingWrite> BitPostingWriter<W> {
    pub fn new(inner: W, layout: PostingLayout) -> BitPostingWriter<W> {
        BitPostingWriter {
            bits: BitWriter::new(inner),
            layout,
            closed: false,
        }
    }

    pub fn with_capacity(buffer_size: usize, inner: W, layout: PostingLayout) -> BitPostingWriter<W> {
        BitPostingWriter {
            bits: BitWriter::with_capacity(buffer_size, inner),
            layout,
            closed: false,
        }
    }

    pub fn layout(&self) -> PostingLayout {
        self.layout
    }

    pub fn into_inner(self) -> W {
        self.bits.into_inner()
    }

    fn write_posting(&mut self, posting: &Posting, prev_doc: Option<u32>) -> Result<()> {
        self.layout.check(posting)?;
        let gap = match prev_doc {
            Some(prev) => (posting.doc_id - prev) as u64,
            None => posting.doc_id as u64 + 1,
        };
        self.bits.write_gamma(gap)?;
        self.bits.write_gamma(posting.frequency as u64)?;
        for &f in &posting.field_frequencies {
            self.bits.write_gamma(f as u64 + 1)?;
        }
        if self.layout.blocks {
            self.bits.write_gamma(posting.blocks.len() as u64 + 1)?;
            let mut prev_block = None;
            for &block in &posting.blocks {
                let gap = match prev_block {
                    Some(prev) => (block - prev) as u64,
                    None => block as u64 + 1,
                };
                self.bits.write_gamma(gap)?;
                prev_block = Some(block);
            }
        }
        Ok(())
    }
}

impl<W: SealingWrite> PostingSink for BitPostingWriter<W> {
    fn write_postings(&mut self, postings: &mut dyn PostingSource) -> Result<Pointer> {
        if self.closed {
            return Err(Error::invalid_operation("write to a closed posting writer"));
        }
        let pointer = Pointer::from(self.bits.position());
        let mut order = DocOrder::default();
        let mut prev_doc = None;
        while let Some(posting) = postings.next_posting()? {
            order.check_next(posting.doc_id)?;
            self.write_posting(&posting, prev_doc)?;
            prev_doc = Some(posting.doc_id);
        }
        Ok(pointer)
    }

    fn position(&self) -> Pointer {
        self.bits.position().into()
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.bits.seal()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::posting::SlicePostings;

    use super::*;

    #[test]
    fn test_pointer_tracks_bit_position() {
        let mut out = Vec::new();
        let mut writer = BitPostingWriter::new(&mut out, PostingLayout::basic());
        assert_eq!(writer.position(), Pointer::new(0, 0));

        // doc 0 -> gamma(1) = "1", freq 1 -> gamma(1) = "1"
        let first = [Posting::new(0, 1)];
        let p0 = writer
            .write_postings(&mut SlicePostings::new(&first))
            .unwrap();
        assert_eq!(p0, Pointer::new(0, 0));
        assert_eq!(writer.position(), Pointer::new(0, 2));

        let second = [Posting::new(2, 1), Posting::new(3, 2)];
        let p1 = writer
            .write_postings(&mut SlicePostings::new(&second))
            .unwrap();
        assert_eq!(p1, Pointer::new(0, 2));
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(
            writer
                .write_postings(&mut SlicePostings::new(&first))
                .is_err()
        );
        drop(writer);
        // "11", then gap gamma(3)="011" freq "1", gap "1" freq gamma(2)="010", padded
        assert_eq!(out, [0b1101_1110, 0b1000_0000]);
    }

    #[test]
    fn test_rejects_unordered_documents() {
        let mut out = Vec::new();
        let mut writer = BitPostingWriter::new(&mut out, PostingLayout::basic());
        let postings = [Posting::new(5, 1), Posting::new(5, 1)];
        let err = writer
            .write_postings(&mut SlicePostings::new(&postings))
            .unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_rejects_postings_not_matching_layout() {
        let mut out = Vec::new();
        let mut writer = BitPostingWriter::new(&mut out, PostingLayout::with_fields(2));
        let postings = [Posting::new(5, 1)];
        assert!(
            writer
                .write_postings(&mut SlicePostings::new(&postings))
                .is_err()
        );
    }
}
