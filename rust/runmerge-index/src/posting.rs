//! Posting records and the lazy, single-pass sequences that carry them from the
//! runs to the output sink.

use std::collections::VecDeque;

use runmerge_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

/// A single posting: one document containing the term.
///
/// Postings are ordered by `doc_id` within a posting list. `field_frequencies` is
/// populated only for field-aware layouts (one entry per field), and `blocks`
/// holds the strictly increasing block (position) ids when the layout records them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: u32,
    /// Number of occurrences of the term in the document. Always at least one.
    pub frequency: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_frequencies: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: u32, frequency: u32) -> Posting {
        Posting {
            doc_id,
            frequency,
            field_frequencies: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn with_field_frequencies(mut self, field_frequencies: Vec<u32>) -> Posting {
        self.field_frequencies = field_frequencies;
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<u32>) -> Posting {
        self.blocks = blocks;
        self
    }
}

/// Structural flags shared by every run of a build and by the merged output:
/// whether postings carry per-field frequencies and block ids.
///
/// A merge carries the layout through unchanged; runs with different layouts
/// cannot be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PostingLayout {
    pub field_count: u16,
    pub blocks: bool,
}

impl PostingLayout {
    pub fn basic() -> PostingLayout {
        PostingLayout::default()
    }

    pub fn with_fields(field_count: u16) -> PostingLayout {
        PostingLayout {
            field_count,
            blocks: false,
        }
    }

    pub fn with_blocks(mut self) -> PostingLayout {
        self.blocks = true;
        self
    }

    pub fn has_fields(&self) -> bool {
        self.field_count != 0
    }

    /// Validates that `posting` is well-formed for this layout.
    pub fn check(&self, posting: &Posting) -> Result<()> {
        if posting.frequency == 0 {
            return Err(Error::invalid_arg(
                "posting",
                format!("zero frequency for document {}", posting.doc_id),
            ));
        }
        if posting.field_frequencies.len() != self.field_count as usize {
            return Err(Error::invalid_arg(
                "posting",
                format!(
                    "document {} has {} field frequencies, layout expects {}",
                    posting.doc_id,
                    posting.field_frequencies.len(),
                    self.field_count
                ),
            ));
        }
        if !self.blocks && !posting.blocks.is_empty() {
            return Err(Error::invalid_arg(
                "posting",
                format!("document {} has blocks in a block-less layout", posting.doc_id),
            ));
        }
        if posting.blocks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_arg(
                "posting",
                format!("document {} has unordered blocks", posting.doc_id),
            ));
        }
        Ok(())
    }
}

/// A lazy, forward-only, non-restartable source of postings.
pub trait PostingSource {
    /// Returns the next posting, or `None` once the source is exhausted.
    fn next_posting(&mut self) -> Result<Option<Posting>>;
}

impl<S> PostingSource for &mut S
where
    S: PostingSource + ?Sized,
{
    fn next_posting(&mut self) -> Result<Option<Posting>> {
        (**self).next_posting()
    }
}

impl<S> PostingSource for Box<S>
where
    S: PostingSource + ?Sized,
{
    fn next_posting(&mut self) -> Result<Option<Posting>> {
        (**self).next_posting()
    }
}

/// Posting source over an in-memory slice.
pub struct SlicePostings<'a> {
    iter: std::slice::Iter<'a, Posting>,
}

impl<'a> SlicePostings<'a> {
    pub fn new(postings: &'a [Posting]) -> SlicePostings<'a> {
        SlicePostings {
            iter: postings.iter(),
        }
    }
}

impl PostingSource for SlicePostings<'_> {
    fn next_posting(&mut self) -> Result<Option<Posting>> {
        Ok(self.iter.next().cloned())
    }
}

/// The unified posting list of one merged term.
///
/// A term found in a single run passes that run's postings through directly.
/// A term shared by several runs is the concatenation of their postings in
/// ascending run order; since runs cover ascending, non-overlapping document
/// ranges, the concatenation is already ordered by document id.
pub enum PostingSequence<'a> {
    Direct(Box<dyn PostingSource + 'a>),
    Concatenated(VecDeque<Box<dyn PostingSource + 'a>>),
}

impl<'a> PostingSequence<'a> {
    /// Builds the sequence for the given per-run sources, in the order given.
    pub fn from_sources(mut sources: Vec<Box<dyn PostingSource + 'a>>) -> PostingSequence<'a> {
        if sources.len() == 1 {
            if let Some(source) = sources.pop() {
                return PostingSequence::Direct(source);
            }
        }
        PostingSequence::Concatenated(sources.into())
    }

    /// Number of per-run sources still feeding this sequence.
    pub fn source_count(&self) -> usize {
        match self {
            PostingSequence::Direct(_) => 1,
            PostingSequence::Concatenated(sources) => sources.len(),
        }
    }

    /// Drains the remaining postings into a vector.
    pub fn collect_postings(&mut self) -> Result<Vec<Posting>> {
        let mut postings = Vec::new();
        while let Some(posting) = self.next_posting()? {
            postings.push(posting);
        }
        Ok(postings)
    }
}

impl PostingSource for PostingSequence<'_> {
    fn next_posting(&mut self) -> Result<Option<Posting>> {
        match self {
            PostingSequence::Direct(source) => source.next_posting(),
            PostingSequence::Concatenated(sources) => {
                while let Some(front) = sources.front_mut() {
                    if let Some(posting) = front.next_posting()? {
                        return Ok(Some(posting));
                    }
                    sources.pop_front();
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ids: &[u32]) -> Vec<Posting> {
        ids.iter().map(|&id| Posting::new(id, 1)).collect()
    }

    #[test]
    fn test_direct_sequence_passes_through() {
        let postings = docs(&[1, 5]);
        let sources: Vec<Box<dyn PostingSource + '_>> = vec![Box::new(SlicePostings::new(&postings))];
        let mut seq = PostingSequence::from_sources(sources);
        assert!(matches!(seq, PostingSequence::Direct(_)));
        assert_eq!(seq.collect_postings().unwrap(), postings);
        assert!(seq.next_posting().unwrap().is_none());
    }

    #[test]
    fn test_concatenation_preserves_source_order() {
        let a = docs(&[1, 5]);
        let b = docs(&[]);
        let c = docs(&[9, 12]);
        let sources: Vec<Box<dyn PostingSource + '_>> = vec![
            Box::new(SlicePostings::new(&a)),
            Box::new(SlicePostings::new(&b)),
            Box::new(SlicePostings::new(&c)),
        ];
        let mut seq = PostingSequence::from_sources(sources);
        assert_eq!(seq.source_count(), 3);
        let ids: Vec<u32> = seq
            .collect_postings()
            .unwrap()
            .iter()
            .map(|p| p.doc_id)
            .collect();
        assert_eq!(ids, [1, 5, 9, 12]);
        assert_eq!(seq.source_count(), 0);
    }

    #[test]
    fn test_layout_check() {
        let layout = PostingLayout::with_fields(2).with_blocks();
        let ok = Posting::new(3, 2)
            .with_field_frequencies(vec![1, 1])
            .with_blocks(vec![4, 9]);
        assert!(layout.check(&ok).is_ok());

        assert!(layout.check(&Posting::new(3, 2).with_blocks(vec![1])).is_err());
        let unordered = ok.clone().with_blocks(vec![9, 4]);
        assert!(layout.check(&unordered).is_err());
        assert!(layout.check(&Posting { frequency: 0, ..ok }).is_err());

        let basic = PostingLayout::basic();
        assert!(basic.check(&Posting::new(0, 1)).is_ok());
        assert!(basic.check(&Posting::new(0, 1).with_blocks(vec![1])).is_err());
    }
}
