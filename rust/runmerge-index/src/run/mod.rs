//! Sorted runs: the partial indexes consumed by the merge.
//!
//! A run is an immutable sequence of `(term, statistics, postings)` entries sorted
//! by term. Runs are numbered in creation order, and the documents of run `i`
//! precede (by document id) every document of run `i + 1`.
//!
//! This module provides an in-memory run representation ([`MemoryRun`]), the
//! on-disk run format written by [`MemoryRun::spill`] and read back by
//! [`RunFileCursor`], and cursor factories over both.

use runmerge_common::{Result, error::Error};
use runmerge_io::{FileWriter, SealingWrite};

use crate::{
    posting::{Posting, PostingLayout},
    statistics::TermStatistics,
};

mod file;
mod format;
mod memory;

pub use file::{RunFileCursor, RunFileFactory, read_run_header};
pub use format::{MAX_TERM_LEN, RunHeader};
pub use memory::{MemoryRunCursor, MemoryRunFactory};

/// Statistics reported by cursors that are not positioned at an entry.
pub(crate) static UNPOSITIONED_STATISTICS: TermStatistics = TermStatistics {
    document_frequency: 0,
    frequency: 0,
    field_frequencies: Vec::new(),
    term_id: None,
    pointer: None,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTermEntry {
    pub term: Vec<u8>,
    pub statistics: TermStatistics,
    pub postings: Vec<Posting>,
}

/// A complete sorted run held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRun {
    run_index: usize,
    layout: PostingLayout,
    entries: Vec<RunTermEntry>,
}

impl MemoryRun {
    pub fn builder(run_index: usize, layout: PostingLayout) -> MemoryRunBuilder {
        MemoryRunBuilder {
            run: MemoryRun {
                run_index,
                layout,
                entries: Vec::new(),
            },
        }
    }

    pub fn run_index(&self) -> usize {
        self.run_index
    }

    pub fn layout(&self) -> PostingLayout {
        self.layout
    }

    pub fn entries(&self) -> &[RunTermEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest and largest document id referenced by the run.
    pub fn doc_range(&self) -> Option<(u32, u32)> {
        let first = self
            .entries
            .iter()
            .filter_map(|e| e.postings.first())
            .map(|p| p.doc_id)
            .min()?;
        let last = self
            .entries
            .iter()
            .filter_map(|e| e.postings.last())
            .map(|p| p.doc_id)
            .max()?;
        Some((first, last))
    }

    /// Total number of postings across all terms.
    pub fn posting_count(&self) -> u64 {
        self.entries.iter().map(|e| e.postings.len() as u64).sum()
    }

    pub fn header(&self) -> Result<RunHeader> {
        let (first_doc, last_doc) = self.doc_range().unwrap_or_default();
        Ok(RunHeader {
            run_index: u32::try_from(self.run_index)
                .map_err(|_| Error::invalid_arg("run_index", "exceeds u32"))?,
            layout: self.layout,
            term_count: u32::try_from(self.entries.len())
                .map_err(|_| Error::invalid_arg("run", "too many terms"))?,
            first_doc,
            last_doc,
            posting_count: self.posting_count(),
        })
    }

    /// Serializes the run in the on-disk run format. The writer is not sealed.
    pub fn spill(&self, writer: &mut dyn SealingWrite) -> Result<()> {
        let mut buf = Vec::with_capacity(64 * 1024);
        self.header()?.encode(&mut buf);
        for entry in &self.entries {
            format::encode_term(&mut buf, self.layout, entry);
            if buf.len() >= 64 * 1024 {
                writer.write_all(&buf)?;
                buf.clear();
            }
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Spills the run into a new file at `path`.
    pub fn spill_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = FileWriter::create(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        self.spill(&mut writer)?;
        writer
            .seal()
            .map_err(|e| Error::io(path.display().to_string(), e))
    }
}

/// Accumulates the entries of a run in term order.
pub struct MemoryRunBuilder {
    run: MemoryRun,
}

impl MemoryRunBuilder {
    /// Appends a term with its postings.
    ///
    /// Terms must be pushed in strictly increasing order, every term needs at least
    /// one posting, and document ids must strictly increase within the term.
    pub fn push_term(&mut self, term: &[u8], postings: Vec<Posting>) -> Result<()> {
        if term.len() > MAX_TERM_LEN {
            return Err(Error::invalid_arg(
                "term",
                format!("{} bytes exceeds the {MAX_TERM_LEN} byte limit", term.len()),
            ));
        }
        if let Some(last) = self.run.entries.last() {
            if last.term.as_slice() >= term {
                return Err(Error::invalid_arg(
                    "term",
                    format!(
                        "'{}' does not follow '{}'",
                        String::from_utf8_lossy(term),
                        String::from_utf8_lossy(&last.term)
                    ),
                ));
            }
        }
        if postings.is_empty() {
            return Err(Error::invalid_arg("postings", "a term needs at least one posting"));
        }
        for posting in &postings {
            self.run.layout.check(posting)?;
        }
        if postings.windows(2).any(|w| w[0].doc_id >= w[1].doc_id) {
            return Err(Error::invalid_arg(
                "postings",
                format!(
                    "document ids of '{}' are not strictly increasing",
                    String::from_utf8_lossy(term)
                ),
            ));
        }
        let statistics = TermStatistics::from_postings(self.run.layout, &postings);
        self.run.entries.push(RunTermEntry {
            term: term.to_vec(),
            statistics,
            postings,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.run.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.run.entries.is_empty()
    }

    pub fn build(self) -> MemoryRun {
        self.run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_unsorted_terms() {
        let mut builder = MemoryRun::builder(0, PostingLayout::basic());
        builder.push_term(b"dog", vec![Posting::new(1, 1)]).unwrap();
        assert!(builder.push_term(b"cat", vec![Posting::new(2, 1)]).is_err());
        assert!(builder.push_term(b"dog", vec![Posting::new(2, 1)]).is_err());
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_builder_validates_postings() {
        let mut builder = MemoryRun::builder(0, PostingLayout::with_fields(1));
        assert!(builder.push_term(b"a", vec![]).is_err());
        assert!(builder.push_term(b"a", vec![Posting::new(1, 1)]).is_err());
        let p = |doc| Posting::new(doc, 1).with_field_frequencies(vec![1]);
        assert!(builder.push_term(b"a", vec![p(3), p(3)]).is_err());
        builder.push_term(b"a", vec![p(3), p(4)]).unwrap();
        let long = vec![b'x'; MAX_TERM_LEN + 1];
        assert!(builder.push_term(&long, vec![p(5)]).is_err());
    }

    #[test]
    fn test_doc_range_and_header() {
        let mut builder = MemoryRun::builder(2, PostingLayout::basic());
        builder
            .push_term(b"cat", vec![Posting::new(20, 1), Posting::new(27, 2)])
            .unwrap();
        builder.push_term(b"dog", vec![Posting::new(21, 1)]).unwrap();
        let run = builder.build();
        assert_eq!(run.doc_range(), Some((20, 27)));
        assert_eq!(run.posting_count(), 3);

        let header = run.header().unwrap();
        assert_eq!(header.run_index, 2);
        assert_eq!(header.term_count, 2);
        assert_eq!((header.first_doc, header.last_doc), (20, 27));
        assert_eq!(run.entries()[0].statistics.frequency, 3);

        let empty = MemoryRun::builder(0, PostingLayout::basic()).build();
        assert!(empty.is_empty());
        assert_eq!(empty.doc_range(), None);
    }
}
