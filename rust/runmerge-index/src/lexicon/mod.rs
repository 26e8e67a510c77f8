//! The lexicon: one entry per merged term, in term order.
//!
//! The merge hands each entry to a [`DictionaryWriter`]. [`LexiconWriter`]
//! persists them in the lexicon file format and [`LexiconReader`] reads them back;
//! a plain `Vec<LexiconEntry>` collects them in memory.

use std::borrow::Cow;

use runmerge_common::Result;

use crate::statistics::TermStatistics;

mod format;
mod reader;
mod writer;

pub use reader::LexiconReader;
pub use writer::LexiconWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub term: Vec<u8>,
    pub statistics: TermStatistics,
}

impl LexiconEntry {
    pub fn term_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.term)
    }
}

/// Receives the dictionary entries of a merge, one call per term in strictly
/// increasing term order.
pub trait DictionaryWriter {
    fn write_entry(&mut self, term: &[u8], statistics: &TermStatistics) -> Result<()>;
}

impl<D> DictionaryWriter for &mut D
where
    D: DictionaryWriter + ?Sized,
{
    fn write_entry(&mut self, term: &[u8], statistics: &TermStatistics) -> Result<()> {
        (**self).write_entry(term, statistics)
    }
}

impl DictionaryWriter for Vec<LexiconEntry> {
    fn write_entry(&mut self, term: &[u8], statistics: &TermStatistics) -> Result<()> {
        self.push(LexiconEntry {
            term: term.to_vec(),
            statistics: statistics.clone(),
        });
        Ok(())
    }
}
