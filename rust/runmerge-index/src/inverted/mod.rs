//! The inverted file: destination of merged posting lists.
//!
//! [`PostingSink`] is the seam between the merge and the posting encoding. The
//! bit-level implementation lives in [`BitPostingWriter`] and is read back with
//! [`PostingReader`]; [`MemoryPostingSink`] keeps the lists in memory.

use runmerge_common::{Result, ensure_invariant};

use crate::{posting::PostingSource, statistics::Pointer};

mod memory;
mod reader;
mod writer;

pub use memory::MemoryPostingSink;
pub use reader::{PostingReader, read_postings};
pub use writer::BitPostingWriter;

/// Output sink of merged posting lists.
pub trait PostingSink {
    /// Drains `postings` into the sink and returns the location of the list.
    ///
    /// Document ids must strictly increase within the list; a violation fails
    /// with an `InvariantViolation` error.
    fn write_postings(&mut self, postings: &mut dyn PostingSource) -> Result<Pointer>;

    /// Location at which the next list will be written.
    fn position(&self) -> Pointer;

    /// Flushes and closes the sink. Idempotent.
    fn close(&mut self) -> Result<()>;
}

impl<S> PostingSink for &mut S
where
    S: PostingSink + ?Sized,
{
    fn write_postings(&mut self, postings: &mut dyn PostingSource) -> Result<Pointer> {
        (**self).write_postings(postings)
    }

    fn position(&self) -> Pointer {
        (**self).position()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S> PostingSink for Box<S>
where
    S: PostingSink + ?Sized,
{
    fn write_postings(&mut self, postings: &mut dyn PostingSource) -> Result<Pointer> {
        (**self).write_postings(postings)
    }

    fn position(&self) -> Pointer {
        (**self).position()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Tracks the last document id of the list being written.
#[derive(Debug, Default)]
pub(crate) struct DocOrder {
    last: Option<u32>,
}

impl DocOrder {
    pub(crate) fn check_next(&mut self, doc_id: u32) -> Result<()> {
        if let Some(last) = self.last {
            ensure_invariant!(
                doc_id > last,
                "document {doc_id} written after document {last}"
            );
        }
        self.last = Some(doc_id);
        Ok(())
    }
}
