//! Run cursors: forward-only views over individual sorted runs, and the lease that
//! guarantees each cursor is released exactly once.

use std::ops::{Deref, DerefMut};

use runmerge_common::Result;

use crate::{posting::PostingSource, statistics::TermStatistics};

/// The entry a cursor is currently positioned at.
pub struct RunEntry<'a> {
    pub term: &'a [u8],
    pub statistics: &'a TermStatistics,
    /// Postings of `term` within this run. Valid until the cursor advances.
    pub postings: Box<dyn PostingSource + 'a>,
}

/// A stateful, forward-only iterator over one sorted run.
///
/// A freshly opened cursor is positioned before the first entry: `has_next()`
/// reports whether the run holds any entry at all, and `advance()` must be called
/// before `term()`, `statistics()` or `current()` are meaningful.
pub trait RunCursor {
    /// Creation-order index of the run, stable for the run's lifetime.
    fn run_index(&self) -> usize;

    fn term(&self) -> &[u8];

    fn statistics(&self) -> &TermStatistics;

    fn current(&mut self) -> RunEntry<'_>;

    /// Postings of the current entry.
    fn postings(&mut self) -> Box<dyn PostingSource + '_> {
        self.current().postings
    }

    /// Whether another entry follows the current one.
    fn has_next(&self) -> bool;

    /// Moves to the next entry, discarding any unread postings of the current one.
    fn advance(&mut self) -> Result<()>;

    /// Releases the underlying resources. Idempotent.
    fn close(&mut self) -> Result<()>;
}

impl<C> RunCursor for Box<C>
where
    C: RunCursor + ?Sized,
{
    fn run_index(&self) -> usize {
        (**self).run_index()
    }

    fn term(&self) -> &[u8] {
        (**self).term()
    }

    fn statistics(&self) -> &TermStatistics {
        (**self).statistics()
    }

    fn current(&mut self) -> RunEntry<'_> {
        (**self).current()
    }

    fn postings(&mut self) -> Box<dyn PostingSource + '_> {
        (**self).postings()
    }

    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn advance(&mut self) -> Result<()> {
        (**self).advance()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Opens the cursor of a run by its creation-order index.
pub trait RunCursorFactory {
    type Cursor: RunCursor;

    fn open_run(&mut self, run_index: usize) -> Result<Self::Cursor>;
}

/// Exclusive ownership of an open cursor.
///
/// The cursor is closed exactly once: explicitly through [`CursorLease::release`],
/// or when the lease is dropped on an early return or error path.
pub struct CursorLease<C: RunCursor> {
    cursor: C,
    released: bool,
}

impl<C: RunCursor> CursorLease<C> {
    pub fn new(cursor: C) -> CursorLease<C> {
        CursorLease {
            cursor,
            released: false,
        }
    }

    /// Closes the cursor, reporting the close failure if any.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.cursor.close()
    }
}

impl<C: RunCursor> Deref for CursorLease<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.cursor
    }
}

impl<C: RunCursor> DerefMut for CursorLease<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.cursor
    }
}

impl<C: RunCursor> Drop for CursorLease<C> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.cursor.close() {
                log::warn!(
                    "failed to close cursor of run {}: {e}",
                    self.cursor.run_index()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        posting::{Posting, PostingLayout},
        run::{MemoryRun, MemoryRunFactory},
    };

    use super::*;

    fn single_term_run(run_index: usize) -> Arc<MemoryRun> {
        let mut builder = MemoryRun::builder(run_index, PostingLayout::basic());
        builder
            .push_term(b"cat", vec![Posting::new(run_index as u32, 1)])
            .unwrap();
        Arc::new(builder.build())
    }

    #[test]
    fn test_lease_closes_on_drop() {
        let mut factory = MemoryRunFactory::new(vec![single_term_run(0)]);
        {
            let _lease = CursorLease::new(factory.open_run(0).unwrap());
            assert_eq!(factory.open_cursors(), 1);
        }
        assert_eq!(factory.open_cursors(), 0);
    }

    #[test]
    fn test_lease_release_closes_once() {
        let mut factory = MemoryRunFactory::new(vec![single_term_run(0)]);
        let mut lease = CursorLease::new(factory.open_run(0).unwrap());
        lease.advance().unwrap();
        assert_eq!(lease.term(), b"cat");
        lease.release().unwrap();
        assert_eq!(factory.open_cursors(), 0);
        assert_eq!(factory.total_closes(), 1);
    }

    #[test]
    fn test_current_entry() {
        let mut factory = MemoryRunFactory::new(vec![single_term_run(0)]);
        let mut cursor = factory.open_run(0).unwrap();
        assert!(cursor.has_next());
        cursor.advance().unwrap();
        assert!(!cursor.has_next());
        let mut entry = cursor.current();
        assert_eq!(entry.term, b"cat");
        assert_eq!(entry.statistics.document_frequency, 1);
        assert_eq!(entry.postings.next_posting().unwrap(), Some(Posting::new(0, 1)));
        assert_eq!(entry.postings.next_posting().unwrap(), None);
    }
}
