use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use runmerge_common::{Result, error::Error};

use crate::{
    cursor::{RunCursor, RunCursorFactory, RunEntry},
    posting::SlicePostings,
    statistics::TermStatistics,
};

use super::{MemoryRun, UNPOSITIONED_STATISTICS};

/// Counts cursors handed out by a [`MemoryRunFactory`] that are still open.
#[derive(Debug, Default)]
struct CursorTracker {
    open: AtomicUsize,
    closes: AtomicUsize,
}

/// Cursor over a shared [`MemoryRun`].
pub struct MemoryRunCursor {
    run: Arc<MemoryRun>,
    /// Index of the current entry, `None` before the first `advance()`.
    position: Option<usize>,
    closed: bool,
    tracker: Arc<CursorTracker>,
}

impl MemoryRunCursor {
    fn next_position(&self) -> usize {
        self.position.map_or(0, |pos| pos + 1)
    }
}

impl RunCursor for MemoryRunCursor {
    fn run_index(&self) -> usize {
        self.run.run_index()
    }

    fn term(&self) -> &[u8] {
        self.position
            .map_or(&[][..], |pos| self.run.entries[pos].term.as_slice())
    }

    fn statistics(&self) -> &TermStatistics {
        self.position.map_or(&UNPOSITIONED_STATISTICS, |pos| {
            &self.run.entries[pos].statistics
        })
    }

    fn current(&mut self) -> RunEntry<'_> {
        match self.position {
            Some(pos) => {
                let entry = &self.run.entries[pos];
                RunEntry {
                    term: &entry.term,
                    statistics: &entry.statistics,
                    postings: Box::new(SlicePostings::new(&entry.postings)),
                }
            }
            None => RunEntry {
                term: &[],
                statistics: &UNPOSITIONED_STATISTICS,
                postings: Box::new(SlicePostings::new(&[])),
            },
        }
    }

    fn has_next(&self) -> bool {
        !self.closed && self.next_position() < self.run.len()
    }

    fn advance(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::invalid_operation("advance on a closed run cursor"));
        }
        let next = self.next_position();
        if next >= self.run.len() {
            return Err(Error::invalid_operation(format!(
                "advance past the end of run {}",
                self.run.run_index()
            )));
        }
        self.position = Some(next);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.tracker.open.fetch_sub(1, Ordering::Relaxed);
            self.tracker.closes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Opens cursors over a list of in-memory runs, indexed by position in the list.
pub struct MemoryRunFactory {
    runs: Vec<Arc<MemoryRun>>,
    tracker: Arc<CursorTracker>,
}

impl MemoryRunFactory {
    pub fn new(runs: Vec<Arc<MemoryRun>>) -> MemoryRunFactory {
        MemoryRunFactory {
            runs,
            tracker: Default::default(),
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Number of cursors opened by this factory and not yet closed.
    pub fn open_cursors(&self) -> usize {
        self.tracker.open.load(Ordering::Relaxed)
    }

    /// Number of cursors closed so far.
    pub fn total_closes(&self) -> usize {
        self.tracker.closes.load(Ordering::Relaxed)
    }
}

impl RunCursorFactory for MemoryRunFactory {
    type Cursor = MemoryRunCursor;

    fn open_run(&mut self, run_index: usize) -> Result<MemoryRunCursor> {
        let run = self.runs.get(run_index).cloned().ok_or_else(|| {
            Error::invalid_arg(
                "run_index",
                format!("{run_index} out of {} runs", self.runs.len()),
            )
        })?;
        self.tracker.open.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryRunCursor {
            run,
            position: None,
            closed: false,
            tracker: self.tracker.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::posting::{Posting, PostingLayout};

    use super::*;

    #[test]
    fn test_cursor_walks_entries() {
        let mut builder = MemoryRun::builder(0, PostingLayout::basic());
        builder.push_term(b"a", vec![Posting::new(1, 1)]).unwrap();
        builder
            .push_term(b"b", vec![Posting::new(1, 1), Posting::new(2, 3)])
            .unwrap();
        let mut factory = MemoryRunFactory::new(vec![Arc::new(builder.build())]);

        let mut cursor = factory.open_run(0).unwrap();
        assert_eq!(cursor.term(), b"");
        assert_eq!(cursor.statistics().document_frequency, 0);
        let mut terms = Vec::new();
        while cursor.has_next() {
            cursor.advance().unwrap();
            terms.push((cursor.term().to_vec(), cursor.statistics().frequency));
        }
        assert_eq!(terms, [(b"a".to_vec(), 1), (b"b".to_vec(), 4)]);
        assert!(cursor.advance().is_err());

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert_eq!(factory.total_closes(), 1);
        assert!(!cursor.has_next());
        assert!(factory.open_run(1).is_err());
    }
}
