//! Term scheduling across run cursors.
//!
//! The scheduler keeps every active cursor in a binary heap keyed by
//! `(current term, run index)`. Each merge step pops the whole group of cursors
//! positioned at the smallest term; since ties are broken by ascending run index,
//! the group comes out in run creation order.

use std::{cmp::Ordering, collections::BinaryHeap};

use runmerge_common::{Result, ensure_invariant, error::Error};

use crate::cursor::{CursorLease, RunCursor, RunCursorFactory};

/// Total order of cursor positions: lexicographic by term, then ascending run index.
#[inline]
pub fn compare_run_keys(
    term_a: &[u8],
    run_a: usize,
    term_b: &[u8],
    run_b: usize,
) -> Ordering {
    term_a.cmp(term_b).then(run_a.cmp(&run_b))
}

/// Heap slot. `BinaryHeap` is a max-heap, so the key order is reversed to keep
/// the smallest `(term, run)` on top.
struct Scheduled<C: RunCursor>(CursorLease<C>);

impl<C: RunCursor> PartialEq for Scheduled<C> {
    fn eq(&self, other: &Scheduled<C>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<C: RunCursor> Eq for Scheduled<C> {}

impl<C: RunCursor> Ord for Scheduled<C> {
    #[inline]
    fn cmp(&self, other: &Scheduled<C>) -> Ordering {
        compare_run_keys(
            self.0.term(),
            self.0.run_index(),
            other.0.term(),
            other.0.run_index(),
        )
        .reverse()
    }
}

impl<C: RunCursor> PartialOrd for Scheduled<C> {
    fn partial_cmp(&self, other: &Scheduled<C>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct TermScheduler<C: RunCursor> {
    heap: BinaryHeap<Scheduled<C>>,
}

impl<C: RunCursor> TermScheduler<C> {
    /// Opens runs `0..run_count`, positions each cursor on its first entry and
    /// schedules the non-empty ones.
    ///
    /// On failure every cursor opened so far is released and an `Initialization`
    /// error naming the offending run is returned.
    pub fn initialize<F>(run_count: usize, factory: &mut F) -> Result<TermScheduler<C>>
    where
        F: RunCursorFactory<Cursor = C> + ?Sized,
    {
        let mut scheduler = TermScheduler {
            heap: BinaryHeap::with_capacity(run_count),
        };
        for run_index in 0..run_count {
            if let Err(e) = scheduler.open_run(run_index, factory) {
                if let Err(release_err) = scheduler.release_all() {
                    log::warn!("failed to release runs after initialization error: {release_err}");
                }
                return Err(Error::initialization(run_index, e));
            }
        }
        Ok(scheduler)
    }

    fn open_run<F>(&mut self, run_index: usize, factory: &mut F) -> Result<()>
    where
        F: RunCursorFactory<Cursor = C> + ?Sized,
    {
        let mut lease = CursorLease::new(factory.open_run(run_index)?);
        ensure_invariant!(
            lease.run_index() == run_index,
            "factory returned run {} when asked for run {run_index}",
            lease.run_index()
        );
        if !lease.has_next() {
            log::debug!("run {run_index} is empty");
            return lease.release();
        }
        lease.advance()?;
        self.heap.push(Scheduled(lease));
        Ok(())
    }

    /// Removes the cursors positioned at the smallest term, ordered by ascending
    /// run index. Returns `None` when no cursor remains.
    pub fn pop_min_term_group(&mut self) -> Option<Vec<CursorLease<C>>> {
        let Scheduled(first) = self.heap.pop()?;
        let mut group = vec![first];
        while self
            .heap
            .peek()
            .is_some_and(|next| next.0.term() == group[0].term())
        {
            if let Some(Scheduled(next)) = self.heap.pop() {
                group.push(next);
            }
        }
        Some(group)
    }

    /// Returns a cursor taken by [`pop_min_term_group`](Self::pop_min_term_group):
    /// advances and reschedules it, or releases it once its run is exhausted.
    pub fn requeue(&mut self, mut lease: CursorLease<C>) -> Result<()> {
        if lease.has_next() {
            lease.advance()?;
            self.heap.push(Scheduled(lease));
            Ok(())
        } else {
            log::debug!("run {} exhausted", lease.run_index());
            lease.release()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of runs still being merged.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Releases every cursor still held, returning the first close failure.
    pub fn release_all(&mut self) -> Result<()> {
        let mut result = Ok(());
        for Scheduled(lease) in self.heap.drain() {
            let run_index = lease.run_index();
            if let Err(e) = lease.release() {
                if result.is_ok() {
                    result = Err(e);
                } else {
                    log::warn!("failed to close cursor of run {run_index}: {e}");
                }
            }
        }
        result
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

    fn run(run_index: usize, terms: &[&str]) -> Arc<MemoryRun> {
        let mut builder = MemoryRun::builder(run_index, PostingLayout::basic());
        for term in terms {
            builder
                .push_term(term.as_bytes(), vec![Posting::new(run_index as u32 * 100, 1)])
                .unwrap();
        }
        Arc::new(builder.build())
    }

    fn group_runs<C: RunCursor>(group: &[CursorLease<C>]) -> Vec<usize> {
        group.iter().map(|lease| lease.run_index()).collect()
    }

    #[test]
    fn test_compare_run_keys() {
        assert_eq!(compare_run_keys(b"a", 5, b"b", 0), Ordering::Less);
        assert_eq!(compare_run_keys(b"b", 0, b"b", 1), Ordering::Less);
        assert_eq!(compare_run_keys(b"b", 2, b"b", 2), Ordering::Equal);
        assert_eq!(compare_run_keys(b"ba", 0, b"b", 9), Ordering::Greater);
    }

    #[test]
    fn test_groups_come_out_in_term_then_run_order() {
        let mut factory = MemoryRunFactory::new(vec![
            run(0, &["cat", "dog"]),
            run(1, &["ant", "cat"]),
            run(2, &[]),
            run(3, &["cat", "eel"]),
        ]);
        let mut scheduler = TermScheduler::initialize(4, &mut factory).unwrap();
        // the empty run is released right away
        assert_eq!(scheduler.len(), 3);
        assert_eq!(factory.open_cursors(), 3);

        let mut seen = Vec::new();
        while let Some(group) = scheduler.pop_min_term_group() {
            let term = String::from_utf8(group[0].term().to_vec()).unwrap();
            seen.push((term, group_runs(&group)));
            for lease in group {
                scheduler.requeue(lease).unwrap();
            }
        }
        assert_eq!(
            seen,
            [
                ("ant".to_string(), vec![1]),
                ("cat".to_string(), vec![0, 1, 3]),
                ("dog".to_string(), vec![0]),
                ("eel".to_string(), vec![3]),
            ]
        );
        assert!(scheduler.is_empty());
        assert_eq!(factory.open_cursors(), 0);
    }

    #[test]
    fn test_initialization_failure_releases_opened_runs() {
        let mut factory = MemoryRunFactory::new(vec![run(0, &["a"]), run(1, &["b"])]);
        let err = TermScheduler::initialize(3, &mut factory)
            .err()
            .expect("run 2 does not exist");
        assert!(err.is_initialization());
        assert_eq!(factory.open_cursors(), 0);
    }

    #[test]
    fn test_release_all() {
        let mut factory = MemoryRunFactory::new(vec![run(0, &["a"]), run(1, &["b"])]);
        let mut scheduler = TermScheduler::initialize(2, &mut factory).unwrap();
        assert_eq!(factory.open_cursors(), 2);
        scheduler.release_all().unwrap();
        assert!(scheduler.is_empty());
        assert_eq!(factory.open_cursors(), 0);
        assert_eq!(factory.total_closes(), 2);
    }
}
