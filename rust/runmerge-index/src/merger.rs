//! The multi-way run merge.
//!
//! [`RunsMerger`] drives the [`TermScheduler`]: each [`merge_one`](RunsMerger::merge_one)
//! step takes the group of runs positioned at the smallest term, combines their
//! statistics, writes the concatenation of their postings to the [`PostingSink`],
//! assigns the next term id and hands the entry to the [`DictionaryWriter`].

use runmerge_common::{Result, ensure_invariant, error::Error};

use crate::{
    cursor::{CursorLease, RunCursor, RunCursorFactory},
    inverted::PostingSink,
    lexicon::DictionaryWriter,
    posting::{Posting, PostingSequence, PostingSource},
    scheduler::TermScheduler,
    statistics::{Pointer, TermStatistics},
};

/// Counters of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeProgress {
    /// Distinct terms emitted so far.
    pub terms: u64,
    /// Postings written so far.
    pub postings: u64,
}

/// Summary of one merge step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTerm {
    pub term: Vec<u8>,
    pub term_id: u32,
    /// Runs that contributed to the term, in ascending order.
    pub runs: Vec<usize>,
    /// Combined statistics, with the term id and pointer assigned.
    pub statistics: TermStatistics,
}

pub struct RunsMerger<C: RunCursor, S: PostingSink> {
    scheduler: TermScheduler<C>,
    sink: S,
    progress: MergeProgress,
    progress_interval: u64,
    /// Set once a step failed or the merge was aborted.
    poisoned: bool,
}

impl<C: RunCursor, S: PostingSink> RunsMerger<C, S> {
    /// Opens runs `0..run_count` through `factory` and binds the output sink.
    pub fn begin<F>(run_count: usize, factory: &mut F, sink: S) -> Result<RunsMerger<C, S>>
    where
        F: RunCursorFactory<Cursor = C> + ?Sized,
    {
        let scheduler = TermScheduler::initialize(run_count, factory)?;
        log::debug!(
            "merge started: {run_count} runs, {} non-empty",
            scheduler.len()
        );
        Ok(RunsMerger {
            scheduler,
            sink,
            progress: MergeProgress::default(),
            progress_interval: 0,
            poisoned: false,
        })
    }

    /// Logs a progress line every `interval` merged terms; zero disables it.
    pub fn with_progress_interval(mut self, interval: u64) -> RunsMerger<C, S> {
        self.progress_interval = interval;
        self
    }

    /// Whether every run has been consumed and released.
    pub fn is_done(&self) -> bool {
        !self.poisoned && self.scheduler.is_empty()
    }

    /// Whether a failed step or an abort made the merge unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Merges the smallest remaining term across all runs.
    ///
    /// On error every cursor still held is released and the merger is poisoned:
    /// later calls fail with `InvalidOperation`. Calling it once the merge is done
    /// is an `InvariantViolation`.
    pub fn merge_one<D>(&mut self, dictionary: &mut D) -> Result<MergedTerm>
    where
        D: DictionaryWriter + ?Sized,
    {
        if self.poisoned {
            return Err(Error::invalid_operation("merge_one on a failed merge"));
        }
        let Some(group) = self.scheduler.pop_min_term_group() else {
            return Err(Error::invariant("merge_one called after the merge completed"));
        };
        match self.merge_group(group, dictionary) {
            Ok(merged) => Ok(merged),
            Err(e) => {
                self.poisoned = true;
                if let Err(release_err) = self.scheduler.release_all() {
                    log::warn!("failed to release runs after merge error: {release_err}");
                }
                Err(e)
            }
        }
    }

    fn merge_group<D>(&mut self, mut group: Vec<CursorLease<C>>, dictionary: &mut D) -> Result<MergedTerm>
    where
        D: DictionaryWriter + ?Sized,
    {
        for pair in group.windows(2) {
            ensure_invariant!(
                pair[0].run_index() < pair[1].run_index(),
                "run {} precedes run {} in the group of '{}'",
                pair[0].run_index(),
                pair[1].run_index(),
                pair[0].term().escape_ascii()
            );
        }

        let term = group[0].term().to_vec();
        let runs = group.iter().map(|lease| lease.run_index()).collect::<Vec<_>>();
        let mut statistics = group[0].statistics().detached();
        for lease in &group[1..] {
            statistics.combine(lease.statistics())?;
        }
        let run_postings = group
            .iter()
            .map(|lease| lease.statistics().document_frequency as u64)
            .sum::<u64>();

        let pointer = {
            let sources = group
                .iter_mut()
                .map(|lease| lease.postings())
                .collect::<Vec<_>>();
            let mut sequence = PostingSequence::from_sources(sources);
            let mut counted = CountingPostings {
                inner: &mut sequence,
                count: 0,
            };
            let pointer = self.sink.write_postings(&mut counted)?;
            ensure_invariant!(
                counted.count == run_postings,
                "'{}' has {} postings but document frequency {run_postings}",
                term.escape_ascii(),
                counted.count
            );
            pointer
        };

        let term_id = u32::try_from(self.progress.terms)
            .map_err(|_| Error::invariant("term id space exhausted"))?;
        statistics.term_id = Some(term_id);
        statistics.pointer = Some(pointer);
        dictionary.write_entry(&term, &statistics)?;

        self.progress.terms += 1;
        self.progress.postings += run_postings;
        log::trace!(
            "term {term_id} '{}' from runs {runs:?}: df {} at {pointer}",
            term.escape_ascii(),
            statistics.document_frequency
        );
        if self.progress_interval != 0 && self.progress.terms % self.progress_interval == 0 {
            log::info!(
                "merged {} terms, {} postings, {} runs active",
                self.progress.terms,
                self.progress.postings,
                self.scheduler.len() + group.len()
            );
        }

        for lease in group {
            self.scheduler.requeue(lease)?;
        }
        Ok(MergedTerm {
            term,
            term_id,
            runs,
            statistics,
        })
    }

    /// Releases every cursor still held. The merger cannot be used afterwards,
    /// apart from [`end`](Self::end).
    pub fn abort(&mut self) -> Result<()> {
        self.poisoned = true;
        self.scheduler.release_all()
    }

    pub fn progress(&self) -> MergeProgress {
        self.progress
    }

    pub fn terms_written(&self) -> u64 {
        self.progress.terms
    }

    pub fn postings_written(&self) -> u64 {
        self.progress.postings
    }

    /// Current write position of the sink.
    pub fn position(&self) -> Pointer {
        self.sink.position()
    }

    pub fn byte_offset(&self) -> u64 {
        self.sink.position().byte_offset
    }

    pub fn bit_offset(&self) -> u8 {
        self.sink.position().bit_offset
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Releases any remaining cursor, then flushes and closes the sink.
    pub fn end(mut self) -> Result<MergeProgress> {
        if !self.scheduler.is_empty() {
            log::warn!(
                "merge ended with {} runs still open",
                self.scheduler.len()
            );
            self.scheduler.release_all()?;
        }
        self.sink.close()?;
        log::debug!(
            "merge finished: {} terms, {} postings",
            self.progress.terms,
            self.progress.postings
        );
        Ok(self.progress)
    }
}

/// Merges runs `0..run_count` to completion.
pub fn merge_runs<F, S, D>(
    run_count: usize,
    factory: &mut F,
    sink: S,
    dictionary: &mut D,
) -> Result<MergeProgress>
where
    F: RunCursorFactory + ?Sized,
    S: PostingSink,
    D: DictionaryWriter + ?Sized,
{
    let mut merger = RunsMerger::begin(run_count, factory, sink)?;
    while !merger.is_done() {
        merger.merge_one(dictionary)?;
    }
    merger.end()
}

/// Counts the postings pulled through it.
struct CountingPostings<'a> {
    inner: &'a mut dyn PostingSource,
    count: u64,
}

impl PostingSource for CountingPostings<'_> {
    fn next_posting(&mut self) -> Result<Option<Posting>> {
        let posting = self.inner.next_posting()?;
        if posting.is_some() {
            self.count += 1;
        }
        Ok(posting)
    }
}
