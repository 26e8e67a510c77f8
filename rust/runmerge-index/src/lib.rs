//! Merge stage of a batch inverted index build.
//!
//! A build first writes a number of sorted runs, each a partial index over an
//! ascending range of document ids. This crate merges those runs into a single
//! inverted file and its lexicon:
//!
//! - [`run`]: in-memory and on-disk runs, and the cursors reading them.
//! - [`scheduler`]: orders run cursors by `(term, run index)` and pops groups of
//!   runs sharing the smallest term.
//! - [`merger`]: the merge loop, combining statistics and concatenating postings.
//! - [`inverted`] and [`lexicon`]: output sinks for posting lists and dictionary
//!   entries.

mod codec;

pub mod cursor;
pub mod inverted;
pub mod lexicon;
pub mod merger;
pub mod options;
pub mod posting;
pub mod run;
pub mod scheduler;
pub mod statistics;

pub use cursor::{CursorLease, RunCursor, RunCursorFactory, RunEntry};
pub use inverted::{BitPostingWriter, MemoryPostingSink, PostingReader, PostingSink};
pub use lexicon::{DictionaryWriter, LexiconEntry, LexiconReader, LexiconWriter};
pub use merger::{MergeProgress, MergedTerm, RunsMerger, merge_runs};
pub use options::MergeOptions;
pub use posting::{Posting, PostingLayout, PostingSequence, PostingSource};
pub use statistics::{Pointer, TermStatistics};
