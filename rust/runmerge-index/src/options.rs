use serde::{Deserialize, Serialize};

/// Tunables of a file-based merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOptions {
    /// Buffer size of each run file reader.
    pub read_buffer_size: usize,
    /// Buffer size of the inverted file and lexicon writers.
    pub write_buffer_size: usize,
    /// Check that runs cover strictly ascending, non-overlapping document ranges
    /// when they are opened.
    pub verify_doc_ranges: bool,
    /// Number of merged terms between progress log lines; zero disables them.
    pub progress_interval: u64,
}

impl Default for MergeOptions {
    fn default() -> MergeOptions {
        MergeOptions {
            read_buffer_size: 64 * 1024,
            write_buffer_size: 64 * 1024,
            verify_doc_ranges: true,
            progress_interval: 100_000,
        }
    }
}
