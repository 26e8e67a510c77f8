//! Inspect-run command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use runmerge_index::{
    Posting, PostingSource, RunCursor,
    run::{RunFileCursor, RunHeader},
};
use serde::Serialize;

use crate::utils;

#[derive(Serialize)]
struct RunSummary {
    run_index: u32,
    field_count: u16,
    blocks: bool,
    term_count: u32,
    first_doc: u32,
    last_doc: u32,
    posting_count: u64,
    file_size: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    terms: Vec<TermInfo>,
}

#[derive(Serialize)]
struct TermInfo {
    term: String,
    document_frequency: u32,
    frequency: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    field_frequencies: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    postings: Vec<Posting>,
}

/// Run the inspect-run command
pub fn run(verbose: u8, postings: bool, run_path: PathBuf) -> Result<()> {
    utils::validate_file_exists(&run_path)?;
    let summary = inspect(&run_path, verbose > 0 || postings, postings)?;
    let json =
        serde_json::to_string_pretty(&summary).with_context(|| "Failed to serialize summary")?;
    println!("{json}");
    Ok(())
}

fn inspect(path: &Path, with_terms: bool, with_postings: bool) -> Result<RunSummary> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let mut cursor = RunFileCursor::open(path, 64 * 1024)
        .with_context(|| format!("Failed to open run {}", path.display()))?;
    let header: RunHeader = *cursor.header();

    let mut terms = Vec::new();
    if with_terms {
        while cursor.has_next() {
            cursor.advance()?;
            let mut entry = cursor.current();
            let mut postings = Vec::new();
            if with_postings {
                while let Some(posting) = entry.postings.next_posting()? {
                    postings.push(posting);
                }
            }
            terms.push(TermInfo {
                term: utils::display_term(entry.term),
                document_frequency: entry.statistics.document_frequency,
                frequency: entry.statistics.frequency,
                field_frequencies: entry.statistics.field_frequencies.clone(),
                postings,
            });
        }
    }
    cursor.close()?;

    Ok(RunSummary {
        run_index: header.run_index,
        field_count: header.layout.field_count,
        blocks: header.layout.blocks,
        term_count: header.term_count,
        first_doc: header.first_doc,
        last_doc: header.last_doc,
        posting_count: header.posting_count,
        file_size: utils::format_size(file_size),
        terms,
    })
}

#[cfg(test)]
mod tests {
    use runmerge_index::{PostingLayout, run::MemoryRun};

    use super::*;

    #[test]
    fn test_inspect_lists_terms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.run");
        let mut builder = MemoryRun::builder(3, PostingLayout::with_fields(1));
        builder
            .push_term(
                b"owl",
                vec![
                    Posting::new(4, 2).with_field_frequencies(vec![2]),
                    Posting::new(8, 1).with_field_frequencies(vec![1]),
                ],
            )
            .unwrap();
        builder
            .push_term(b"yak", vec![Posting::new(6, 1).with_field_frequencies(vec![0])])
            .unwrap();
        builder.build().spill_to_file(&path).unwrap();

        let brief = inspect(&path, false, false).unwrap();
        assert_eq!(brief.run_index, 3);
        assert_eq!((brief.first_doc, brief.last_doc), (4, 8));
        assert_eq!(brief.posting_count, 3);
        assert!(brief.terms.is_empty());

        let full = inspect(&path, true, true).unwrap();
        assert_eq!(full.terms.len(), 2);
        assert_eq!(full.terms[0].term, "owl");
        assert_eq!(full.terms[0].frequency, 3);
        assert_eq!(full.terms[0].postings.len(), 2);
        assert_eq!(full.terms[1].field_frequencies, [0]);

        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["terms"][1]["postings"][0]["doc_id"], 6);
    }
}
