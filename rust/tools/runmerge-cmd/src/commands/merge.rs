//! Merge command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use runmerge_index::{
    BitPostingWriter, LexiconWriter, MergeProgress, RunsMerger, run::RunFileFactory,
};
use runmerge_io::FileWriter;

use crate::utils;

pub struct MergeArgs {
    pub runs: Vec<PathBuf>,
    pub inverted: PathBuf,
    pub lexicon: PathBuf,
    pub config: Option<PathBuf>,
    pub no_verify_ranges: bool,
    pub progress_interval: Option<u64>,
}

/// Run the merge command
pub fn run(args: MergeArgs) -> Result<()> {
    let progress = merge(&args)?;
    let inverted_size = std::fs::metadata(&args.inverted)
        .map(|m| m.len())
        .unwrap_or_default();
    println!("Merged {} runs", args.runs.len());
    println!("  Terms:          {}", progress.terms);
    println!("  Postings:       {}", progress.postings);
    println!(
        "  Inverted file:  {} ({})",
        args.inverted.display(),
        utils::format_size(inverted_size)
    );
    println!("  Lexicon:        {}", args.lexicon.display());
    Ok(())
}

fn merge(args: &MergeArgs) -> Result<MergeProgress> {
    let mut options = utils::load_options(args.config.as_deref())?;
    if args.no_verify_ranges {
        options.verify_doc_ranges = false;
    }
    if let Some(interval) = args.progress_interval {
        options.progress_interval = interval;
    }
    for path in &args.runs {
        utils::validate_file_exists(path)?;
    }

    let mut factory = RunFileFactory::new(args.runs.clone(), &options);
    let layout = factory
        .probe_layout()
        .with_context(|| "Failed to read the layout of the first run")?;
    log::info!(
        "merging {} runs with {} fields{}",
        factory.run_count(),
        layout.field_count,
        if layout.blocks { " and blocks" } else { "" }
    );

    let inverted = FileWriter::create_with_capacity(&args.inverted, options.write_buffer_size)
        .with_context(|| format!("Failed to create {}", args.inverted.display()))?;
    let lexicon = FileWriter::create_with_capacity(&args.lexicon, options.write_buffer_size)
        .with_context(|| format!("Failed to create {}", args.lexicon.display()))?;
    let sink = BitPostingWriter::with_capacity(options.write_buffer_size, inverted, layout);
    let mut lexicon = LexiconWriter::with_capacity(options.write_buffer_size, lexicon, layout);

    let mut merger = RunsMerger::begin(factory.run_count(), &mut factory, sink)
        .with_context(|| "Failed to open runs")?
        .with_progress_interval(options.progress_interval);
    while !merger.is_done() {
        merger.merge_one(&mut lexicon).with_context(|| {
            format!(
                "Merge failed after {} terms at offset {}",
                merger.terms_written(),
                merger.position()
            )
        })?;
    }
    let progress = merger.end().with_context(|| "Failed to close the inverted file")?;
    lexicon
        .finish()
        .with_context(|| "Failed to finish the lexicon")?;
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use runmerge_index::{LexiconReader, Posting, PostingLayout, run::MemoryRun};

    use super::*;

    #[test]
    fn test_merge_command_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut runs = Vec::new();
        for (run_index, terms) in [
            (0, vec![("cat", vec![1, 5]), ("dog", vec![2])]),
            (1, vec![("cat", vec![9])]),
        ] {
            let mut builder = MemoryRun::builder(run_index, PostingLayout::basic());
            for (term, docs) in terms {
                let postings = docs.into_iter().map(|d| Posting::new(d, 1)).collect();
                builder.push_term(term.as_bytes(), postings).unwrap();
            }
            let path = dir.path().join(format!("{run_index}.run"));
            builder.build().spill_to_file(&path).unwrap();
            runs.push(path);
        }

        let args = MergeArgs {
            runs,
            inverted: dir.path().join("out.inv"),
            lexicon: dir.path().join("out.lex"),
            config: None,
            no_verify_ranges: false,
            progress_interval: Some(1),
        };
        let progress = merge(&args).unwrap();
        assert_eq!(progress, MergeProgress { terms: 2, postings: 4 });

        let terms = LexiconReader::open(&args.lexicon)
            .unwrap()
            .map(|entry| entry.unwrap().term)
            .collect::<Vec<_>>();
        assert_eq!(terms, [b"cat".to_vec(), b"dog".to_vec()]);

        // outputs are never overwritten
        assert!(merge(&args).is_err());
    }
}
