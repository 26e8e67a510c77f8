//! Dump-lexicon command implementation

use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use runmerge_index::{LexiconEntry, LexiconReader, PostingLayout, inverted::read_postings};

use crate::utils;

/// Run the dump-lexicon command
pub fn run(lexicon_path: PathBuf, inverted: Option<PathBuf>) -> Result<()> {
    utils::validate_file_exists(&lexicon_path)?;
    for line in dump(&lexicon_path, inverted.as_deref())? {
        println!("{line}");
    }
    Ok(())
}

fn dump(lexicon_path: &Path, inverted: Option<&Path>) -> Result<Vec<String>> {
    let reader = LexiconReader::open(lexicon_path)
        .with_context(|| format!("Failed to open lexicon {}", lexicon_path.display()))?;
    let layout = reader.layout();
    let data = inverted
        .map(|path| {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    let mut lines = Vec::new();
    for entry in reader {
        let entry = entry.with_context(|| "Corrupt lexicon entry")?;
        let mut line = format_entry(&entry);
        if let Some(data) = &data {
            append_postings(&mut line, data, &entry, layout)?;
        }
        lines.push(line);
    }
    Ok(lines)
}

fn format_entry(entry: &LexiconEntry) -> String {
    let statistics = &entry.statistics;
    let mut line = format!(
        "{}\t{}\tdf={}\tfreq={}",
        statistics.term_id.unwrap_or_default(),
        utils::display_term(&entry.term),
        statistics.document_frequency,
        statistics.frequency
    );
    if !statistics.field_frequencies.is_empty() {
        let _ = write!(line, "\tfields={:?}", statistics.field_frequencies);
    }
    if let Some(pointer) = statistics.pointer {
        let _ = write!(line, "\t@{pointer}");
    }
    line
}

fn append_postings(
    line: &mut String,
    data: &[u8],
    entry: &LexiconEntry,
    layout: PostingLayout,
) -> Result<()> {
    let pointer = entry.statistics.pointer.unwrap_or_default();
    let postings = read_postings(data, pointer, entry.statistics.document_frequency, layout)
        .with_context(|| format!("Failed to decode postings of '{}'", entry.term_as_str()))?;
    line.push('\t');
    for (i, posting) in postings.iter().enumerate() {
        if i != 0 {
            line.push(' ');
        }
        let _ = write!(line, "{}:{}", posting.doc_id, posting.frequency);
        if !posting.blocks.is_empty() {
            let _ = write!(line, "{:?}", posting.blocks);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use runmerge_index::{
        BitPostingWriter, DictionaryWriter, LexiconWriter, Posting, PostingSink, TermStatistics,
        posting::SlicePostings,
    };
    use runmerge_io::FileWriter;

    use super::*;

    #[test]
    fn test_dump_with_postings() {
        let dir = tempfile::tempdir().unwrap();
        let inverted_path = dir.path().join("x.inv");
        let lexicon_path = dir.path().join("x.lex");
        let layout = PostingLayout::basic().with_blocks();

        let mut sink = BitPostingWriter::new(FileWriter::create(&inverted_path).unwrap(), layout);
        let mut lexicon = LexiconWriter::new(FileWriter::create(&lexicon_path).unwrap(), layout);
        let lists = [
            (b"ant", vec![Posting::new(2, 2).with_blocks(vec![0, 7])]),
            (
                b"bee",
                vec![
                    Posting::new(1, 1).with_blocks(vec![3]),
                    Posting::new(4, 1).with_blocks(vec![1]),
                ],
            ),
        ];
        for (id, (term, postings)) in lists.iter().enumerate() {
            let pointer = sink
                .write_postings(&mut SlicePostings::new(postings))
                .unwrap();
            let mut statistics = TermStatistics::from_postings(layout, postings);
            statistics.term_id = Some(id as u32);
            statistics.pointer = Some(pointer);
            lexicon.write_entry(*term, &statistics).unwrap();
        }
        sink.close().unwrap();
        lexicon.finish().unwrap();

        let lines = dump(&lexicon_path, Some(&inverted_path)).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0\tant\tdf=1\tfreq=2"), "{}", lines[0]);
        assert!(lines[0].ends_with("\t2:2[0, 7]"), "{}", lines[0]);
        assert!(lines[1].ends_with("\t1:1[3] 4:1[1]"), "{}", lines[1]);

        let brief = dump(&lexicon_path, None).unwrap();
        assert!(brief[1].starts_with("1\tbee\tdf=2"));
        // the first list takes 15 bits
        assert!(brief[1].ends_with("\t@1@7"), "{}", brief[1]);
    }
}
