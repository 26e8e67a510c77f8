//! Cursors over run files.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use runmerge_common::{
    Result, ensure_invariant,
    error::{Error, ErrorKind},
};

use crate::{
    cursor::{RunCursor, RunCursorFactory, RunEntry},
    options::MergeOptions,
    posting::{Posting, PostingLayout, PostingSource, SlicePostings},
    statistics::TermStatistics,
};

use super::format::{self, RunHeader};

/// Streaming cursor over a serialized run.
///
/// Term headers are decoded on `advance()`; postings are decoded on demand
/// straight from the buffered reader, and any postings left unread when the
/// cursor advances are skipped using the term's recorded byte length.
pub struct RunFileCursor {
    /// `None` once the cursor is closed.
    reader: Option<BufReader<Box<dyn Read>>>,
    header: RunHeader,
    /// Source description for error context.
    source: String,
    term: Vec<u8>,
    /// Scratch buffer for the next term, swapped with `term` after the order check.
    next_term: Vec<u8>,
    statistics: TermStatistics,
    positioned: bool,
    remaining_terms: u32,
    /// Postings of the current term not yet decoded.
    pending_postings: u32,
    /// Bytes of the current term's postings not yet consumed.
    pending_bytes: u64,
}

impl RunFileCursor {
    /// Reads the run header from `reader` and positions the cursor before the
    /// first term.
    pub fn new(
        reader: Box<dyn Read>,
        buffer_size: usize,
        source: impl Into<String>,
    ) -> Result<RunFileCursor> {
        let source = source.into();
        let mut reader = BufReader::with_capacity(buffer_size.max(1), reader);
        let header = RunHeader::decode(&mut reader).map_err(|e| with_context(&source, e))?;
        Ok(RunFileCursor {
            reader: Some(reader),
            header,
            source,
            term: Vec::new(),
            next_term: Vec::new(),
            statistics: TermStatistics::default(),
            positioned: false,
            remaining_terms: header.term_count,
            pending_postings: 0,
            pending_bytes: 0,
        })
    }

    pub fn open(path: impl AsRef<Path>, buffer_size: usize) -> Result<RunFileCursor> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::io(source.clone(), e))?;
        RunFileCursor::new(Box::new(file), buffer_size, source)
    }

    pub fn header(&self) -> &RunHeader {
        &self.header
    }

    pub fn layout(&self) -> PostingLayout {
        self.header.layout
    }

    fn advance_impl(&mut self) -> Result<()> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(Error::invalid_operation("advance on a closed run cursor"));
        };
        if self.remaining_terms == 0 {
            return Err(Error::invalid_operation(format!(
                "advance past the end of run {}",
                self.header.run_index
            )));
        }

        if self.pending_bytes != 0 {
            let skipped = std::io::copy(
                &mut reader.by_ref().take(self.pending_bytes),
                &mut std::io::sink(),
            )?;
            if skipped != self.pending_bytes {
                return Err(Error::invalid_format(
                    "run",
                    format!("truncated postings of term {}", self.term.escape_ascii()),
                ));
            }
        }

        let (statistics, postings_len) =
            format::decode_term_header(reader, self.header.layout, &mut self.next_term)?;
        if self.positioned && self.next_term <= self.term {
            return Err(Error::invalid_format(
                "run",
                format!(
                    "term {} does not follow {}",
                    self.next_term.escape_ascii(),
                    self.term.escape_ascii()
                ),
            ));
        }
        std::mem::swap(&mut self.term, &mut self.next_term);
        self.statistics = statistics;
        self.pending_postings = self.statistics.document_frequency;
        self.pending_bytes = postings_len;
        self.positioned = true;
        self.remaining_terms -= 1;
        Ok(())
    }
}

impl RunCursor for RunFileCursor {
    fn run_index(&self) -> usize {
        self.header.run_index as usize
    }

    fn term(&self) -> &[u8] {
        &self.term
    }

    fn statistics(&self) -> &TermStatistics {
        &self.statistics
    }

    fn current(&mut self) -> RunEntry<'_> {
        let postings: Box<dyn PostingSource + '_> = match self.reader.as_mut() {
            Some(reader) if self.positioned => Box::new(RunFilePostings {
                reader,
                layout: self.header.layout,
                run_index: self.header.run_index,
                doc_range: (self.header.first_doc, self.header.last_doc),
                last_doc: None,
                pending_postings: &mut self.pending_postings,
                pending_bytes: &mut self.pending_bytes,
            }),
            _ => Box::new(SlicePostings::new(&[])),
        };
        RunEntry {
            term: &self.term,
            statistics: &self.statistics,
            postings,
        }
    }

    fn has_next(&self) -> bool {
        self.reader.is_some() && self.remaining_terms != 0
    }

    fn advance(&mut self) -> Result<()> {
        self.advance_impl()
            .map_err(|e| with_context(&self.source, e))
    }

    fn close(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }
}

/// Postings of the current term of a [`RunFileCursor`].
struct RunFilePostings<'a> {
    reader: &'a mut BufReader<Box<dyn Read>>,
    layout: PostingLayout,
    run_index: u32,
    doc_range: (u32, u32),
    last_doc: Option<u32>,
    pending_postings: &'a mut u32,
    pending_bytes: &'a mut u64,
}

impl PostingSource for RunFilePostings<'_> {
    fn next_posting(&mut self) -> Result<Option<Posting>> {
        if *self.pending_postings == 0 {
            return Ok(None);
        }
        let (posting, size) = format::decode_posting(&mut *self.reader, self.layout)?;
        if size > *self.pending_bytes {
            return Err(Error::invalid_format(
                "run",
                format!("postings overrun their recorded length in run {}", self.run_index),
            ));
        }
        *self.pending_bytes -= size;
        *self.pending_postings -= 1;

        let (first, last) = self.doc_range;
        ensure_invariant!(
            posting.doc_id >= first && posting.doc_id <= last,
            "document {} lies outside the range {first}..={last} of run {}",
            posting.doc_id,
            self.run_index
        );
        if let Some(prev) = self.last_doc {
            ensure_invariant!(
                posting.doc_id > prev,
                "document {} follows document {prev} in run {}",
                posting.doc_id,
                self.run_index
            );
        }
        self.last_doc = Some(posting.doc_id);
        Ok(Some(posting))
    }
}

fn with_context(source: &str, e: Error) -> Error {
    match e.into_kind() {
        ErrorKind::Io { context, source: io } if context.is_empty() => {
            Error::io(source, io)
        }
        kind => kind.into(),
    }
}

/// Reads only the header of the run file at `path`.
pub fn read_run_header(path: impl AsRef<Path>) -> Result<RunHeader> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    RunHeader::decode(&mut file).map_err(|e| with_context(&path.display().to_string(), e))
}

/// Opens run files given in creation order.
///
/// Besides opening, the factory checks the contract the merge relies on: the run
/// at position `i` must record run index `i`, all runs share one posting layout,
/// and (when enabled) non-empty runs cover strictly ascending, non-overlapping
/// document ranges.
pub struct RunFileFactory {
    paths: Vec<PathBuf>,
    buffer_size: usize,
    verify_doc_ranges: bool,
    layout: Option<PostingLayout>,
    /// Last document id of the most recently opened non-empty run.
    last_doc: Option<(usize, u32)>,
}

impl RunFileFactory {
    pub fn new(paths: Vec<PathBuf>, options: &MergeOptions) -> RunFileFactory {
        RunFileFactory {
            paths,
            buffer_size: options.read_buffer_size,
            verify_doc_ranges: options.verify_doc_ranges,
            layout: None,
            last_doc: None,
        }
    }

    pub fn run_count(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Posting layout of the runs, read from the first run's header.
    pub fn probe_layout(&self) -> Result<PostingLayout> {
        let Some(first) = self.paths.first() else {
            return Err(Error::invalid_arg("runs", "no run files given"));
        };
        Ok(read_run_header(first)?.layout)
    }
}

impl RunCursorFactory for RunFileFactory {
    type Cursor = RunFileCursor;

    fn open_run(&mut self, run_index: usize) -> Result<RunFileCursor> {
        let path = self.paths.get(run_index).ok_or_else(|| {
            Error::invalid_arg(
                "run_index",
                format!("{run_index} out of {} runs", self.paths.len()),
            )
        })?;
        log::debug!("opening run {run_index} from {}", path.display());
        let cursor = RunFileCursor::open(path, self.buffer_size)?;
        let header = *cursor.header();

        ensure_invariant!(
            header.run_index as usize == run_index,
            "{} holds run {}, expected run {run_index}",
            path.display(),
            header.run_index
        );
        match self.layout {
            Some(layout) if layout != header.layout => {
                return Err(Error::invalid_format(
                    path.display().to_string(),
                    format!("layout {:?} differs from {layout:?}", header.layout),
                ));
            }
            Some(_) => {}
            None => self.layout = Some(header.layout),
        }
        if !header.is_empty() {
            if let Some((prev_run, prev_last)) = self.last_doc {
                if self.verify_doc_ranges {
                    ensure_invariant!(
                        header.first_doc > prev_last,
                        "run {run_index} starts at document {} but run {prev_run} ends at {prev_last}",
                        header.first_doc
                    );
                }
            }
            self.last_doc = Some((run_index, header.last_doc));
        }
        Ok(cursor)
    }
}
