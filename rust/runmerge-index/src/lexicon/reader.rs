use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use runmerge_common::{Result, error::Error, try_or_ret_some_err, verify_data};

use crate::{
    codec::{read_u8, read_u16, read_u32, read_u64},
    posting::PostingLayout,
    statistics::{Pointer, TermStatistics},
};

use super::{
    LexiconEntry,
    format::{FLAG_BLOCKS, LEXICON_MAGIC, LEXICON_VERSION, TAG_ENTRY, TAG_TRAILER},
};

/// Iterates the entries of a lexicon file.
///
/// The trailer is checked once the last entry is read: a lexicon without one, or
/// with a count different from the number of entries, yields an `InvalidFormat`
/// error.
pub struct LexiconReader<R: Read> {
    reader: R,
    layout: PostingLayout,
    entries_read: u64,
    done: bool,
}

impl LexiconReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<LexiconReader<BufReader<File>>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        LexiconReader::new(BufReader::new(file))
    }
}

impl<R: Read> LexiconReader<R> {
    pub fn new(mut reader: R) -> Result<LexiconReader<R>> {
        let magic = read_u32(&mut reader)?;
        verify_data!(magic, magic == LEXICON_MAGIC);
        let version = read_u16(&mut reader)?;
        verify_data!(version, version == LEXICON_VERSION);
        let field_count = read_u16(&mut reader)?;
        let flags = read_u16(&mut reader)?;
        verify_data!(flags, flags & !FLAG_BLOCKS == 0);
        Ok(LexiconReader {
            reader,
            layout: PostingLayout {
                field_count,
                blocks: flags & FLAG_BLOCKS != 0,
            },
            entries_read: 0,
            done: false,
        })
    }

    /// Posting layout of the index the lexicon belongs to.
    pub fn layout(&self) -> PostingLayout {
        self.layout
    }

    fn read_entry(&mut self) -> Result<Option<LexiconEntry>> {
        let tag = read_u8(&mut self.reader).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::invalid_format("lexicon", "missing trailer")
            } else {
                e.into()
            }
        })?;
        match tag {
            TAG_ENTRY => {}
            TAG_TRAILER => {
                let count = read_u64(&mut self.reader)?;
                if count != self.entries_read {
                    return Err(Error::invalid_format(
                        "lexicon",
                        format!("trailer counts {count} entries, read {}", self.entries_read),
                    ));
                }
                return Ok(None);
            }
            tag => {
                return Err(Error::invalid_format(
                    "lexicon",
                    format!("unknown entry tag {tag:#x}"),
                ));
            }
        }

        let term_len = read_u16(&mut self.reader)? as usize;
        let mut term = vec![0u8; term_len];
        self.reader.read_exact(&mut term)?;
        let term_id = read_u32(&mut self.reader)?;
        let document_frequency = read_u32(&mut self.reader)?;
        let frequency = read_u64(&mut self.reader)?;
        let field_frequencies = (0..self.layout.field_count)
            .map(|_| read_u64(&mut self.reader))
            .collect::<std::io::Result<Vec<_>>>()?;
        let byte_offset = read_u64(&mut self.reader)?;
        let bit_offset = read_u8(&mut self.reader)?;
        verify_data!(bit_offset, bit_offset < 8);

        self.entries_read += 1;
        Ok(Some(LexiconEntry {
            term,
            statistics: TermStatistics {
                document_frequency,
                frequency,
                field_frequencies,
                term_id: Some(term_id),
                pointer: Some(Pointer::new(byte_offset, bit_offset)),
            },
        }))
    }
}

impl<R: Read> Iterator for LexiconReader<R> {
    type Item = Result<LexiconEntry>;

    fn next(&mut self) -> Option<Result<LexiconEntry>> {
        if self.done {
            return None;
        }
        let entry = self.read_entry();
        if !matches!(entry, Ok(Some(_))) {
            self.done = true;
        }
        try_or_ret_some_err!(entry).map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use crate::lexicon::{DictionaryWriter, LexiconWriter};

    use super::*;

    fn statistics(id: u32, df: u32, fields: Vec<u64>, pointer: Pointer) -> TermStatistics {
        let mut statistics = TermStatistics::new(df, df as u64 * 2).with_field_frequencies(fields);
        statistics.term_id = Some(id);
        statistics.pointer = Some(pointer);
        statistics
    }

    fn write_lexicon(entries: &[(&[u8], TermStatistics)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = LexiconWriter::with_capacity(8, &mut out, PostingLayout::with_fields(1).with_blocks());
        for (term, stats) in entries {
            writer.write_entry(term, stats).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), entries.len() as u64);
        drop(writer);
        out
    }

    #[test]
    fn test_lexicon_read_back() {
        let entries: Vec<(&[u8], TermStatistics)> = vec![
            (&b""[..], statistics(0, 1, vec![1], Pointer::new(0, 0))),
            (&b"apple"[..], statistics(1, 3, vec![6], Pointer::new(0, 5))),
            (&b"\xffraw"[..], statistics(2, 2, vec![0], Pointer::new(77, 7))),
        ];
        let bytes = write_lexicon(&entries);
        let reader = LexiconReader::new(bytes.as_slice()).unwrap();
        assert_eq!(reader.layout(), PostingLayout::with_fields(1).with_blocks());
        let read = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(read.len(), 3);
        for (entry, (term, stats)) in read.iter().zip(&entries) {
            assert_eq!(entry.term, *term);
            assert_eq!(&entry.statistics, stats);
        }
        assert_eq!(read[1].term_as_str(), "apple");
    }

    #[test]
    fn test_writer_rejects_out_of_order_entries() {
        let mut out = Vec::new();
        let mut writer = LexiconWriter::new(&mut out, PostingLayout::basic());
        writer
            .write_entry(b"b", &statistics(0, 1, vec![], Pointer::default()))
            .unwrap();
        let err = writer
            .write_entry(b"a", &statistics(1, 1, vec![], Pointer::default()))
            .unwrap_err();
        assert!(err.is_invariant_violation());
        let err = writer
            .write_entry(b"c", &statistics(5, 1, vec![], Pointer::default()))
            .unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(writer.write_entry(b"d", &TermStatistics::new(1, 1)).is_err());
        assert_eq!(writer.entry_count(), 1);
    }

    #[test]
    fn test_missing_or_wrong_trailer() {
        let entries: Vec<(&[u8], TermStatistics)> =
            vec![(&b"x"[..], statistics(0, 1, vec![2], Pointer::new(1, 1)))];
        let bytes = write_lexicon(&entries);

        let truncated = &bytes[..bytes.len() - 9];
        let mut reader = LexiconReader::new(truncated).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());

        let mut wrong_count = bytes.clone();
        let len = wrong_count.len();
        wrong_count[len - 8] = 2;
        let results = LexiconReader::new(wrong_count.as_slice())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }
}
