use runmerge_common::{Result, error::Error, try_or_ret_some_err};
use runmerge_io::BitReader;

use crate::{
    posting::{Posting, PostingLayout},
    statistics::Pointer,
};

/// Decodes the posting list written by
/// [`BitPostingWriter`](super::BitPostingWriter) at a given pointer.
pub struct PostingReader<'a> {
    bits: BitReader<'a>,
    layout: PostingLayout,
    remaining: u32,
    last_doc: Option<u32>,
}

impl<'a> PostingReader<'a> {
    /// Reader over the `count` postings stored at `pointer` in `data`.
    pub fn new(
        data: &'a [u8],
        pointer: Pointer,
        count: u32,
        layout: PostingLayout,
    ) -> Result<PostingReader<'a>> {
        Ok(PostingReader {
            bits: BitReader::at(data, pointer.into())?,
            layout,
            remaining: count,
            last_doc: None,
        })
    }

    fn read_posting(&mut self) -> Result<Posting> {
        let gap = self.bits.read_gamma()?;
        let doc_id = match self.last_doc {
            Some(last) => last as u64 + gap,
            None => gap - 1,
        };
        let doc_id = to_u32(doc_id, "document id")?;
        let frequency = to_u32(self.bits.read_gamma()?, "frequency")?;
        let field_frequencies = (0..self.layout.field_count)
            .map(|_| to_u32(self.bits.read_gamma()? - 1, "field frequency"))
            .collect::<Result<Vec<_>>>()?;
        let mut blocks = Vec::new();
        if self.layout.blocks {
            let count = self.bits.read_gamma()? - 1;
            let mut prev: Option<u64> = None;
            for _ in 0..count {
                let gap = self.bits.read_gamma()?;
                let block = prev.map_or(gap - 1, |p| p + gap);
                blocks.push(to_u32(block, "block")?);
                prev = Some(block);
            }
        }
        self.last_doc = Some(doc_id);
        Ok(Posting {
            doc_id,
            frequency,
            field_frequencies,
            blocks,
        })
    }
}

fn to_u32(value: u64, element: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::invalid_format("posting list", format!("{element} {value} overflows")))
}

impl Iterator for PostingReader<'_> {
    type Item = Result<Posting>;

    fn next(&mut self) -> Option<Result<Posting>> {
        if self.remaining == 0 {
            return None;
        }
        let posting = try_or_ret_some_err!(self.read_posting());
        self.remaining -= 1;
        Some(Ok(posting))
    }
}

/// Reads the `count` postings stored at `pointer`.
pub fn read_postings(
    data: &[u8],
    pointer: Pointer,
    count: u32,
    layout: PostingLayout,
) -> Result<Vec<Posting>> {
    PostingReader::new(data, pointer, count, layout)?.collect()
}
