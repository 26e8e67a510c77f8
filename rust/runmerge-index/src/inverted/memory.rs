use runmerge_common::{Result, error::Error};

use crate::{
    posting::{Posting, PostingSource},
    statistics::Pointer,
};

use super::{DocOrder, PostingSink};

/// Posting sink that keeps every list in memory.
///
/// The pointer of a list is its index in write order (as the byte offset, with a
/// zero bit offset).
#[derive(Debug, Default)]
pub struct MemoryPostingSink {
    lists: Vec<Vec<Posting>>,
    closed: bool,
}

impl MemoryPostingSink {
    pub fn new() -> MemoryPostingSink {
        MemoryPostingSink::default()
    }

    pub fn lists(&self) -> &[Vec<Posting>] {
        &self.lists
    }

    pub fn get(&self, pointer: Pointer) -> Option<&[Posting]> {
        if pointer.bit_offset != 0 {
            return None;
        }
        self.lists
            .get(usize::try_from(pointer.byte_offset).ok()?)
            .map(Vec::as_slice)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_lists(self) -> Vec<Vec<Posting>> {
        self.lists
    }
}

impl PostingSink for MemoryPostingSink {
    fn write_postings(&mut self, postings: &mut dyn PostingSource) -> Result<Pointer> {
        if self.closed {
            return Err(Error::invalid_operation("write to a closed posting sink"));
        }
        let mut order = DocOrder::default();
        let mut list = Vec::new();
        while let Some(posting) = postings.next_posting()? {
            order.check_next(posting.doc_id)?;
            list.push(posting);
        }
        let pointer = self.position();
        self.lists.push(list);
        Ok(pointer)
    }

    fn position(&self) -> Pointer {
        Pointer::new(self.lists.len() as u64, 0)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::posting::SlicePostings;

    use super::*;

    #[test]
    fn test_lists_are_addressed_by_index() {
        let mut sink = MemoryPostingSink::new();
        let a = [Posting::new(1, 1), Posting::new(4, 2)];
        let b = [Posting::new(2, 1)];
        let pa = sink.write_postings(&mut SlicePostings::new(&a)).unwrap();
        let pb = sink.write_postings(&mut SlicePostings::new(&b)).unwrap();
        assert_eq!(sink.get(pa).unwrap(), a);
        assert_eq!(sink.get(pb).unwrap(), b);
        assert_eq!(sink.position(), Pointer::new(2, 0));

        let unordered = [Posting::new(4, 1), Posting::new(1, 1)];
        assert!(
            sink.write_postings(&mut SlicePostings::new(&unordered))
                .unwrap_err()
                .is_invariant_violation()
        );
        assert_eq!(sink.lists().len(), 2);

        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(sink.write_postings(&mut SlicePostings::new(&b)).is_err());
    }
}
