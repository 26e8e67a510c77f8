//! Per-term statistics and the pointers that locate posting lists.

use std::fmt;

use runmerge_common::{Result, ensure_invariant, error::Error};
use runmerge_io::BitPosition;

use crate::posting::{Posting, PostingLayout};

/// Location of a written posting list in the inverted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pointer {
    pub byte_offset: u64,
    /// Bits already used within the byte at `byte_offset` (0..8).
    pub bit_offset: u8,
}

impl Pointer {
    pub fn new(byte_offset: u64, bit_offset: u8) -> Pointer {
        Pointer {
            byte_offset,
            bit_offset,
        }
    }
}

impl From<BitPosition> for Pointer {
    fn from(pos: BitPosition) -> Pointer {
        Pointer::new(pos.byte, pos.bit)
    }
}

impl From<Pointer> for BitPosition {
    fn from(pointer: Pointer) -> BitPosition {
        BitPosition {
            byte: pointer.byte_offset,
            bit: pointer.bit_offset,
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.byte_offset, self.bit_offset)
    }
}

/// Aggregate statistics of a term.
///
/// Within a run these describe the term's postings in that run only. The merge
/// combines them across runs with [`TermStatistics::combine`] and fills in the
/// assigned term id and the location of the merged posting list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermStatistics {
    /// Number of documents containing the term.
    pub document_frequency: u32,
    /// Total number of occurrences of the term.
    pub frequency: u64,
    /// Total occurrences per field; empty unless the layout has fields.
    pub field_frequencies: Vec<u64>,
    pub term_id: Option<u32>,
    pub pointer: Option<Pointer>,
}

impl TermStatistics {
    pub fn new(document_frequency: u32, frequency: u64) -> TermStatistics {
        TermStatistics {
            document_frequency,
            frequency,
            ..Default::default()
        }
    }

    pub fn with_field_frequencies(mut self, field_frequencies: Vec<u64>) -> TermStatistics {
        self.field_frequencies = field_frequencies;
        self
    }

    /// Computes the statistics of a posting list.
    pub fn from_postings(layout: PostingLayout, postings: &[Posting]) -> TermStatistics {
        let mut field_frequencies = vec![0u64; layout.field_count as usize];
        let mut frequency = 0u64;
        for posting in postings {
            frequency += posting.frequency as u64;
            for (total, &f) in field_frequencies
                .iter_mut()
                .zip(posting.field_frequencies.iter())
            {
                *total += f as u64;
            }
        }
        TermStatistics {
            document_frequency: postings.len() as u32,
            frequency,
            field_frequencies,
            term_id: None,
            pointer: None,
        }
    }

    /// Adds the statistics of the same term from a later run.
    ///
    /// Frequencies are summed; the field structure must be identical on both sides.
    /// The term id and pointer of `self` are left untouched.
    pub fn combine(&mut self, other: &TermStatistics) -> Result<()> {
        ensure_invariant!(
            self.field_frequencies.len() == other.field_frequencies.len(),
            "cannot combine statistics with {} and {} fields",
            self.field_frequencies.len(),
            other.field_frequencies.len()
        );
        let Some(document_frequency) = self
            .document_frequency
            .checked_add(other.document_frequency)
        else {
            return Err(Error::invariant("document frequency overflow"));
        };
        self.document_frequency = document_frequency;
        self.frequency += other.frequency;
        for (total, &f) in self
            .field_frequencies
            .iter_mut()
            .zip(other.field_frequencies.iter())
        {
            *total += f;
        }
        Ok(())
    }

    /// Copy of the run-local statistics without merge assignments.
    pub fn detached(&self) -> TermStatistics {
        TermStatistics {
            term_id: None,
            pointer: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_sums_frequencies() {
        let mut a = TermStatistics::new(2, 3).with_field_frequencies(vec![1, 2]);
        a.term_id = Some(7);
        let b = TermStatistics::new(1, 4).with_field_frequencies(vec![4, 0]);
        a.combine(&b).unwrap();
        assert_eq!(a.document_frequency, 3);
        assert_eq!(a.frequency, 7);
        assert_eq!(a.field_frequencies, [5, 2]);
        assert_eq!(a.term_id, Some(7));
    }

    #[test]
    fn test_combine_rejects_mismatched_fields() {
        let mut a = TermStatistics::new(1, 1).with_field_frequencies(vec![1]);
        let b = TermStatistics::new(1, 1);
        assert!(a.combine(&b).unwrap_err().is_invariant_violation());
    }

    #[test]
    fn test_from_postings() {
        let layout = PostingLayout::with_fields(2);
        let postings = vec![
            Posting::new(1, 3).with_field_frequencies(vec![2, 1]),
            Posting::new(4, 1).with_field_frequencies(vec![0, 1]),
        ];
        let stats = TermStatistics::from_postings(layout, &postings);
        assert_eq!(stats.document_frequency, 2);
        assert_eq!(stats.frequency, 4);
        assert_eq!(stats.field_frequencies, [2, 2]);
        assert_eq!(stats.term_id, None);
    }

    #[test]
    fn test_pointer_bit_position_conversion() {
        let p = Pointer::new(17, 5);
        let pos: BitPosition = p.into();
        assert_eq!(pos.as_bits(), 17 * 8 + 5);
        assert_eq!(Pointer::from(pos), p);
        assert_eq!(p.to_string(), "17@5");
    }
}
