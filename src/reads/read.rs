//! Module for representing aligned reads as per-position pairs extracted from alignment records.
//!

use super::cigar::{aligned_pairs, AlignOp, AlignedPair, CigarOp};
use rust_htslib::bam;

/// Quality reported by BAM for a record without a quality string.
const MISSING_QUALITY: u8 = 0xff;

/// Represents a single read from an alignment record.
#[derive(PartialEq, Clone)]
pub struct AlignedRead {
    /// Query name of the read.
    pub id: String,
    /// Upper-cased bases of the read, soft clips included.
    pub bases: Vec<u8>,
    /// Per-base quality scores, parallel to `bases`.
    pub quals: Vec<u8>,
    /// (query offset, reference offset) correspondences in alignment order.
    pub pairs: Vec<AlignedPair>,
    /// Operation for each element of `pairs`.
    pub ops: Vec<AlignOp>,
}

impl std::fmt::Debug for AlignedRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Read")
            .field("id", &self.id)
            .field("bases", &String::from_utf8_lossy(&self.bases))
            .field("pairs", &self.pairs.len())
            .finish()
    }
}

impl AlignedRead {
    /// Builds a read from its bases, qualities, alignment start and CIGAR operations.
    pub fn new(
        id: impl Into<String>,
        bases: &[u8],
        quals: &[u8],
        ref_start: i64,
        cigar: &[CigarOp],
    ) -> AlignedRead {
        let (pairs, ops) = aligned_pairs(ref_start, cigar);
        let quals = if quals.iter().all(|&q| q == MISSING_QUALITY) {
            vec![1; bases.len()]
        } else {
            quals.to_vec()
        };
        AlignedRead {
            id: id.into(),
            bases: bases.to_ascii_uppercase(),
            quals,
            pairs,
            ops,
        }
    }

    /// Creates an `AlignedRead` from an HTSlib record.
    ///
    /// A record without a quality string gets a quality of 1 for every base.
    pub fn from_hts_rec(rec: &bam::Record) -> AlignedRead {
        let id = String::from_utf8_lossy(rec.qname()).into_owned();
        let bases = rec.seq().as_bytes();
        let cigar = rec.cigar().take();
        Self::new(id, &bases, rec.qual(), rec.pos(), &cigar)
    }

    /// Replaces every quality score by 1.
    pub fn ignore_quality(&mut self) {
        self.quals.iter_mut().for_each(|q| *q = 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::CigarString;

    #[test]
    fn read_from_hts_record() {
        let mut rec = bam::Record::new();
        let cigar = CigarString(vec![
            CigarOp::SoftClip(1),
            CigarOp::Match(3),
            CigarOp::Del(1),
            CigarOp::Match(1),
        ]);
        rec.set(b"read1", Some(&cigar), b"tACGT", &[10, 20, 30, 40, 50]);
        rec.set_pos(7);

        let read = AlignedRead::from_hts_rec(&rec);
        assert_eq!(read.id, "read1");
        assert_eq!(read.bases, b"TACGT");
        assert_eq!(read.quals, vec![10, 20, 30, 40, 50]);
        assert_eq!(read.pairs.len(), 6);
        assert_eq!(read.pairs[1], AlignedPair::new(Some(1), Some(7)));
        assert_eq!(read.pairs[4], AlignedPair::new(None, Some(10)));
        assert_eq!(read.ops[4], AlignOp::Del);
    }

    #[test]
    fn missing_qualities_become_one() {
        let read = AlignedRead::new("r", b"AC", &[0xff, 0xff], 0, &[CigarOp::Match(2)]);
        assert_eq!(read.quals, vec![1, 1]);
    }

    #[test]
    fn ignore_quality_flattens_scores() {
        let mut read = AlignedRead::new("r", b"AC", &[30, 40], 0, &[CigarOp::Match(2)]);
        read.ignore_quality();
        assert_eq!(read.quals, vec![1, 1]);
    }
}
