//! Accumulation of per-read alignment evidence into offset-keyed tallies.
use super::{bases::Bases, insertion::Insertion};
use crate::reads::{resolve_offsets, AlignOp, AlignedRead};
use std::collections::BTreeMap;

/// Evidence gathered from all reads aligned to one reference.
///
/// Offsets are reference offsets and may fall outside the reference when
/// soft-clipped bases are included.
#[derive(Debug, Default)]
pub struct Evidence {
    /// Bases observed at each reference offset.
    pub correspondences: BTreeMap<i64, Bases>,
    /// Number of reads deleting each reference offset.
    pub deletions: BTreeMap<i64, usize>,
    /// Inserted bases keyed by the offset they precede.
    pub insertions: BTreeMap<i64, Insertion>,
    /// Number of reads walked.
    pub read_count: usize,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    fn bases_mut(&mut self, offset: i64) -> &mut Bases {
        self.correspondences.entry(offset).or_default()
    }

    fn insertion_mut(&mut self, offset: i64) -> &mut Insertion {
        self.insertions
            .entry(offset)
            .or_insert_with(|| Insertion::new(offset))
    }

    /// Routes every aligned position of `read` to the matching tally.
    ///
    /// # Panics
    /// If the pairs and operations of the read disagree: different lengths, a
    /// pair without either offset, a read that starts with an insertion, or a
    /// missing query offset on anything but a deletion.
    pub fn add_read(&mut self, read: &AlignedRead, include_soft_clipped: bool) {
        let pairs = &read.pairs;
        let ops = &read.ops;
        assert_eq!(
            pairs.len(),
            ops.len(),
            "Read {} has {} aligned pairs but {} operations",
            read.id,
            pairs.len(),
            ops.len()
        );
        if let (Some(pair), Some(op)) = (pairs.first(), ops.first()) {
            assert!(
                pair.reference.is_some() || *op == AlignOp::SoftClip,
                "Read {} starts with an unanchored {:?}",
                read.id,
                op
            );
        }

        self.read_count += 1;
        let offsets = resolve_offsets(pairs, ops);
        // Offset of the insertion the previous position contributed to.
        let mut open_insertion: Option<i64> = None;

        for (index, (pair, op)) in pairs.iter().zip(ops).enumerate() {
            let query = match (pair.query, pair.reference) {
                (None, None) => panic!("Read {} has an empty pair at {}", read.id, index),
                (None, Some(reference)) => {
                    assert_eq!(
                        *op,
                        AlignOp::Del,
                        "Read {} has no query base at {} for a {:?}",
                        read.id,
                        index,
                        op
                    );
                    *self.deletions.entry(reference).or_insert(0) += 1;
                    open_insertion = None;
                    continue;
                }
                (Some(query), _) => query,
            };

            let base = read.bases[query];
            let quality = read.quals[query] as u32;

            match (pair.reference, op) {
                (Some(reference), _) => {
                    self.bases_mut(reference).append(base, quality);
                    open_insertion = None;
                }
                (None, AlignOp::Ins) => {
                    let (anchored, offset) = offsets[index].unwrap_or_else(|| {
                        panic!("Insertion at {} of read {} has no anchor", index, read.id)
                    });
                    let insertion = self.insertion_mut(offset);
                    if open_insertion != Some(offset) {
                        insertion.start(anchored.then_some(offset));
                        open_insertion = Some(offset);
                    }
                    insertion.append(base, quality);
                }
                (None, AlignOp::SoftClip) => {
                    // Clips of a read without aligned positions have nowhere to go.
                    if let (true, Some((_, offset))) = (include_soft_clipped, offsets[index]) {
                        self.bases_mut(offset).append(base, quality);
                    }
                    open_insertion = None;
                }
                (None, _) => {
                    open_insertion = None;
                }
            }
        }

        log::trace!(
            "Read {}: {} correspondences, {} deletions, {} insertions so far",
            read.id,
            self.correspondences.len(),
            self.deletions.len(),
            self.insertions.len()
        );
    }

    /// Number of reads with a base (not a deletion) at `offset`.
    pub fn coverage(&self, offset: i64) -> usize {
        self.correspondences.get(&offset).map_or(0, Bases::len)
    }
}
