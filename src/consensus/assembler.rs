//! Turns accumulated evidence into a linear consensus sequence.
//!
//! Offsets are walked in reference order. Called insertions are emitted ahead
//! of the offset they precede and shift every later offset, so the output is
//! keyed by adjusted offsets that remember their original reference offset.
use super::{bases::Bases, evidence::Evidence, params::ConsensusParams};
use std::collections::{BTreeMap, BTreeSet};

/// Content of one adjusted offset before consensus calling.
#[derive(Debug, PartialEq)]
enum Site {
    Called(Bases),
    Deleted,
    Fixed(u8),
}

/// Offsets whose deletion count reaches `threshold` relative to the number of
/// reads with a base there. Offsets no read has a base at are always deleted.
pub fn actual_deletions(evidence: &Evidence, threshold: f64) -> BTreeSet<i64> {
    evidence
        .deletions
        .iter()
        .filter(|(&offset, &count)| {
            let coverage = evidence.coverage(offset);
            coverage == 0 || count as f64 / coverage as f64 >= threshold
        })
        .map(|(&offset, _)| offset)
        .collect()
}

/// Builds the consensus sequence from `evidence`.
///
/// The output spans at least `[0, reference_length)` and extends in either
/// direction to every offset with read evidence.
pub fn assemble(
    mut evidence: Evidence,
    reference: Option<&[u8]>,
    reference_length: usize,
    params: &ConsensusParams,
) -> String {
    let deletions = actual_deletions(&evidence, params.deletion_threshold);
    log::debug!(
        "{} of {} offsets with deletion evidence are deleted",
        deletions.len(),
        evidence.deletions.len()
    );

    let first = evidence
        .correspondences
        .keys()
        .next()
        .map_or(0, |&offset| offset.min(0));
    let last = evidence
        .correspondences
        .keys()
        .next_back()
        .map_or(reference_length as i64 - 1, |&offset| {
            offset.max(reference_length as i64 - 1)
        });

    let mut sites: BTreeMap<i64, Site> = BTreeMap::new();
    // Original reference offset of each adjusted offset; `None` for inserted positions.
    let mut origins: BTreeMap<i64, Option<i64>> = BTreeMap::new();
    let mut insert_count: i64 = 0;
    let mut called_insertions = 0;

    for offset in first..=last {
        if let Some(insertion) = evidence.insertions.remove(&offset) {
            if insertion.read_count() >= params.insertion_count_threshold {
                called_insertions += 1;
                for bases in insertion.resolve() {
                    let adjusted = offset + insert_count;
                    match sites.get_mut(&adjusted) {
                        Some(Site::Called(existing)) => existing.merge(bases),
                        _ => {
                            sites.insert(adjusted, Site::Called(bases));
                        }
                    }
                    origins.insert(adjusted, None);
                    insert_count += 1;
                }
            }
        }

        let adjusted = offset + insert_count;
        origins.insert(adjusted, Some(offset));

        let site = if deletions.contains(&offset) {
            Site::Deleted
        } else if let Some(bases) = evidence.correspondences.remove(&offset) {
            Site::Called(bases)
        } else {
            Site::Fixed(params.no_coverage.symbol(reference, Some(offset)))
        };
        sites.insert(adjusted, site);
    }

    for insertion in evidence.insertions.values() {
        log::debug!(
            "Ignoring insertion at {} from {} reads outside offsets {}..={}",
            insertion.offset(),
            insertion.read_count(),
            first,
            last
        );
    }
    log::debug!(
        "Called {} insertions adding {} bases",
        called_insertions,
        insert_count
    );

    bases_to_consensus(&sites, &origins, reference, params)
}

fn bases_to_consensus(
    sites: &BTreeMap<i64, Site>,
    origins: &BTreeMap<i64, Option<i64>>,
    reference: Option<&[u8]>,
    params: &ConsensusParams,
) -> String {
    let mut consensus = String::with_capacity(sites.len());
    for (adjusted, site) in sites {
        match site {
            Site::Deleted => consensus.push_str(&params.deletion_symbol),
            Site::Fixed(symbol) => consensus.push(*symbol as char),
            Site::Called(bases) => {
                let origin = origins.get(adjusted).copied().flatten();
                let symbol = bases.consensus(
                    params.threshold,
                    params.min_coverage,
                    params.low_coverage.symbol(reference, origin),
                    params.no_coverage.symbol(reference, origin),
                );
                consensus.push(symbol as char);
            }
        }
    }
    consensus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::CoverageFallback;
    use crate::reads::{AlignedRead, CigarOp};

    fn params() -> ConsensusParams {
        ConsensusParams {
            low_coverage: CoverageFallback::Symbol(b'N'),
            no_coverage: CoverageFallback::Symbol(b'N'),
            insertion_count_threshold: 1,
            ..Default::default()
        }
    }

    fn add(evidence: &mut Evidence, bases: &[u8], start: i64, cigar: &[CigarOp], n: usize) {
        let read = AlignedRead::new("read", bases, &vec![30; bases.len()], start, cigar);
        for _ in 0..n {
            evidence.add_read(&read, true);
        }
    }

    fn deletion_evidence(matches: usize, deletions: usize) -> Evidence {
        let mut evidence = Evidence::new();
        add(&mut evidence, b"AAA", 0, &[CigarOp::Match(3)], matches);
        add(
            &mut evidence,
            b"AA",
            0,
            &[CigarOp::Match(1), CigarOp::Del(1), CigarOp::Match(1)],
            deletions,
        );
        evidence
    }

    #[test]
    fn deletion_threshold_is_inclusive() {
        let evidence = deletion_evidence(10, 5);
        assert_eq!(evidence.coverage(1), 10);
        assert!(actual_deletions(&evidence, 0.5).contains(&1));
        assert!(!actual_deletions(&evidence, 0.51).contains(&1));
    }

    #[test]
    fn deletion_without_matching_reads_is_deleted() {
        let evidence = deletion_evidence(0, 1);
        assert_eq!(evidence.coverage(1), 0);
        assert!(actual_deletions(&evidence, 1.0).contains(&1));
    }

    #[test]
    fn deleted_offsets_use_the_deletion_symbol() {
        let evidence = deletion_evidence(1, 3);
        assert_eq!(assemble(evidence, None, 3, &params()), "A-A");

        let evidence = deletion_evidence(1, 3);
        let params = ConsensusParams {
            deletion_symbol: String::new(),
            ..params()
        };
        assert_eq!(assemble(evidence, None, 3, &params), "AA");
    }

    #[test]
    fn no_reads_gives_the_reference() {
        let reference = b"NNNNNNNNNN";
        let params = ConsensusParams {
            no_coverage: CoverageFallback::Reference,
            ..params()
        };
        assert_eq!(
            assemble(Evidence::new(), Some(reference), 10, &params),
            "NNNNNNNNNN"
        );
    }

    #[test]
    fn no_reads_without_reference_gives_the_symbol() {
        let params = ConsensusParams {
            no_coverage: CoverageFallback::Symbol(b'?'),
            ..params()
        };
        assert_eq!(assemble(Evidence::new(), None, 4, &params), "????");
    }

    #[test]
    fn uncovered_sites_fall_back_to_reference() {
        let mut evidence = Evidence::new();
        add(&mut evidence, b"TT", 2, &[CigarOp::Match(2)], 1);
        let params = ConsensusParams {
            no_coverage: CoverageFallback::Reference,
            ..params()
        };
        assert_eq!(assemble(evidence, Some(b"ACGTAC"), 6, &params), "ACTTAC");
    }

    #[test]
    fn low_coverage_uses_the_original_reference_offset() {
        let mut evidence = Evidence::new();
        add(
            &mut evidence,
            b"AGGC",
            0,
            &[CigarOp::Match(1), CigarOp::Ins(2), CigarOp::Match(1)],
            1,
        );
        add(&mut evidence, b"T", 3, &[CigarOp::Match(1)], 1);
        let params = ConsensusParams {
            min_coverage: 2,
            low_coverage: CoverageFallback::Reference,
            no_coverage: CoverageFallback::Reference,
            ..params()
        };
        // Low coverage inserted positions have no reference base.
        assert_eq!(assemble(evidence, Some(b"ACGT"), 4, &params), "ANNCGT");
    }

    #[test]
    fn called_insertion_shifts_later_offsets() {
        let mut evidence = Evidence::new();
        add(
            &mut evidence,
            b"ACTTGT",
            0,
            &[CigarOp::Match(2), CigarOp::Ins(2), CigarOp::Match(2)],
            5,
        );
        let threshold_met = ConsensusParams {
            insertion_count_threshold: 5,
            ..params()
        };
        assert_eq!(assemble(evidence, None, 4, &threshold_met), "ACTTGT");
    }

    #[test]
    fn insertion_below_count_threshold_is_dropped() {
        let mut evidence = Evidence::new();
        add(
            &mut evidence,
            b"ACTTGT",
            0,
            &[CigarOp::Match(2), CigarOp::Ins(2), CigarOp::Match(2)],
            4,
        );
        let params = ConsensusParams {
            insertion_count_threshold: 5,
            ..params()
        };
        assert_eq!(assemble(evidence, None, 4, &params), "ACGT");
    }

    #[test]
    fn reads_past_reference_ends_extend_the_output() {
        let mut evidence = Evidence::new();
        add(
            &mut evidence,
            b"GGACGTCC",
            0,
            &[CigarOp::SoftClip(2), CigarOp::Match(4), CigarOp::SoftClip(2)],
            1,
        );
        let consensus = assemble(evidence, Some(b"ACGT"), 4, &params());
        assert_eq!(consensus, "GGACGTCC");
        assert_eq!(consensus.len(), 4 + 2 + 2);
    }

    #[test]
    fn full_length_read_is_reproduced() {
        let mut evidence = Evidence::new();
        add(&mut evidence, b"ACGTTGCA", 0, &[CigarOp::Match(8)], 1);
        assert_eq!(assemble(evidence, None, 8, &params()), "ACGTTGCA");
    }

    #[test]
    fn insertion_past_the_last_offset_is_dropped() {
        let mut evidence = Evidence::new();
        add(
            &mut evidence,
            b"ACGTTT",
            0,
            &[CigarOp::Match(4), CigarOp::Ins(2)],
            3,
        );
        assert_eq!(evidence.insertions[&4].offset(), 4);
        assert_eq!(assemble(evidence, None, 4, &params()), "ACGT");
    }
}
