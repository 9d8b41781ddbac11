//! Column-wise re-collection of per-offset evidence for validating the read walk.
//!
//! The report lists every reference offset where the bases seen by the htslib
//! pileup engine differ from those gathered read by read. It is a diagnostic
//! and has no influence on the consensus.
use super::{evidence::Evidence, params::ConsensusParams, ConsensusError, ReadFilter};
use crate::utils::BamReference;
use itertools::Itertools;
use rust_htslib::bam::{self, FetchDefinition, Read};
use std::{collections::BTreeSet, io::Write};

const MISSING_QUALITY: u8 = 0xff;

fn format_calls(calls: &[(u8, u32)]) -> String {
    if calls.is_empty() {
        return ".".to_string();
    }
    calls
        .iter()
        .map(|(base, quality)| format!("{}{}", *base as char, quality))
        .join(",")
}

/// Compares pileup columns of `target` with the correspondences in `evidence`
/// and writes one line per differing offset to `out`.
///
/// Returns the number of differing offsets.
pub fn write_pileup_report<W: Write>(
    bam: &mut bam::IndexedReader,
    target: &BamReference,
    evidence: &Evidence,
    params: &ConsensusParams,
    filter: &ReadFilter,
    out: &mut W,
) -> Result<usize, ConsensusError> {
    let io_err = |source| ConsensusError::Io {
        context: "Failed to write pileup report".to_string(),
        source,
    };

    bam.fetch(FetchDefinition::CompleteTid(target.tid as i32))
        .map_err(|source| ConsensusError::Hts {
            context: format!("Failed to fetch reads for {}", target.name),
            source,
        })?;

    writeln!(out, "# Pileup comparison for reference {}", target.name).map_err(io_err)?;
    if params.include_soft_clipped {
        writeln!(
            out,
            "# Soft-clipped bases are only part of the read-by-read evidence"
        )
        .map_err(io_err)?;
    }
    writeln!(out, "offset\tfetch\tpileup").map_err(io_err)?;

    let mut differences = 0;
    let mut visited = BTreeSet::new();
    let mut pileups = bam.pileup();
    pileups.set_max_depth(i32::MAX as u32);

    for pileup in pileups {
        let pileup = pileup.map_err(|source| ConsensusError::Hts {
            context: format!("Failed to read pileup for {}", target.name),
            source,
        })?;
        let offset = pileup.pos() as i64;
        visited.insert(offset);

        let mut from_pileup = pileup
            .alignments()
            .filter(|alignment| !alignment.is_del() && !alignment.is_refskip())
            .filter_map(|alignment| {
                let record = alignment.record();
                let qpos = alignment.qpos()?;
                if !filter.accepts(&record) {
                    return None;
                }
                let base = record.seq()[qpos].to_ascii_uppercase();
                let quality = match record.qual()[qpos] {
                    _ if params.ignore_quality => 1,
                    MISSING_QUALITY => 1,
                    quality => quality as u32,
                };
                Some((base, quality))
            })
            .collect_vec();
        from_pileup.sort_unstable();

        let from_fetch = fetch_calls(evidence, offset);
        if from_fetch != from_pileup {
            differences += 1;
            writeln!(
                out,
                "{}\t{}\t{}",
                offset,
                format_calls(&from_fetch),
                format_calls(&from_pileup)
            )
            .map_err(io_err)?;
        }
    }

    let unvisited = evidence
        .correspondences
        .keys()
        .copied()
        .filter(|offset| !visited.contains(offset))
        .collect_vec();
    if !unvisited.is_empty() {
        writeln!(out, "# Offsets without a pileup column").map_err(io_err)?;
    }
    for offset in unvisited {
        differences += 1;
        writeln!(
            out,
            "{}\t{}\t{}",
            offset,
            format_calls(&fetch_calls(evidence, offset)),
            format_calls(&[])
        )
        .map_err(io_err)?;
    }

    writeln!(out, "# {} differing offsets", differences).map_err(io_err)?;
    Ok(differences)
}

fn fetch_calls(evidence: &Evidence, offset: i64) -> Vec<(u8, u32)> {
    evidence
        .correspondences
        .get(&offset)
        .map(|bases| {
            bases
                .calls()
                .iter()
                .map(|call| (call.base, call.quality))
                .sorted_unstable()
                .collect_vec()
        })
        .unwrap_or_default()
}
