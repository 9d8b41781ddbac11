use super::{
    assembler::assemble, evidence::Evidence, params::ConsensusParams,
    pileup_check::write_pileup_report, ConsensusError,
};
use crate::reads::AlignedRead;
use crate::utils::{get_bam_references, open_bam_reader, BamReference, Reference};
use rust_htslib::bam::{FetchDefinition, Read, Record};
use std::{fs::File, io::BufWriter, path::Path};

const PROGRESS_INTERVAL: usize = 100_000;

/// Which alignment records contribute evidence.
///
/// Unmapped, secondary, supplementary, duplicate and QC-failed records are
/// always skipped, as are records without a stored sequence (`SEQ` of `*`).
#[derive(Debug, Clone, Default)]
pub struct ReadFilter {
    pub min_mapq: u8,
}

impl ReadFilter {
    pub fn accepts(&self, record: &Record) -> bool {
        !(record.is_unmapped()
            || record.is_secondary()
            || record.is_supplementary()
            || record.is_duplicate()
            || record.is_quality_check_failed()
            || record.seq_len() == 0
            || record.mapq() < self.min_mapq)
    }
}

/// A consensus sequence and the reference it was called against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consensus {
    pub reference_id: String,
    pub sequence: String,
    pub read_count: usize,
}

/// Picks the BAM reference to call a consensus for.
///
/// The explicit `reference_id` wins, then the id of `reference`, then the only
/// reference of the BAM file. A supplied `reference` must match the BAM length.
pub fn resolve_target<'a>(
    bam_path: &Path,
    reference_id: Option<&str>,
    reference: Option<&Reference>,
    bam_references: &'a [BamReference],
) -> Result<&'a BamReference, ConsensusError> {
    let id = match (reference_id, reference, bam_references) {
        (Some(id), _, _) => id,
        (None, Some(reference), _) => reference.id.as_str(),
        (None, None, [only]) => only.name.as_str(),
        (None, None, _) => {
            return Err(ConsensusError::UnspecifiedReference {
                path: bam_path.to_path_buf(),
                names: bam_references
                    .iter()
                    .map(|r| r.name.clone())
                    .collect(),
            })
        }
    };

    let target = bam_references
        .iter()
        .find(|r| r.name == id)
        .ok_or_else(|| ConsensusError::UnknownReference {
            path: bam_path.to_path_buf(),
            id: id.to_string(),
        })?;

    if let Some(reference) = reference {
        if reference.len() != target.length {
            return Err(ConsensusError::UnequalReferenceLength {
                path: bam_path.to_path_buf(),
                id: reference.id.clone(),
                length: reference.len(),
                bam_id: target.name.clone(),
                bam_length: target.length,
            });
        }
    }

    Ok(target)
}

/// Walks already extracted reads and assembles their consensus.
pub fn consensus_from_reads<I>(
    reads: I,
    reference: Option<&Reference>,
    reference_length: usize,
    params: &ConsensusParams,
) -> String
where
    I: IntoIterator<Item = AlignedRead>,
{
    let params = params.effective();
    let mut evidence = Evidence::new();
    for mut read in reads {
        if params.ignore_quality {
            read.ignore_quality();
        }
        evidence.add_read(&read, params.include_soft_clipped);
    }
    assemble(
        evidence,
        reference.map(|r| r.sequence.as_slice()),
        reference_length,
        &params,
    )
}

/// Calls a consensus for one reference of an indexed BAM file.
///
/// With `pileup_report`, the per-offset evidence is re-collected with the
/// pileup engine and differences are written to that path.
pub fn consensus_from_bam(
    bam_path: &Path,
    reference_id: Option<&str>,
    reference: Option<&Reference>,
    params: &ConsensusParams,
    filter: &ReadFilter,
    pileup_report: Option<&Path>,
) -> Result<Consensus, ConsensusError> {
    let params = params.effective();
    params.validate(reference.is_some())?;

    let mut bam = open_bam_reader(bam_path)?;
    let bam_references = get_bam_references(bam.header());
    let target = resolve_target(bam_path, reference_id, reference, &bam_references)?;
    log::info!(
        "Calling consensus for {} ({} bp) from {}",
        target.name,
        target.length,
        bam_path.display()
    );

    bam.fetch(FetchDefinition::CompleteTid(target.tid as i32))
        .map_err(|source| ConsensusError::Hts {
            context: format!("Failed to fetch reads for {}", target.name),
            source,
        })?;
    let evidence = walk_reads(&mut bam, &params, filter)?;

    if let Some(report_path) = pileup_report {
        let file = File::create(report_path).map_err(|source| ConsensusError::Io {
            context: format!("Failed to create {}", report_path.display()),
            source,
        })?;
        let mut out = BufWriter::new(file);
        let differences =
            write_pileup_report(&mut bam, target, &evidence, &params, filter, &mut out)?;
        match differences {
            0 => log::info!("Pileup comparison found no differences"),
            _ => log::warn!(
                "Pileup comparison found {} differing offsets, see {}",
                differences,
                report_path.display()
            ),
        }
    }

    let read_count = evidence.read_count;
    let sequence = assemble(
        evidence,
        reference.map(|r| r.sequence.as_slice()),
        target.length,
        &params,
    );
    log::info!(
        "Consensus for {} has length {} from {} reads",
        target.name,
        sequence.len(),
        read_count
    );

    Ok(Consensus {
        reference_id: target.name.clone(),
        sequence,
        read_count,
    })
}

fn walk_reads<R: Read>(
    bam: &mut R,
    params: &ConsensusParams,
    filter: &ReadFilter,
) -> Result<Evidence, ConsensusError> {
    let mut evidence = Evidence::new();
    let mut n_filt = 0;
    let mut record = Record::new();
    while let Some(result) = bam.read(&mut record) {
        result.map_err(|source| ConsensusError::Hts {
            context: "Failed to read BAM record".to_string(),
            source,
        })?;
        if !filter.accepts(&record) {
            n_filt += 1;
            continue;
        }

        let mut read = AlignedRead::from_hts_rec(&record);
        if params.ignore_quality {
            read.ignore_quality();
        }
        evidence.add_read(&read, params.include_soft_clipped);

        if params.progress && evidence.read_count % PROGRESS_INTERVAL == 0 {
            log::info!("Processed {} reads", evidence.read_count);
        }
    }

    if n_filt > 0 {
        log::warn!(
            "Filtered {}/{} reads",
            n_filt,
            n_filt + evidence.read_count
        );
    }
    log::debug!(
        "Collected evidence at {} offsets, {} deletion offsets, {} insertion offsets",
        evidence.correspondences.len(),
        evidence.deletions.len(),
        evidence.insertions.len()
    );

    Ok(evidence)
}
