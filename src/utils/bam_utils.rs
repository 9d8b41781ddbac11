use crate::consensus::ConsensusError;
use rust_htslib::bam;
use std::path::Path;

/// A reference sequence as described by an `@SQ` line of a BAM header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BamReference {
    pub tid: u32,
    pub name: String,
    pub length: usize,
}

pub fn open_bam_reader(bam_path: &Path) -> Result<bam::IndexedReader, ConsensusError> {
    bam::IndexedReader::from_path(bam_path).map_err(|source| ConsensusError::Hts {
        context: format!("Failed to create bam reader for {}", bam_path.display()),
        source,
    })
}

/// Lists the references named in the header, in header order.
pub fn get_bam_references(header: &bam::HeaderView) -> Vec<BamReference> {
    header
        .target_names()
        .iter()
        .enumerate()
        .map(|(tid, name)| BamReference {
            tid: tid as u32,
            name: String::from_utf8_lossy(name).into_owned(),
            length: header.target_len(tid as u32).unwrap_or(0) as usize,
        })
        .collect()
}
