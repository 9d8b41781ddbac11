use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error(
        "BAM file '{}' mentions {} references ({}) but neither a reference id nor a reference sequence was given to indicate which one to use",
        path.display(),
        names.len(),
        names.join(", ")
    )]
    UnspecifiedReference { path: PathBuf, names: Vec<String> },

    #[error("BAM file '{}' does not mention a reference with id '{}'", path.display(), id)]
    UnknownReference { path: PathBuf, id: String },

    #[error(
        "Reference with id '{}' has length {}, which does not match the length of reference '{}' ({}) in BAM file '{}'",
        id,
        length,
        bam_id,
        bam_length,
        path.display()
    )]
    UnequalReferenceLength {
        path: PathBuf,
        id: String,
        length: usize,
        bam_id: String,
        bam_length: usize,
    },

    #[error("Unknown consensus strategy '{0}'. Options are: fetch, majority")]
    UnknownStrategy(String),

    #[error("A reference sequence is required when {0} is 'reference'")]
    ReferenceRequired(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Hts {
        context: String,
        source: rust_htslib::errors::Error,
    },
}
