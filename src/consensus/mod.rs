//! Consensus calling from reads aligned to a single reference.
//!
//! Reads are walked one at a time into an [`Evidence`] tally of bases,
//! deletions and insertions per reference offset, which the assembler then
//! turns into one linear sequence.
mod assembler;
mod bases;
mod driver;
mod error;
mod evidence;
mod insertion;
mod params;
mod pileup_check;

pub use assembler::{actual_deletions, assemble};
pub use bases::{least_ambiguous, BaseCall, Bases};
pub use driver::{consensus_from_bam, consensus_from_reads, resolve_target, Consensus, ReadFilter};
pub use error::ConsensusError;
pub use evidence::Evidence;
pub use insertion::Insertion;
pub use params::{ConsensusParams, CoverageFallback, Strategy, PLACEHOLDER_SYMBOL};
pub use pileup_check::write_pileup_report;
