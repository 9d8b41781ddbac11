pub mod btop;
mod cigar;
mod read;

pub use cigar::{
    aligned_pairs, insertion_offset, resolve_offsets, soft_clipped_offset, AlignOp, AlignedPair,
    CigarOp, CigarOpExt,
};
pub use read::AlignedRead;
