pub type CigarOp = rust_htslib::bam::record::Cigar;

pub trait CigarOpExt {
    fn get_ref_len(&self) -> i64;
    fn get_query_len(&self) -> i64;
}

impl CigarOpExt for CigarOp {
    fn get_ref_len(&self) -> i64 {
        match self {
            CigarOp::Match(len)
            | CigarOp::RefSkip(len)
            | CigarOp::Del(len)
            | CigarOp::Equal(len)
            | CigarOp::Diff(len) => *len as i64,
            CigarOp::Ins(_) | CigarOp::SoftClip(_) | CigarOp::HardClip(_) | CigarOp::Pad(_) => 0,
        }
    }

    fn get_query_len(&self) -> i64 {
        match self {
            CigarOp::Match(len)
            | CigarOp::Equal(len)
            | CigarOp::Diff(len)
            | CigarOp::Ins(len)
            | CigarOp::SoftClip(len) => *len as i64,
            CigarOp::RefSkip(_) | CigarOp::Del(_) | CigarOp::HardClip(_) | CigarOp::Pad(_) => 0,
        }
    }
}

/// Per-position classification of an aligned pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignOp {
    /// Match or mismatch (`M`, `=`, `X`).
    Match,
    /// Query base absent from the reference (`I`).
    Ins,
    /// Reference base absent from the query (`D`).
    Del,
    /// Query base retained in the record but not aligned (`S`).
    SoftClip,
}

/// Query and reference offsets of one alignment column. At most one side is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    pub query: Option<usize>,
    pub reference: Option<i64>,
}

impl AlignedPair {
    pub fn new(query: Option<usize>, reference: Option<i64>) -> Self {
        Self { query, reference }
    }
}

/// Expands a CIGAR into per-position aligned pairs and their operations.
///
/// Reference skips advance the reference offset without producing pairs; hard
/// clips and padding produce nothing.
pub fn aligned_pairs(ref_start: i64, ops: &[CigarOp]) -> (Vec<AlignedPair>, Vec<AlignOp>) {
    let capacity = ops
        .iter()
        .map(|op| op.get_query_len().max(op.get_ref_len()) as usize)
        .sum();
    let mut pairs = Vec::with_capacity(capacity);
    let mut align_ops = Vec::with_capacity(capacity);
    let mut query_pos = 0usize;
    let mut ref_pos = ref_start;

    for op in ops {
        match *op {
            CigarOp::Match(len) | CigarOp::Equal(len) | CigarOp::Diff(len) => {
                for _ in 0..len {
                    pairs.push(AlignedPair::new(Some(query_pos), Some(ref_pos)));
                    align_ops.push(AlignOp::Match);
                    query_pos += 1;
                    ref_pos += 1;
                }
            }
            CigarOp::Ins(len) | CigarOp::SoftClip(len) => {
                let align_op = if matches!(op, CigarOp::Ins(_)) {
                    AlignOp::Ins
                } else {
                    AlignOp::SoftClip
                };
                for _ in 0..len {
                    pairs.push(AlignedPair::new(Some(query_pos), None));
                    align_ops.push(align_op);
                    query_pos += 1;
                }
            }
            CigarOp::Del(len) => {
                for _ in 0..len {
                    pairs.push(AlignedPair::new(None, Some(ref_pos)));
                    align_ops.push(AlignOp::Del);
                    ref_pos += 1;
                }
            }
            CigarOp::RefSkip(len) => ref_pos += len as i64,
            CigarOp::HardClip(_) | CigarOp::Pad(_) => {}
        }
    }

    (pairs, align_ops)
}

/// Finds the reference offset that governs the insertion at `index`.
///
/// Returns `(true, r + 1)` when the nearest reference-bearing pair `r` lies
/// before the insertion, or `(false, r)` when it was only found after it.
///
/// # Panics
/// If `index` is not an insertion or the read has no reference-bearing pair.
pub fn insertion_offset(index: usize, pairs: &[AlignedPair], ops: &[AlignOp]) -> (bool, i64) {
    assert_eq!(
        ops[index],
        AlignOp::Ins,
        "Operation at {} is not an insertion",
        index
    );

    if let Some(reference) = pairs[..index].iter().rev().find_map(|pair| pair.reference) {
        return (true, reference + 1);
    }

    match pairs[index + 1..].iter().find_map(|pair| pair.reference) {
        Some(reference) => (false, reference),
        None => panic!("Insertion at {} has no reference-anchored position", index),
    }
}

/// Finds the reference offset a soft-clipped base at `index` would occupy.
///
/// Soft clips after the aligned part extend to the right of the last
/// reference-bearing pair; leading soft clips extend to the left of the first.
/// Inserted bases between the clip and the anchor take no reference offset.
///
/// # Panics
/// If `index` is not a soft clip or the read has no reference-bearing pair.
pub fn soft_clipped_offset(index: usize, pairs: &[AlignedPair], ops: &[AlignOp]) -> i64 {
    assert_eq!(
        ops[index],
        AlignOp::SoftClip,
        "Operation at {} is not a soft clip",
        index
    );

    let mut count = 0;
    for (pair, op) in pairs[..=index].iter().zip(&ops[..=index]).rev() {
        if let Some(reference) = pair.reference {
            return reference + count;
        }
        if *op == AlignOp::SoftClip {
            count += 1;
        }
    }

    count = 0;
    for (pair, op) in pairs[index..].iter().zip(&ops[index..]) {
        if let Some(reference) = pair.reference {
            return reference - count;
        }
        if *op == AlignOp::SoftClip {
            count += 1;
        }
    }

    panic!("Soft clip at {} has no reference-anchored position", index)
}

/// Resolves every position of a read in two linear passes.
///
/// Insertions resolve as in [`insertion_offset`] and soft clips as in
/// [`soft_clipped_offset`]; reference-bearing positions resolve to their own
/// offset. The flag is set when the offset was found looking backward.
/// Positions of a read without any reference-bearing pair resolve to `None`.
pub fn resolve_offsets(pairs: &[AlignedPair], ops: &[AlignOp]) -> Vec<Option<(bool, i64)>> {
    let len = pairs.len().min(ops.len());

    let mut backward = Vec::with_capacity(len);
    let mut last_ref = None;
    let mut clips = 0;
    for (pair, op) in pairs.iter().zip(ops) {
        let offset = match (pair.reference, op) {
            (Some(reference), _) => {
                last_ref = Some(reference);
                clips = 0;
                Some(reference)
            }
            (None, AlignOp::SoftClip) => {
                clips += 1;
                last_ref.map(|reference| reference + clips)
            }
            (None, _) => last_ref.map(|reference| reference + 1),
        };
        backward.push(offset);
    }

    let mut resolved = vec![None; len];
    let mut next_ref = None;
    clips = 0;
    for index in (0..len).rev() {
        let forward = match (pairs[index].reference, ops[index]) {
            (Some(reference), _) => {
                next_ref = Some(reference);
                clips = 0;
                Some(reference)
            }
            (None, AlignOp::SoftClip) => {
                clips += 1;
                next_ref.map(|reference| reference - clips)
            }
            (None, _) => next_ref,
        };
        resolved[index] = match backward[index] {
            Some(offset) => Some((true, offset)),
            None => forward.map(|offset| (false, offset)),
        };
    }
    resolved
}
