//! Parsing and conversion of BLAST trace-back operation (BTOP) strings.
//!
//! A BTOP string interleaves counts of identical bases with pairs of
//! query/subject letters, where `-` marks a gap (e.g. `7AG-C12`).
use super::cigar::CigarOp;
use crate::utils::Result;
use rust_htslib::bam::record::CigarString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtopItem {
    /// A run of identical bases.
    Matches(u32),
    /// A query letter paired with a subject letter, either of which may be a gap.
    Pair(u8, u8),
}

pub fn parse_btop(btop: &str) -> Result<Vec<BtopItem>> {
    let mut items = Vec::new();
    let mut value: Option<u32> = None;
    let mut query_letter: Option<u8> = None;

    for (offset, ch) in btop.bytes().enumerate() {
        if ch.is_ascii_digit() {
            if let Some(letter) = query_letter {
                return Err(format!(
                    "BTOP string '{}' has a query letter '{}' at offset {} with no corresponding subject letter",
                    btop,
                    letter as char,
                    offset - 1
                ));
            }
            let digit = (ch - b'0') as u32;
            let count = match value {
                None => Some(digit),
                Some(v) => v.checked_mul(10).and_then(|v| v.checked_add(digit)),
            };
            value = Some(count.ok_or_else(|| {
                format!(
                    "BTOP string '{}' has a match count at offset {} that does not fit in 32 bits",
                    btop, offset
                )
            })?);
            continue;
        }

        if let Some(count) = value.take() {
            items.push(BtopItem::Matches(count));
        }

        match query_letter.take() {
            None => query_letter = Some(ch),
            Some(b'-') if ch == b'-' => {
                return Err(format!(
                    "BTOP string '{}' has two consecutive gaps at offset {}",
                    btop,
                    offset - 1
                ))
            }
            Some(letter) if letter == ch => {
                return Err(format!(
                    "BTOP string '{}' has two consecutive identical '{}' letters at offset {}",
                    btop,
                    ch as char,
                    offset - 1
                ))
            }
            Some(letter) => items.push(BtopItem::Pair(letter, ch)),
        }
    }

    if let Some(count) = value {
        items.push(BtopItem::Matches(count));
    } else if let Some(letter) = query_letter {
        return Err(format!(
            "BTOP string '{}' has a trailing query letter '{}' with no corresponding subject letter",
            btop, letter as char
        ));
    }

    Ok(items)
}

/// Counts the (query, subject) gaps in a BTOP string.
pub fn count_gaps(btop: &str) -> Result<(usize, usize)> {
    let mut query_gaps = 0;
    let mut subject_gaps = 0;
    for item in parse_btop(btop)? {
        if let BtopItem::Pair(query, subject) = item {
            query_gaps += usize::from(query == b'-');
            subject_gaps += usize::from(subject == b'-');
        }
    }
    Ok((query_gaps, subject_gaps))
}

/// Converts a BTOP string into CIGAR operations with adjacent runs merged.
///
/// With `concise`, matches and mismatches both become `M` instead of `=`/`X`.
pub fn btop_to_cigar_ops(btop: &str, concise: bool) -> Result<Vec<CigarOp>> {
    let mut ops: Vec<CigarOp> = Vec::new();
    for item in parse_btop(btop)? {
        let op = match item {
            BtopItem::Matches(len) if concise => CigarOp::Match(len),
            BtopItem::Matches(len) => CigarOp::Equal(len),
            // A gap in the query needs a deletion from the reference.
            BtopItem::Pair(b'-', _) => CigarOp::Del(1),
            BtopItem::Pair(_, b'-') => CigarOp::Ins(1),
            BtopItem::Pair(_, _) if concise => CigarOp::Match(1),
            BtopItem::Pair(_, _) => CigarOp::Diff(1),
        };
        match (ops.last_mut(), op) {
            (Some(CigarOp::Match(last)), CigarOp::Match(len))
            | (Some(CigarOp::Equal(last)), CigarOp::Equal(len))
            | (Some(CigarOp::Diff(last)), CigarOp::Diff(len))
            | (Some(CigarOp::Ins(last)), CigarOp::Ins(len))
            | (Some(CigarOp::Del(last)), CigarOp::Del(len)) => *last += len,
            _ => ops.push(op),
        }
    }
    Ok(ops)
}

pub fn btop_to_cigar(btop: &str, concise: bool) -> Result<String> {
    Ok(CigarString(btop_to_cigar_ops(btop, concise)?).to_string())
}
