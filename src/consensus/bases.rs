use itertools::Itertools;
use std::collections::BTreeMap;

/// One observed base and its quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseCall {
    pub base: u8,
    pub quality: u32,
}

/// All observations at one output offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bases {
    calls: Vec<BaseCall>,
}

const A: u8 = 0b0001;
const C: u8 = 0b0010;
const G: u8 = 0b0100;
const T: u8 = 0b1000;

/// IUPAC symbol for every non-empty subset of {A, C, G, T}, indexed by bit mask.
const IUPAC_BY_MASK: [u8; 16] = [
    b'N', // unused
    b'A', b'C', b'M', b'G', b'R', b'S', b'V', b'T', b'W', b'Y', b'H', b'K', b'D', b'B', b'N',
];

fn nucleotide_mask(symbol: u8) -> Option<u8> {
    let mask = match symbol.to_ascii_uppercase() {
        b'A' => A,
        b'C' => C,
        b'G' => G,
        b'T' | b'U' => T,
        b'M' => A | C,
        b'R' => A | G,
        b'W' => A | T,
        b'S' => C | G,
        b'Y' => C | T,
        b'K' => G | T,
        b'V' => A | C | G,
        b'H' => A | C | T,
        b'D' => A | G | T,
        b'B' => C | G | T,
        b'N' => A | C | G | T,
        _ => return None,
    };
    Some(mask)
}

/// Returns the least ambiguous symbol representing every symbol in `symbols`.
///
/// A lone symbol is returned unchanged. Sets including a symbol outside the
/// nucleotide alphabet resolve to `N`.
pub fn least_ambiguous(symbols: &[u8]) -> u8 {
    if let [symbol] = symbols {
        return *symbol;
    }
    symbols
        .iter()
        .try_fold(0u8, |mask, &symbol| nucleotide_mask(symbol).map(|m| mask | m))
        .map_or(b'N', |mask| IUPAC_BY_MASK[mask as usize])
}

impl Bases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, base: u8, quality: u32) {
        self.calls.push(BaseCall { base, quality });
    }

    /// Moves all observations from `other` into `self`.
    pub fn merge(&mut self, other: Bases) {
        self.calls.extend(other.calls);
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn calls(&self) -> &[BaseCall] {
        &self.calls
    }

    /// Calls a consensus symbol from the observations.
    ///
    /// Bases are taken in decreasing order of summed quality until their share
    /// of the total reaches `threshold`. Bases tied on quality sum are always
    /// taken together. The chosen bases are reported as their least ambiguous
    /// IUPAC symbol. When every quality is zero, each observation weighs 1.
    pub fn consensus(
        &self,
        threshold: f64,
        min_coverage: usize,
        low_coverage: u8,
        no_coverage: u8,
    ) -> u8 {
        if self.calls.is_empty() {
            return no_coverage;
        }
        if self.calls.len() < min_coverage {
            return low_coverage;
        }

        let mut quality_sums: BTreeMap<u8, u64> = BTreeMap::new();
        for call in &self.calls {
            *quality_sums.entry(call.base).or_insert(0) += call.quality as u64;
        }
        let mut total: u64 = quality_sums.values().sum();
        if total == 0 {
            quality_sums.clear();
            for call in &self.calls {
                *quality_sums.entry(call.base).or_insert(0) += 1;
            }
            total = self.calls.len() as u64;
        }

        // Stable sort keeps alphabetical order among equal sums.
        let ranked = quality_sums
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect_vec();

        let mut chosen = Vec::new();
        let mut cumulative = 0u64;
        for (sum, group) in &ranked.iter().chunk_by(|(_, sum)| *sum) {
            for (base, _) in group {
                chosen.push(*base);
                cumulative += sum;
            }
            if cumulative as f64 / total as f64 >= threshold {
                break;
            }
        }

        least_ambiguous(&chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bases_from(calls: &[(u8, u32)]) -> Bases {
        let mut bases = Bases::new();
        for &(base, quality) in calls {
            bases.append(base, quality);
        }
        bases
    }

    #[test]
    fn empty_is_no_coverage() {
        assert_eq!(Bases::new().consensus(0.8, 1, b'L', b'Z'), b'Z');
        assert_eq!(Bases::new().consensus(0.8, 0, b'L', b'Z'), b'Z');
    }

    #[test]
    fn below_min_coverage_is_low_coverage() {
        let bases = bases_from(&[(b'A', 30), (b'A', 30)]);
        assert_eq!(bases.consensus(0.8, 3, b'L', b'Z'), b'L');
        assert_eq!(bases.consensus(0.8, 2, b'L', b'Z'), b'A');
    }

    #[test]
    fn single_base_ignores_threshold() {
        let bases = bases_from(&[(b'G', 5), (b'G', 40), (b'G', 1)]);
        for threshold in [0.0, 0.5, 0.99, 1.0] {
            assert_eq!(bases.consensus(threshold, 1, b'L', b'Z'), b'G');
        }
    }

    #[test]
    fn consensus_is_repeatable() {
        let bases = bases_from(&[(b'A', 10), (b'C', 20), (b'G', 5)]);
        let first = bases.consensus(0.7, 1, b'L', b'Z');
        assert_eq!(first, bases.consensus(0.7, 1, b'L', b'Z'));
        assert_eq!(first, b'M');
    }

    #[test]
    fn tie_at_threshold_includes_both() {
        let bases = bases_from(&[(b'A', 5), (b'A', 5), (b'C', 5), (b'C', 5)]);
        assert_eq!(bases.consensus(0.5, 1, b'L', b'Z'), b'M');
    }

    #[test]
    fn quality_outweighs_count() {
        let bases = bases_from(&[(b'A', 2), (b'A', 2), (b'A', 2), (b'T', 40)]);
        assert_eq!(bases.consensus(0.8, 1, b'L', b'Z'), b'T');
    }

    #[test]
    fn threshold_pulls_in_minor_bases() {
        let bases = bases_from(&[(b'A', 60), (b'C', 30), (b'G', 10)]);
        assert_eq!(bases.consensus(0.6, 1, b'L', b'Z'), b'A');
        assert_eq!(bases.consensus(0.8, 1, b'L', b'Z'), b'M');
        assert_eq!(bases.consensus(0.95, 1, b'L', b'Z'), b'V');
    }

    #[test]
    fn all_four_bases_are_n() {
        let bases = bases_from(&[(b'A', 10), (b'C', 10), (b'G', 10), (b'T', 10)]);
        assert_eq!(bases.consensus(0.6, 1, b'L', b'Z'), b'N');
    }

    #[test]
    fn zero_qualities_fall_back_to_counts() {
        let bases = bases_from(&[(b'A', 0), (b'A', 0), (b'C', 0)]);
        assert_eq!(bases.consensus(0.6, 1, b'L', b'Z'), b'A');
    }

    #[test]
    fn least_ambiguous_codes() {
        assert_eq!(least_ambiguous(b"A"), b'A');
        assert_eq!(least_ambiguous(b"-"), b'-');
        assert_eq!(least_ambiguous(b"AG"), b'R');
        assert_eq!(least_ambiguous(b"CT"), b'Y');
        assert_eq!(least_ambiguous(b"GT"), b'K');
        assert_eq!(least_ambiguous(b"ACT"), b'H');
        assert_eq!(least_ambiguous(b"CGT"), b'B');
        assert_eq!(least_ambiguous(b"AR"), b'R');
        assert_eq!(least_ambiguous(b"A-"), b'N');
    }

    #[test]
    fn merge_moves_calls() {
        let mut bases = bases_from(&[(b'A', 1)]);
        bases.merge(bases_from(&[(b'C', 2), (b'G', 3)]));
        assert_eq!(bases.len(), 3);
        assert_eq!(bases.calls()[2], BaseCall { base: b'G', quality: 3 });
    }
}
