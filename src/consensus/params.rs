use super::ConsensusError;
use std::{fmt, str::FromStr};

/// Symbol used when a fallback has no reference base to draw on.
pub const PLACEHOLDER_SYMBOL: u8 = b'N';

/// What to emit at sites with too little read evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFallback {
    /// The reference base at the site.
    Reference,
    /// A fixed symbol, e.g. `N`.
    Symbol(u8),
}

impl CoverageFallback {
    /// Resolves the fallback for an original reference offset.
    ///
    /// Offsets without a reference base (outside the reference, or inserted
    /// positions with `None`) resolve to [`PLACEHOLDER_SYMBOL`].
    pub fn symbol(&self, reference: Option<&[u8]>, offset: Option<i64>) -> u8 {
        match self {
            CoverageFallback::Symbol(symbol) => *symbol,
            CoverageFallback::Reference => offset
                .and_then(|offset| usize::try_from(offset).ok())
                .and_then(|offset| reference.and_then(|seq| seq.get(offset)))
                .copied()
                .unwrap_or(PLACEHOLDER_SYMBOL),
        }
    }
}

impl FromStr for CoverageFallback {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            b"reference" => Ok(CoverageFallback::Reference),
            [symbol] => Ok(CoverageFallback::Symbol(*symbol)),
            _ => Err(format!(
                "Expected 'reference' or a single character, got '{}'",
                s
            )),
        }
    }
}

impl fmt::Display for CoverageFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageFallback::Reference => write!(f, "reference"),
            CoverageFallback::Symbol(symbol) => write!(f, "{}", *symbol as char),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Thresholded deletion and insertion calls with optional soft-clip evidence.
    Fetch,
    /// Single-pass majority policy: any deletion evidence deletes a site,
    /// insertions need only `min_coverage` reads and soft clips are ignored.
    Majority,
}

impl FromStr for Strategy {
    type Err = ConsensusError;
    fn from_str(strategy: &str) -> Result<Self, Self::Err> {
        match strategy {
            "fetch" => Ok(Strategy::Fetch),
            "majority" => Ok(Strategy::Majority),
            _ => Err(ConsensusError::UnknownStrategy(strategy.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusParams {
    pub threshold: f64,
    pub min_coverage: usize,
    pub low_coverage: CoverageFallback,
    pub no_coverage: CoverageFallback,
    pub deletion_symbol: String,
    pub deletion_threshold: f64,
    pub insertion_count_threshold: usize,
    pub ignore_quality: bool,
    pub include_soft_clipped: bool,
    pub strategy: Strategy,
    pub progress: bool,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            min_coverage: 1,
            low_coverage: CoverageFallback::Reference,
            no_coverage: CoverageFallback::Reference,
            deletion_symbol: "-".to_string(),
            deletion_threshold: 0.5,
            insertion_count_threshold: 5,
            ignore_quality: false,
            include_soft_clipped: false,
            strategy: Strategy::Fetch,
            progress: false,
        }
    }
}

impl ConsensusParams {
    /// Checks the parameters against each other and against the availability of a reference.
    pub fn validate(&self, has_reference: bool) -> Result<(), ConsensusError> {
        let unit_range = 0.0..=1.0;
        if !unit_range.contains(&self.threshold) {
            return Err(ConsensusError::InvalidParameter(format!(
                "threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            )));
        }
        if !unit_range.contains(&self.deletion_threshold) {
            return Err(ConsensusError::InvalidParameter(format!(
                "deletion threshold must be between 0.0 and 1.0, got {}",
                self.deletion_threshold
            )));
        }
        if !has_reference {
            if self.low_coverage == CoverageFallback::Reference {
                return Err(ConsensusError::ReferenceRequired("low coverage"));
            }
            if self.no_coverage == CoverageFallback::Reference {
                return Err(ConsensusError::ReferenceRequired("no coverage"));
            }
        }
        Ok(())
    }

    /// Returns the parameters the chosen strategy actually runs with.
    pub fn effective(&self) -> ConsensusParams {
        match self.strategy {
            Strategy::Fetch => self.clone(),
            Strategy::Majority => ConsensusParams {
                deletion_threshold: 0.0,
                insertion_count_threshold: self.min_coverage,
                include_soft_clipped: false,
                ..self.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_fallback_from_string() {
        assert_eq!(
            "reference".parse::<CoverageFallback>(),
            Ok(CoverageFallback::Reference)
        );
        assert_eq!("N".parse::<CoverageFallback>(), Ok(CoverageFallback::Symbol(b'N')));
        assert!("NN".parse::<CoverageFallback>().is_err());
        assert!("".parse::<CoverageFallback>().is_err());
    }

    #[test]
    fn coverage_fallback_symbol_lookup() {
        let reference = b"ACGT".as_slice();
        let fallback = CoverageFallback::Reference;
        assert_eq!(fallback.symbol(Some(reference), Some(2)), b'G');
        assert_eq!(fallback.symbol(Some(reference), Some(-1)), PLACEHOLDER_SYMBOL);
        assert_eq!(fallback.symbol(Some(reference), Some(4)), PLACEHOLDER_SYMBOL);
        assert_eq!(fallback.symbol(Some(reference), None), PLACEHOLDER_SYMBOL);
        assert_eq!(fallback.symbol(None, Some(0)), PLACEHOLDER_SYMBOL);
        assert_eq!(CoverageFallback::Symbol(b'?').symbol(None, None), b'?');
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert_eq!("fetch".parse::<Strategy>().unwrap(), Strategy::Fetch);
        assert_eq!("majority".parse::<Strategy>().unwrap(), Strategy::Majority);
        let err = "plurality".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, ConsensusError::UnknownStrategy(s) if s == "plurality"));
    }

    #[test]
    fn reference_policies_need_a_reference() {
        let params = ConsensusParams::default();
        assert!(params.validate(true).is_ok());
        assert!(matches!(
            params.validate(false),
            Err(ConsensusError::ReferenceRequired("low coverage"))
        ));

        let params = ConsensusParams {
            low_coverage: CoverageFallback::Symbol(b'N'),
            no_coverage: CoverageFallback::Symbol(b'N'),
            ..Default::default()
        };
        assert!(params.validate(false).is_ok());
    }

    #[test]
    fn thresholds_must_be_fractions() {
        let params = ConsensusParams {
            threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(true),
            Err(ConsensusError::InvalidParameter(_))
        ));

        let params = ConsensusParams {
            deletion_threshold: -0.1,
            ..Default::default()
        };
        assert!(params.validate(true).is_err());
    }

    #[test]
    fn majority_strategy_overrides_indel_policy() {
        let params = ConsensusParams {
            strategy: Strategy::Majority,
            min_coverage: 3,
            include_soft_clipped: true,
            ..Default::default()
        };
        let effective = params.effective();
        assert_eq!(effective.deletion_threshold, 0.0);
        assert_eq!(effective.insertion_count_threshold, 3);
        assert!(!effective.include_soft_clipped);
        assert_eq!(effective.threshold, params.threshold);
    }
}
