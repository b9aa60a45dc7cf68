//! Cached-versus-computed comparison shared by every reconciliation pass.

use daftar_shared::types::round_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A disagreement between a cached balance and its recomputed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drift {
    /// The stored value; `None` when nothing has been materialised yet.
    pub cached: Option<Decimal>,
    /// The value recomputed from the underlying log.
    pub computed: Decimal,
    /// `computed - cached`, treating a missing cache as zero.
    pub delta: Decimal,
}

impl Drift {
    /// Compares a cached value with a recomputed one at ledger precision.
    ///
    /// A missing cache only counts as drift when the computed value is
    /// non-zero.
    #[must_use]
    pub fn between(cached: Option<Decimal>, computed: Decimal) -> Option<Self> {
        let computed = round_amount(computed);
        let stored = round_amount(cached.unwrap_or(Decimal::ZERO));
        if stored == computed {
            return None;
        }
        Some(Self {
            cached,
            computed,
            delta: computed - stored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_no_drift_when_equal() {
        assert_eq!(Drift::between(Some(dec!(40.000)), dec!(40)), None);
        assert_eq!(Drift::between(None, Decimal::ZERO), None);
    }

    #[test]
    fn test_signed_delta() {
        let drift = Drift::between(Some(dec!(50)), dec!(40)).unwrap();
        assert_eq!(drift.delta, dec!(-10));
        assert_eq!(drift.cached, Some(dec!(50)));
        assert_eq!(drift.computed, dec!(40));
    }

    #[test]
    fn test_missing_cache_with_value_is_drift() {
        let drift = Drift::between(None, dec!(12.5)).unwrap();
        assert_eq!(drift.delta, dec!(12.5));
    }
}
