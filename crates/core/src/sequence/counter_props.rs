//! Property-based tests for sequence arithmetic.

use proptest::prelude::*;

use super::counter::{SequenceState, advance_target, next_candidate, parse_tail};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Advancing never lowers the counter and always passes `n`.
    #[test]
    fn prop_advance_monotonic(current in 1i64..1_000_000, n in 0i64..1_000_000) {
        let target = advance_target(current, n);
        prop_assert!(target >= current);
        prop_assert!(target > n);
    }

    /// The healed candidate never collides with a consumed number.
    #[test]
    fn prop_candidate_above_used(current in 1i64..1_000_000, used in 0i64..1_000_000) {
        let candidate = next_candidate(current, Some(used));
        prop_assert!(candidate > used);
        prop_assert!(candidate >= current);
    }

    /// A formatted number parses back to itself.
    #[test]
    fn prop_format_parses_back(digits in 1i64..10, n in 1i64..1_000_000_000) {
        let state = SequenceState::new("JE", digits, 1).unwrap();
        prop_assert_eq!(parse_tail(&state.format(n), "JE"), Some(n));
    }

    /// Formatted numbers of a fixed width sort in numeric order.
    #[test]
    fn prop_format_sorts(a in 1i64..999_999, b in 1i64..999_999) {
        let state = SequenceState::new("JE", 6, 1).unwrap();
        prop_assert_eq!(state.format(a).cmp(&state.format(b)), a.cmp(&b));
    }
}
