use super::amount::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn test_tolerance_value() {
    assert_eq!(BALANCE_TOLERANCE, dec!(0.001));
}

#[rstest]
#[case(dec!(10.0004), dec!(10.000))]
#[case(dec!(10.0005), dec!(10.001))]
#[case(dec!(-10.0005), dec!(-10.001))]
#[case(dec!(7), dec!(7))]
fn test_round_amount(#[case] input: Decimal, #[case] expected: Decimal) {
    assert_eq!(round_amount(input), expected);
}

#[rstest]
#[case(dec!(100), dec!(100), true)]
#[case(dec!(100.001), dec!(100), true)]
#[case(dec!(100), dec!(100.001), true)]
#[case(dec!(100.002), dec!(100), false)]
#[case(dec!(100), dec!(90), false)]
fn test_is_balanced(#[case] debit: Decimal, #[case] credit: Decimal, #[case] expected: bool) {
    assert_eq!(is_balanced(debit, credit), expected);
}
