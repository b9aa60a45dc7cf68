use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::Forbidden("x".into()), 403, "FORBIDDEN")]
#[case(AppError::NotFound("x".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("x".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::BusinessRule("x".into()), 422, "BUSINESS_RULE_VIOLATION")]
#[case(AppError::Conflict("x".into()), 409, "CONFLICT")]
#[case(AppError::Configuration("x".into()), 500, "CONFIGURATION_ERROR")]
#[case(AppError::Database("x".into()), 500, "DATABASE_ERROR")]
#[case(AppError::Internal("x".into()), 500, "INTERNAL_ERROR")]
fn test_status_and_code(#[case] error: AppError, #[case] status: u16, #[case] code: &str) {
    assert_eq!(error.status_code(), status);
    assert_eq!(error.error_code(), code);
}

#[test]
fn test_error_display() {
    assert_eq!(
        AppError::Configuration("no sequence for journal_entry".into()).to_string(),
        "Configuration error: no sequence for journal_entry"
    );
    assert_eq!(
        AppError::Conflict("msg".into()).to_string(),
        "Conflict: msg"
    );
}

#[test]
fn test_retryable() {
    assert!(AppError::Database(String::new()).is_retryable());
    assert!(AppError::Conflict(String::new()).is_retryable());
    assert!(!AppError::Validation(String::new()).is_retryable());
}
