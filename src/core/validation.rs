use crate::core::domain::TransferIntent;
use crate::core::errors::BorderHopError;

/// Smallest amount a transfer may carry.
pub const MIN_TRANSFER_AMOUNT: f64 = 0.01;

/// Addresses are stored lower-cased. No checksum or format check is applied.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A present, non-blank string field.
pub fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A zero or missing amount counts as missing; anything below the minimum is invalid.
pub fn validate_amount(amount: f64) -> Result<f64, BorderHopError> {
    if !amount.is_finite() {
        return Err(BorderHopError::ValidationError("Amount must be a finite number".into()));
    }
    if amount < MIN_TRANSFER_AMOUNT {
        return Err(BorderHopError::ValidationError(format!(
            "Amount must be at least {}",
            MIN_TRANSFER_AMOUNT
        )));
    }
    Ok(amount)
}

pub fn parse_intent(intent: Option<&str>) -> Result<TransferIntent, BorderHopError> {
    match intent.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(TransferIntent::Standard),
        Some(raw) => TransferIntent::parse(raw)
            .ok_or_else(|| BorderHopError::ValidationError(format!("Invalid intent: {}", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("  0xAbCdEF0000000000000000000000000000000001 "),
            "0xabcdef0000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_required() {
        assert_eq!(required(&Some("base".into())), Some("base"));
        assert_eq!(required(&Some("   ".into())), None);
        assert_eq!(required(&None), None);
    }

    #[test_case(0.01 ; "minimum")]
    #[test_case(100.0 ; "typical")]
    #[test_case(1_000_000.0 ; "large")]
    fn test_valid_amounts(amount: f64) {
        assert_eq!(validate_amount(amount).unwrap(), amount);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(0.009 ; "below minimum")]
    #[test_case(-5.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn test_invalid_amounts(amount: f64) {
        assert!(matches!(validate_amount(amount), Err(BorderHopError::ValidationError(_))));
    }

    #[test]
    fn test_parse_intent() {
        assert_eq!(parse_intent(None).unwrap(), TransferIntent::Standard);
        assert_eq!(parse_intent(Some("")).unwrap(), TransferIntent::Standard);
        assert_eq!(parse_intent(Some("minimize_fees")).unwrap(), TransferIntent::MinimizeFees);
        assert!(parse_intent(Some("fastest")).is_err());
    }
}
