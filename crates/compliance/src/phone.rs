//! Phone number normalisation
//!
//! All gate operations key on the E.164 form so that "+1 (512) 555-0100",
//! "512-555-0100" and "15125550100" resolve to the same record.

use crate::ComplianceError;

/// Normalise a phone number to E.164. Ten-digit numbers get the US/Canada
/// country code; numbers already carrying a country code pass through.
pub fn normalize_phone(phone: &str) -> Result<String, ComplianceError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 10 {
        return Err(ComplianceError::InvalidPhone(phone.to_string()));
    }

    let normalized = if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    };

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_digit_gets_country_code() {
        assert_eq!(normalize_phone("5125550100").unwrap(), "+15125550100");
        assert_eq!(normalize_phone("(512) 555-0100").unwrap(), "+15125550100");
    }

    #[test]
    fn test_eleven_digit_passthrough() {
        assert_eq!(normalize_phone("15125550100").unwrap(), "+15125550100");
        assert_eq!(normalize_phone("+1 512 555 0100").unwrap(), "+15125550100");
    }

    #[test]
    fn test_international_passthrough() {
        assert_eq!(normalize_phone("+44 20 7946 0958").unwrap(), "+442079460958");
    }

    #[test]
    fn test_equivalent_formats_collapse() {
        let forms = ["5125550100", "512-555-0100", "+1 (512) 555-0100", "15125550100"];
        let normalized: Vec<String> =
            forms.iter().map(|f| normalize_phone(f).unwrap()).collect();
        assert!(normalized.iter().all(|n| n == "+15125550100"));
    }

    #[test]
    fn test_too_short_rejected() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("").is_err());
    }
}
