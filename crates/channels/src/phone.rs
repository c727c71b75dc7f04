use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

#[allow(clippy::expect_used)]
static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("E.164 pattern is valid"));

/// Check that `number` is an E.164 phone number such as `+15551234567`.
pub fn validate_phone_number(number: &str) -> Result<()> {
    if E164.is_match(number) {
        Ok(())
    } else {
        Err(Error::InvalidPhoneNumber {
            number: number.to_string(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_e164() {
        assert!(validate_phone_number("+15551234567").is_ok());
        assert!(validate_phone_number("+447911123456").is_ok());
    }

    #[test]
    fn rejects_non_e164() {
        for bad in [
            "15551234567", "+05551234567", "+1", "+1555-123", "", "+1234567890123456",
            "+1\u{0662}\u{0663}\u{0664}\u{0665}",
        ] {
            assert!(
                matches!(
                    validate_phone_number(bad),
                    Err(Error::InvalidPhoneNumber { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
