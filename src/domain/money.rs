use std::fmt;

/// Money is represented as integer cents to avoid floating-point drift.
/// €1000.00 is stored as 100000 cents.
pub type Cents = i64;

/// Balance the ledger starts from when nothing has been persisted yet.
pub const INITIAL_BALANCE: Cents = 100_000;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Format cents as a plain number without trailing zeros, the way the
/// balance is kept in the key-value store.
/// Example: 100000 -> "1000", 74950 -> "749.5", 1 -> "0.01"
pub fn format_plain(cents: Cents) -> String {
    let full = format_cents(cents);
    let trimmed = full.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    match parts.len() {
        1 => {
            let units: i64 = parts[0]
                .parse()
                .map_err(|_| ParseCentsError::InvalidFormat)?;
            let cents = units.checked_mul(100).ok_or(ParseCentsError::Overflow)?;
            Ok(if negative { -cents } else { cents })
        }
        2 => {
            let units: i64 = if parts[0].is_empty() {
                0
            } else {
                parts[0]
                    .parse()
                    .map_err(|_| ParseCentsError::InvalidFormat)?
            };

            let decimal_str = parts[1];
            if !decimal_str.chars().all(|c| c.is_ascii_digit()) {
                return Err(ParseCentsError::InvalidFormat);
            }
            let decimal_cents: i64 = match decimal_str.len() {
                0 => 0,
                // "5" means 50 cents
                1 => decimal_str
                    .parse::<i64>()
                    .map_err(|_| ParseCentsError::InvalidFormat)?
                    * 10,
                2 => decimal_str
                    .parse()
                    .map_err(|_| ParseCentsError::InvalidFormat)?,
                // more than 2 decimal places: truncate
                _ => decimal_str[..2]
                    .parse()
                    .map_err(|_| ParseCentsError::InvalidFormat)?,
            };

            let cents = units
                .checked_mul(100)
                .and_then(|c| c.checked_add(decimal_cents))
                .ok_or(ParseCentsError::Overflow)?;
            Ok(if negative { -cents } else { cents })
        }
        _ => Err(ParseCentsError::InvalidFormat),
    }
}

/// Convert a stored decimal number (which may carry float artifacts such as
/// `749.4999999`) to the nearest cent.
pub fn cents_from_decimal(value: f64) -> Result<Cents, ParseCentsError> {
    if !value.is_finite() {
        return Err(ParseCentsError::InvalidFormat);
    }
    let scaled = (value * 100.0).round();
    if scaled.abs() > i64::MAX as f64 {
        return Err(ParseCentsError::Overflow);
    }
    Ok(scaled as Cents)
}

/// Convert cents to a decimal number for JSON payloads.
pub fn cents_to_decimal(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Parse the balance string kept in the key-value store.
pub fn parse_stored_amount(input: &str) -> Result<Cents, ParseCentsError> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| ParseCentsError::InvalidFormat)?;
    cents_from_decimal(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter that keeps cents in memory but writes a JSON number
/// (`250.5`) on the wire.
pub mod decimal_amount {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::{Cents, cents_from_decimal, cents_to_decimal};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(cents_to_decimal(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let value = f64::deserialize(deserializer)?;
        cents_from_decimal(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(format_plain(INITIAL_BALANCE), "1000");
        assert_eq!(format_plain(74950), "749.5");
        assert_eq!(format_plain(74955), "749.55");
        assert_eq!(format_plain(1), "0.01");
        assert_eq!(format_plain(0), "0");
        assert_eq!(format_plain(-250), "-2.5");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("250.50"), Ok(25050));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("12.x").is_err());
        assert_eq!(
            parse_cents("99999999999999999"),
            Err(ParseCentsError::Overflow)
        );
    }

    #[test]
    fn test_parse_stored_amount_rounds_float_artifacts() {
        assert_eq!(parse_stored_amount("1000"), Ok(100_000));
        assert_eq!(parse_stored_amount("749.5"), Ok(74950));
        assert_eq!(parse_stored_amount("749.4999999999"), Ok(74950));
        assert!(parse_stored_amount("NaN").is_err());
        assert!(parse_stored_amount("").is_err());
    }
}
