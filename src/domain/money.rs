use std::fmt;

/// Money is represented as integer paise to avoid floating-point precision issues.
/// 1 rupee = 100 paise, so ₹50.00 = 5000 paise.
pub type Paise = i64;

/// Number of paise in one rupee.
pub const PAISE_PER_RUPEE: Paise = 100;

/// Convert whole rupees into paise.
pub const fn rupees(units: i64) -> Paise {
    units * PAISE_PER_RUPEE
}

/// Format paise as a human-readable rupee string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_rupees(paise: Paise) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs_paise = paise.abs();
    let units = abs_paise / PAISE_PER_RUPEE;
    let remainder = abs_paise % PAISE_PER_RUPEE;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal rupee string into paise.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_rupees(input: &str) -> Result<Paise, ParseMoneyError> {
    let input = input.trim();
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let parts: Vec<&str> = input.split('.').collect();
    let paise = match parts.as_slice() {
        [units] => parse_digits(units)?
            .checked_mul(PAISE_PER_RUPEE)
            .ok_or(ParseMoneyError::Overflow)?,
        [units, decimals] => {
            let units = if units.is_empty() {
                0
            } else {
                parse_digits(units)?
            };

            // Sub-paisa digits are only accepted when they are zeros
            let fraction = match decimals.len() {
                0 => 0,
                1 => parse_digits(decimals)? * 10,
                2 => parse_digits(decimals)?,
                _ => {
                    let (paise, rest) = decimals
                        .split_at_checked(2)
                        .ok_or(ParseMoneyError::InvalidFormat)?;
                    if !rest.bytes().all(|b| b == b'0') {
                        return Err(ParseMoneyError::InvalidFormat);
                    }
                    parse_digits(paise)?
                }
            };

            units
                .checked_mul(PAISE_PER_RUPEE)
                .and_then(|p| p.checked_add(fraction))
                .ok_or(ParseMoneyError::Overflow)?
        }
        _ => return Err(ParseMoneyError::InvalidFormat),
    };

    Ok(if negative { -paise } else { paise })
}

fn parse_digits(digits: &str) -> Result<i64, ParseMoneyError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseMoneyError::InvalidFormat);
    }
    digits.parse().map_err(|_| ParseMoneyError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMoneyError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMoneyError::InvalidFormat => write!(f, "invalid money format"),
            ParseMoneyError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseMoneyError {}

/// Serde adapter exchanging paise as decimal rupee numbers on the wire.
///
/// Whole amounts serialize as integers (`500`), fractional ones as floats
/// (`150.5`). Deserialization accepts a JSON number or a numeric string.
pub mod rupee_amount {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{PAISE_PER_RUPEE, Paise, parse_rupees};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(serde_json::Number),
        Text(String),
    }

    pub fn serialize<S: Serializer>(paise: &Paise, serializer: S) -> Result<S::Ok, S::Error> {
        if paise % PAISE_PER_RUPEE == 0 {
            serializer.serialize_i64(paise / PAISE_PER_RUPEE)
        } else {
            serializer.serialize_f64(*paise as f64 / PAISE_PER_RUPEE as f64)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Paise, D::Error> {
        let text = match Wire::deserialize(deserializer)? {
            Wire::Number(n) => n.to_string(),
            Wire::Text(s) => s,
        };
        parse_rupees(&text).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::super::Paise;

        pub fn serialize<S: Serializer>(
            paise: &Option<Paise>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match paise {
                Some(p) => super::serialize(p, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Paise>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "crate::domain::money::rupee_amount")] Paise);

            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(p)| p))
        }
    }
}
