//! Kubernetes resource quantities (`500m`, `1Gi`, `2e3`).

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

const QUANTITY_PATTERN: &str = r"^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$";

static QUANTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(QUANTITY_PATTERN).expect("Invalid regex constant"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantities must match the regular expression '^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$'")]
    FormatWrong,
    #[error("unable to parse quantity's suffix")]
    Suffix,
    #[error("unable to parse numeric part of quantity")]
    Numeric,
}

/// A parsed quantity. Values too large for `Decimal` saturate and values too
/// small to represent keep their sign, so ordering and zero checks stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quantity {
    value: Decimal,
}

impl Quantity {
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantity(s)
    }
}

enum Multiplier {
    Binary(u32),
    Decimal(i32),
}

fn parse_suffix(suffix: &str) -> Result<Multiplier, QuantityError> {
    let multiplier = match suffix {
        "" => Multiplier::Decimal(0),
        "Ki" => Multiplier::Binary(10),
        "Mi" => Multiplier::Binary(20),
        "Gi" => Multiplier::Binary(30),
        "Ti" => Multiplier::Binary(40),
        "Pi" => Multiplier::Binary(50),
        "Ei" => Multiplier::Binary(60),
        "n" => Multiplier::Decimal(-9),
        "u" => Multiplier::Decimal(-6),
        "m" => Multiplier::Decimal(-3),
        "k" => Multiplier::Decimal(3),
        "M" => Multiplier::Decimal(6),
        "G" => Multiplier::Decimal(9),
        "T" => Multiplier::Decimal(12),
        "P" => Multiplier::Decimal(15),
        "E" => Multiplier::Decimal(18),
        other => {
            let exponent = other
                .strip_prefix(['e', 'E'])
                .filter(|e| !e.is_empty())
                .ok_or(QuantityError::Suffix)?;
            Multiplier::Decimal(exponent.parse().map_err(|_| QuantityError::Suffix)?)
        }
    };
    Ok(multiplier)
}

fn parse_number(number: &str) -> Result<Decimal, QuantityError> {
    let (negative, digits) = match number.as_bytes().first() {
        Some(b'-') => (true, &number[1..]),
        Some(b'+') => (false, &number[1..]),
        _ => (false, number),
    };
    if digits.matches('.').count() > 1 || !digits.bytes().any(|b| b.is_ascii_digit()) {
        return Err(QuantityError::Numeric);
    }
    let mut normalized = String::with_capacity(digits.len() + 2);
    if digits.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(digits);
    if digits.ends_with('.') {
        normalized.push('0');
    }
    let magnitude = Decimal::from_str(&normalized).map_err(|_| QuantityError::Numeric)?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn saturate(mantissa: Decimal) -> Decimal {
    if mantissa.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

fn smallest(mantissa: Decimal) -> Decimal {
    let tiny = Decimal::new(1, 28);
    if mantissa.is_sign_negative() { -tiny } else { tiny }
}

fn scale(mantissa: Decimal, multiplier: Multiplier) -> Decimal {
    if mantissa.is_zero() {
        return Decimal::ZERO;
    }
    match multiplier {
        Multiplier::Binary(bits) => mantissa
            .checked_mul(Decimal::from(1u64 << bits))
            .unwrap_or_else(|| saturate(mantissa)),
        Multiplier::Decimal(exponent) => {
            let ten = Decimal::TEN;
            let mut value = mantissa;
            for _ in 0..exponent.unsigned_abs() {
                let next = if exponent > 0 {
                    value.checked_mul(ten)
                } else {
                    value.checked_div(ten)
                };
                match next {
                    Some(v) if !v.is_zero() => value = v,
                    Some(_) => return smallest(mantissa),
                    None => return saturate(mantissa),
                }
            }
            value
        }
    }
}

/// Parses a quantity string.
pub fn parse_quantity(input: &str) -> Result<Quantity, QuantityError> {
    let captures = QUANTITY_RE
        .captures(input)
        .ok_or(QuantityError::FormatWrong)?;
    let number = captures.get(1).map_or("", |m| m.as_str());
    let suffix = captures.get(2).map_or("", |m| m.as_str());
    let multiplier = parse_suffix(suffix)?;
    let mantissa = parse_number(number)?;
    Ok(Quantity {
        value: scale(mantissa, multiplier),
    })
}
