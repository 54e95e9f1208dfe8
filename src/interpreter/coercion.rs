//! Primitive coercions used by the built-ins
//!
//! There is no ToPrimitive here: objects have no user-visible `valueOf`, so
//! coercing one is a TypeError rather than a call back into user code.

use crate::error::JsError;
use crate::prelude::*;
use crate::value::{JsBigInt, JsValue};

/// Result of ToNumeric: either a Number or a BigInt
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Number(f64),
    BigInt(JsBigInt),
}

pub fn to_numeric(value: &JsValue) -> Result<Numeric, JsError> {
    match value {
        JsValue::Undefined => Ok(Numeric::Number(f64::NAN)),
        JsValue::Null => Ok(Numeric::Number(0.0)),
        JsValue::Boolean(b) => Ok(Numeric::Number(if *b { 1.0 } else { 0.0 })),
        JsValue::Number(n) => Ok(Numeric::Number(*n)),
        JsValue::BigInt(b) => Ok(Numeric::BigInt(b.clone())),
        JsValue::String(s) => Ok(Numeric::Number(string_to_number(s.as_str()))),
        JsValue::Object(_) => Err(JsError::type_error(
            "Cannot convert object to primitive value",
        )),
    }
}

/// ToNumber: like ToNumeric, but a BigInt is an error
pub fn to_number(value: &JsValue) -> Result<f64, JsError> {
    match to_numeric(value)? {
        Numeric::Number(n) => Ok(n),
        Numeric::BigInt(_) => Err(JsError::type_error(
            "Cannot convert a BigInt value to a number",
        )),
    }
}

/// ToIntegerOrInfinity: NaN becomes 0, infinities are kept, everything else
/// is truncated toward zero.
pub fn to_integer_or_infinity(value: &JsValue) -> Result<f64, JsError> {
    let n = to_number(value)?;
    if n.is_nan() {
        return Ok(0.0);
    }
    if n.is_infinite() {
        return Ok(n);
    }
    // Normalize -0 to +0
    Ok(math::trunc(n) + 0.0)
}

/// StringToNumber
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix_digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .map(|digits| (16, digits))
        .or_else(|| {
            trimmed
                .strip_prefix("0o")
                .or_else(|| trimmed.strip_prefix("0O"))
                .map(|digits| (8, digits))
        })
        .or_else(|| {
            trimmed
                .strip_prefix("0b")
                .or_else(|| trimmed.strip_prefix("0B"))
                .map(|digits| (2, digits))
        });
    if let Some((radix, digits)) = radix_digits {
        return parse_radix(digits, radix);
    }

    // Rust also accepts "inf", "NaN" and friends; JS does not
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut result = 0.0;
    for ch in digits.chars() {
        let Some(digit) = ch.to_digit(radix) else {
            return f64::NAN;
        };
        result = result * f64::from(radix) + f64::from(digit);
    }
    result
}
