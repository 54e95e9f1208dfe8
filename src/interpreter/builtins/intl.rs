//! Intl.NumberFormat built-in methods
//!
//! A NumberFormat and its bound `format` function point at each other:
//! the format object caches the function in `bound_format`, and the function
//! holds its NumberFormat in `JsFunction::NumberFormat`. Both edges are
//! traced, so the pair lives exactly as long as either end is reachable.

use serde::Deserialize;
use tracing::debug;

use crate::error::JsError;
use crate::gc::Guard;
use crate::interpreter::Interpreter;
use crate::interpreter::coercion::{Numeric, to_numeric};
use crate::prelude::*;
use crate::value::{
    Guarded, JsFunction, JsObject, JsObjectRef, JsString, JsValue, NumberFormatData,
    NumberFormatStyle, Property,
};

/// Fraction digit options accept 0..=20
const MAX_FRACTION_DIGITS: u8 = 20;

/// Initialize Intl.NumberFormat.prototype.
/// The prototype object must already exist in `interp.number_format_prototype`.
pub fn init_number_format_prototype(interp: &mut Interpreter) {
    let proto = interp.number_format_prototype.clone();

    interp.register_getter(&proto, "format", number_format_format);
    interp.register_method(&proto, "resolvedOptions", number_format_resolved_options, 0);
}

/// Options accepted when creating a NumberFormat, in their JS spelling:
///
/// ```
/// use jsview::NumberFormatOptions;
///
/// let options = NumberFormatOptions::from_json(r#"{ "style": "percent" }"#).unwrap();
/// assert_eq!(options.maximum_fraction_digits, None);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct NumberFormatOptions {
    pub locale: Option<String>,
    pub style: NumberFormatStyle,
    pub minimum_fraction_digits: Option<u8>,
    pub maximum_fraction_digits: Option<u8>,
    pub use_grouping: Option<bool>,
}

impl NumberFormatOptions {
    pub fn from_json(json: &str) -> Result<Self, JsError> {
        serde_json::from_str(json).map_err(|err| {
            JsError::type_error(format!("Invalid Intl.NumberFormat options: {}", err))
        })
    }

    /// Fill in defaults and validate the digit range.
    pub fn resolve(self, default_locale: &str) -> Result<NumberFormatData, JsError> {
        let check = |name: &str, digits: Option<u8>| match digits {
            Some(d) if d > MAX_FRACTION_DIGITS => Err(JsError::range_error(format!(
                "{} value is out of range",
                name
            ))),
            _ => Ok(digits),
        };
        let min = check("minimumFractionDigits", self.minimum_fraction_digits)?;
        let max = check("maximumFractionDigits", self.maximum_fraction_digits)?;

        let default_max = match self.style {
            NumberFormatStyle::Decimal => 3,
            NumberFormatStyle::Percent => 0,
        };
        let (minimum_fraction_digits, maximum_fraction_digits) = match (min, max) {
            (Some(min), Some(max)) if min > max => {
                return Err(JsError::range_error(
                    "maximumFractionDigits value is out of range",
                ));
            }
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, min.max(default_max)),
            (None, Some(max)) => (0, max),
            (None, None) => (0, default_max),
        };

        let locale = match self.locale {
            Some(locale) if locale.trim().is_empty() => {
                return Err(JsError::range_error("Incorrect locale information provided"));
            }
            Some(locale) => locale,
            None => default_locale.to_string(),
        };

        Ok(NumberFormatData {
            locale: JsString::from(locale),
            style: self.style,
            minimum_fraction_digits,
            maximum_fraction_digits,
            use_grouping: self.use_grouping.unwrap_or(true),
            bound_format: None,
        })
    }
}

fn this_number_format(this: &JsValue, name: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if obj.borrow().as_number_format().is_some() => Ok(obj.clone()),
        _ => Err(JsError::type_error(format!(
            "Intl.NumberFormat.prototype.{} called on incompatible receiver {}",
            name,
            this.to_display_string()
        ))),
    }
}

/// get Intl.NumberFormat.prototype.format
///
/// Creates the bound format function on first access; later accesses return
/// the same function object.
pub fn number_format_format(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let number_format = this_number_format(&this, "format")?;

    let cached = number_format
        .borrow()
        .as_number_format()
        .and_then(|data| data.bound_format.clone());
    if let Some(bound) = cached {
        // Reachable through the NumberFormat, which the caller owns
        return Ok(Guarded::unguarded(JsValue::Object(bound)));
    }

    let guard = interp.create_guard();
    guard.guard(&number_format);
    let bound = create_number_format_function(interp, &guard, &number_format);
    if let Some(data) = number_format.borrow_mut().as_number_format_mut() {
        data.bound_format = Some(bound.clone());
    }
    guard.unguard(&number_format);
    Ok(Guarded::with_guard(JsValue::Object(bound), guard))
}

/// Allocate a function object that formats numbers with `number_format`.
///
/// Its `length` is 1 (configurable, not writable or enumerable).
pub fn create_number_format_function(
    interp: &mut Interpreter,
    guard: &Guard<JsObject>,
    number_format: &JsObjectRef,
) -> JsObjectRef {
    let func = interp.create_function(guard, JsFunction::NumberFormat(number_format.clone()));
    let length_key = interp.key("length");
    func.borrow_mut().define_property(
        length_key,
        Property::with_attributes(JsValue::Number(1.0), false, false, true),
    );
    debug!(
        number_format = number_format.id(),
        function = func.id(),
        "created bound NumberFormat function"
    );
    func
}

/// Body of a bound format function: ToNumeric, then format as a double
pub fn number_format_function_call(
    _interp: &mut Interpreter,
    number_format: &JsObjectRef,
    args: &[JsValue],
) -> Result<Guarded, JsError> {
    if !number_format.is_alive() {
        return Err(JsError::internal_error(
            "NumberFormat of bound format function has been collected",
        ));
    }

    let value = args.first().unwrap_or(&JsValue::Undefined);
    let x = match to_numeric(value)? {
        Numeric::Number(n) => n,
        Numeric::BigInt(_) => return Err(JsError::not_implemented("BigInt number formatting")),
    };

    let number_format = number_format.borrow();
    let data = number_format.as_number_format().ok_or_else(|| {
        JsError::internal_error("bound format function does not refer to a NumberFormat")
    })?;
    let formatted = format_numeric(data, x);
    Ok(Guarded::unguarded(JsValue::String(JsString::from(formatted))))
}

/// Intl.NumberFormat.prototype.resolvedOptions()
pub fn number_format_resolved_options(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let number_format = this_number_format(&this, "resolvedOptions")?;
    let _this_guard = interp.guard_value(&this);

    let entries = {
        let nf = number_format.borrow();
        let Some(data) = nf.as_number_format() else {
            return Err(JsError::internal_error("NumberFormat lost its internal slots"));
        };
        [
            ("locale", JsValue::String(data.locale.clone())),
            ("style", JsValue::from(data.style.as_str())),
            (
                "minimumFractionDigits",
                JsValue::Number(f64::from(data.minimum_fraction_digits)),
            ),
            (
                "maximumFractionDigits",
                JsValue::Number(f64::from(data.maximum_fraction_digits)),
            ),
            ("useGrouping", JsValue::Boolean(data.use_grouping)),
        ]
    };

    let guard = interp.create_guard();
    let options = interp.create_object(&guard);
    for (name, value) in entries {
        let key = interp.key(name);
        options.borrow_mut().set_property(key, value);
    }
    Ok(Guarded::with_guard(JsValue::Object(options), guard))
}

/// Format `x` with the options of `data`. Total for every f64.
pub fn format_numeric(data: &NumberFormatData, x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }

    let percent = data.style == NumberFormatStyle::Percent;
    let mut magnitude = math::abs(x);
    if percent {
        magnitude *= 100.0;
    }

    let mut body = if magnitude.is_infinite() {
        "∞".to_string()
    } else {
        format_fixed(
            magnitude,
            data.minimum_fraction_digits,
            data.maximum_fraction_digits,
            data.use_grouping,
        )
    };
    if percent {
        body.push('%');
    }

    if x.is_sign_negative() {
        format!("-{}", body)
    } else {
        body
    }
}

/// Render a finite non-negative magnitude with rounding half away from zero.
///
/// Rounding works on the shortest decimal that round-trips to `magnitude`,
/// not on its binary expansion, so `1.005` rounds up and `0.1` never grows
/// trailing digits.
fn format_fixed(magnitude: f64, min_digits: u8, max_digits: u8, grouping: bool) -> String {
    // f64 Display never uses exponent notation
    let text = format!("{}", magnitude);
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let max_digits = usize::from(max_digits);
    let min_digits = usize::from(min_digits);

    let mut digits: Vec<u8> = integer
        .bytes()
        .chain(fraction.bytes().take(max_digits))
        .collect();
    let mut integer_len = integer.len();
    if fraction.as_bytes().get(max_digits).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
            integer_len += 1;
        }
    }

    let fraction_digits = digits.split_off(integer_len);
    let integer: String = digits.into_iter().map(char::from).collect();
    let mut fraction: String = fraction_digits.into_iter().map(char::from).collect();
    while fraction.len() > min_digits && fraction.ends_with('0') {
        fraction.pop();
    }
    while fraction.len() < min_digits {
        fraction.push('0');
    }

    let integer = if grouping {
        group_thousands(&integer)
    } else {
        integer
    };
    if fraction.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, fraction)
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
