//! ArrayBuffer built-in accessors and the element byte codec

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::coercion::{Numeric, to_numeric};
use crate::prelude::*;
use crate::value::{Guarded, JsBigInt, JsObjectRef, JsValue, TypedArrayKind};

/// Initialize ArrayBuffer.prototype.
/// The prototype object must already exist in `interp.array_buffer_prototype`.
pub fn init_array_buffer_prototype(interp: &mut Interpreter) {
    let proto = interp.array_buffer_prototype.clone();

    interp.register_getter(&proto, "byteLength", array_buffer_byte_length);
    interp.register_getter(&proto, "detached", array_buffer_detached);
}

fn this_array_buffer(this: &JsValue, name: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if obj.borrow().as_array_buffer().is_some() => Ok(obj.clone()),
        _ => Err(JsError::type_error(format!(
            "ArrayBuffer.prototype.{} called on incompatible receiver {}",
            name,
            this.to_display_string()
        ))),
    }
}

pub fn array_buffer_byte_length(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let buffer = this_array_buffer(&this, "byteLength")?;
    let byte_length = buffer
        .borrow()
        .as_array_buffer()
        .map_or(0, |data| data.byte_length());
    Ok(Guarded::unguarded(JsValue::Number(byte_length as f64)))
}

pub fn array_buffer_detached(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let buffer = this_array_buffer(&this, "detached")?;
    let detached = buffer
        .borrow()
        .as_array_buffer()
        .is_some_and(|data| data.is_detached());
    Ok(Guarded::unguarded(JsValue::Boolean(detached)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Element codec (little-endian)
// ═══════════════════════════════════════════════════════════════════════════════

/// A JS value already converted for storage in a typed array slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementValue {
    Number(f64),
    /// Two's complement bits of a BigInt, modulo 2^64
    BigInt(u64),
}

/// Convert `value` to what an element of `kind` stores (ToNumber or ToBigInt)
pub fn element_value(kind: TypedArrayKind, value: &JsValue) -> Result<ElementValue, JsError> {
    if kind.is_bigint() {
        let bigint = match value {
            JsValue::BigInt(b) => b.clone(),
            JsValue::Boolean(b) => JsBigInt::from(i64::from(*b)),
            JsValue::String(s) => JsBigInt::parse(s.as_str().trim()).ok_or_else(|| {
                JsError::type_error(format!("Cannot convert {} to a BigInt", s))
            })?,
            other => {
                return Err(JsError::type_error(format!(
                    "Cannot convert {} to a BigInt",
                    other.to_display_string()
                )));
            }
        };
        return Ok(ElementValue::BigInt(bigint.to_u64_wrapping()));
    }

    match to_numeric(value)? {
        Numeric::Number(n) => Ok(ElementValue::Number(n)),
        Numeric::BigInt(_) => Err(JsError::type_error(
            "Cannot convert a BigInt value to a number",
        )),
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.try_into().ok()
}

/// Decode one element from exactly `kind.element_size()` bytes
pub fn decode_element(kind: TypedArrayKind, bytes: &[u8]) -> Option<JsValue> {
    let value = match kind {
        TypedArrayKind::Int8 => JsValue::Number(f64::from(i8::from_le_bytes(le_array(bytes)?))),
        TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => {
            JsValue::Number(f64::from(u8::from_le_bytes(le_array(bytes)?)))
        }
        TypedArrayKind::Int16 => JsValue::Number(f64::from(i16::from_le_bytes(le_array(bytes)?))),
        TypedArrayKind::Uint16 => {
            JsValue::Number(f64::from(u16::from_le_bytes(le_array(bytes)?)))
        }
        TypedArrayKind::Int32 => JsValue::Number(f64::from(i32::from_le_bytes(le_array(bytes)?))),
        TypedArrayKind::Uint32 => {
            JsValue::Number(f64::from(u32::from_le_bytes(le_array(bytes)?)))
        }
        TypedArrayKind::Float32 => {
            JsValue::Number(f64::from(f32::from_le_bytes(le_array(bytes)?)))
        }
        TypedArrayKind::Float64 => JsValue::Number(f64::from_le_bytes(le_array(bytes)?)),
        TypedArrayKind::BigInt64 => {
            JsValue::BigInt(JsBigInt::from(i64::from_le_bytes(le_array(bytes)?)))
        }
        TypedArrayKind::BigUint64 => {
            JsValue::BigInt(JsBigInt::from(u64::from_le_bytes(le_array(bytes)?)))
        }
    };
    Some(value)
}

/// Encode an element. Only the first `kind.element_size()` bytes are meaningful.
pub fn encode_element(kind: TypedArrayKind, value: ElementValue) -> [u8; 8] {
    match value {
        ElementValue::BigInt(bits) => bits.to_le_bytes(),
        ElementValue::Number(n) => match kind {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 => widen([modulo_pow2(n, 8) as u8]),
            TypedArrayKind::Uint8Clamped => widen([clamp_to_u8(n)]),
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => {
                widen((modulo_pow2(n, 16) as u16).to_le_bytes())
            }
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 => {
                widen((modulo_pow2(n, 32) as u32).to_le_bytes())
            }
            TypedArrayKind::Float32 => widen((n as f32).to_le_bytes()),
            TypedArrayKind::Float64 => n.to_le_bytes(),
            // Numbers never reach BigInt kinds; element_value rejects them
            TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => [0; 8],
        },
    }
}

fn widen<const N: usize>(bytes: [u8; N]) -> [u8; 8] {
    let mut out = [0; 8];
    for (dst, src) in out.iter_mut().zip(bytes) {
        *dst = src;
    }
    out
}

/// Truncate and reduce modulo 2^bits (bits <= 32). Non-finite values become 0.
fn modulo_pow2(n: f64, bits: i32) -> u64 {
    if !n.is_finite() {
        return 0;
    }
    math::rem_euclid(math::trunc(n), math::powi(2.0, bits)) as u64
}

/// ToUint8Clamp: clamp to 0..=255, ties round to even
fn clamp_to_u8(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let floor = math::floor(n);
    let fraction = n - floor;
    let rounded = if fraction < 0.5 {
        floor
    } else if fraction > 0.5 || math::rem_euclid(floor, 2.0) != 0.0 {
        floor + 1.0
    } else {
        floor
    };
    rounded as u8
}
