//! %TypedArray%.prototype accessors and iteration methods

use tracing::trace;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::coercion::to_integer_or_infinity;
use crate::prelude::*;
use crate::value::{Guarded, JsObjectRef, JsValue};

use super::array_buffer::{decode_element, element_value, encode_element};

/// Initialize %TypedArray%.prototype with all view methods.
/// The prototype object must already exist in `interp.typed_array_prototype`.
pub fn init_typed_array_prototype(interp: &mut Interpreter) {
    let proto = interp.typed_array_prototype.clone();

    // Accessors
    interp.register_getter(&proto, "length", typed_array_length);
    interp.register_getter(&proto, "buffer", typed_array_buffer);
    interp.register_getter(&proto, "byteLength", typed_array_byte_length);
    interp.register_getter(&proto, "byteOffset", typed_array_byte_offset);

    // Element access
    interp.register_method(&proto, "at", typed_array_at, 1);

    // Iteration methods
    interp.register_method(&proto, "every", typed_array_every, 1);
    interp.register_method(&proto, "find", typed_array_find, 1);
    interp.register_method(&proto, "findIndex", typed_array_find_index, 1);
    interp.register_method(&proto, "forEach", typed_array_for_each, 1);
}

fn this_typed_array(this: &JsValue) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if obj.borrow().is_typed_array() => Ok(obj.clone()),
        _ => Err(JsError::type_error("Not a TypedArray")),
    }
}

/// Current element count of a view (0 once its buffer is detached)
fn element_length(view: &JsObjectRef) -> usize {
    view.borrow()
        .as_typed_array()
        .map_or(0, |data| data.element_length())
}

/// Read element `index` of a view.
///
/// Detachment and bounds are checked on every call, never cached.
pub fn typed_array_get(view: &JsObjectRef, index: usize) -> Result<JsValue, JsError> {
    let view = view.borrow();
    let data = view
        .as_typed_array()
        .ok_or_else(|| JsError::type_error("Not a TypedArray"))?;
    let buffer = data.buffer.borrow();
    let bytes = match buffer.as_array_buffer() {
        Some(buf) if !buf.is_detached() => &buf.bytes,
        _ => {
            return Err(JsError::type_error(format!(
                "Cannot read from {} backed by a detached ArrayBuffer",
                data.kind.name()
            )));
        }
    };
    if index >= data.declared_length {
        return Err(JsError::range_error(format!(
            "Index {} out of range for {} of length {}",
            index,
            data.kind.name(),
            data.declared_length
        )));
    }

    let size = data.kind.element_size();
    let start = data.byte_offset + index * size;
    bytes
        .get(start..start + size)
        .and_then(|slot| decode_element(data.kind, slot))
        .ok_or_else(|| JsError::internal_error("typed array view exceeds its buffer"))
}

/// Store `value` into element `index` of a view.
///
/// The value is converted before the buffer is inspected, so a failed
/// conversion leaves the buffer untouched.
pub fn typed_array_set(view: &JsObjectRef, index: usize, value: &JsValue) -> Result<(), JsError> {
    let view = view.borrow();
    let data = view
        .as_typed_array()
        .ok_or_else(|| JsError::type_error("Not a TypedArray"))?;
    let encoded = encode_element(data.kind, element_value(data.kind, value)?);

    let mut buffer = data.buffer.borrow_mut();
    let bytes = match buffer.as_array_buffer_mut() {
        Some(buf) if !buf.is_detached() => &mut buf.bytes,
        _ => {
            return Err(JsError::type_error(format!(
                "Cannot write to {} backed by a detached ArrayBuffer",
                data.kind.name()
            )));
        }
    };
    if index >= data.declared_length {
        return Err(JsError::range_error(format!(
            "Index {} out of range for {} of length {}",
            index,
            data.kind.name(),
            data.declared_length
        )));
    }

    let size = data.kind.element_size();
    let start = data.byte_offset + index * size;
    let slot = bytes
        .get_mut(start..start + size)
        .ok_or_else(|| JsError::internal_error("typed array view exceeds its buffer"))?;
    for (dst, src) in slot.iter_mut().zip(encoded) {
        *dst = src;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Accessors
// ═══════════════════════════════════════════════════════════════════════════════

pub fn typed_array_length(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let view = this_typed_array(&this)?;
    Ok(Guarded::unguarded(JsValue::Number(
        element_length(&view) as f64,
    )))
}

/// The buffer is returned even when detached
pub fn typed_array_buffer(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let view = this_typed_array(&this)?;
    let buffer = view
        .borrow()
        .as_typed_array()
        .map(|data| JsValue::Object(data.buffer.clone()))
        .unwrap_or_default();
    // Buffer is reachable from the view, which the caller owns
    Ok(Guarded::unguarded(buffer))
}

pub fn typed_array_byte_length(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let view = this_typed_array(&this)?;
    let byte_length = view
        .borrow()
        .as_typed_array()
        .map_or(0, |data| data.byte_length());
    Ok(Guarded::unguarded(JsValue::Number(byte_length as f64)))
}

pub fn typed_array_byte_offset(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
) -> Result<Guarded, JsError> {
    let view = this_typed_array(&this)?;
    let byte_offset = view
        .borrow()
        .as_typed_array()
        .map_or(0, |data| data.byte_offset());
    Ok(Guarded::unguarded(JsValue::Number(byte_offset as f64)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Relative indexing
// ═══════════════════════════════════════════════════════════════════════════════

pub fn typed_array_at(
    _interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<Guarded, JsError> {
    let view = this_typed_array(&this)?;
    let length = element_length(&view);

    let relative = to_integer_or_infinity(args.first().unwrap_or(&JsValue::Undefined))?;
    let Some(index) = resolve_relative_index(length, relative) else {
        return Ok(Guarded::unguarded(JsValue::Undefined));
    };
    Ok(Guarded::unguarded(typed_array_get(&view, index)?))
}

/// Resolve an integral relative index against `length`.
///
/// Negative values count back from the end. Infinite input, an index outside
/// `0..length`, and arithmetic that would overflow all resolve to `None`.
pub fn resolve_relative_index(length: usize, relative: f64) -> Option<usize> {
    if !relative.is_finite() {
        return None;
    }
    let index = if relative >= 0.0 {
        integral_to_usize(relative)?
    } else {
        length.checked_sub(integral_to_usize(-relative)?)?
    };
    (index < length).then_some(index)
}

/// Convert a non-negative integral f64, failing instead of saturating
fn integral_to_usize(n: f64) -> Option<usize> {
    // u64::MAX as f64 rounds up to 2^64, which is itself out of range
    if n >= u64::MAX as f64 {
        return None;
    }
    usize::try_from(n as u64).ok()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Iteration engine
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether the iteration engine should keep visiting elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationDecision {
    Continue,
    Break,
}

/// Visit the elements of `this` with the callback in `args[0]`.
///
/// The element count is snapshotted before the callback is even validated,
/// and bounds the loop. Every fetch re-reads the buffer state, so a callback
/// that detaches the buffer makes the next fetch fail. Any failure ends the
/// loop and is returned as is.
///
/// `reducer` receives `(index, value, callback_result)` and decides whether
/// to continue.
pub fn for_each_item<F>(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    name: &str,
    mut reducer: F,
) -> Result<(), JsError>
where
    F: FnMut(usize, JsValue, JsValue) -> IterationDecision,
{
    let view = this_typed_array(this)?;
    let initial_length = element_length(&view);

    let callback = match args.first() {
        None => {
            return Err(JsError::type_error(format!(
                "{} requires at least one argument",
                name
            )));
        }
        Some(callback) if !callback.is_callable() => {
            return Err(JsError::type_error(format!(
                "{} is not a function",
                callback.to_display_string()
            )));
        }
        Some(callback) => callback.clone(),
    };
    let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);

    // Guard values to prevent GC from collecting them during iterations
    let _callback_guard = interp.guard_value(&callback);
    let _this_arg_guard = interp.guard_value(&this_arg);
    let _view_guard = interp.guard_value(this);

    for index in 0..initial_length {
        let value = typed_array_get(&view, index).inspect_err(|err| {
            trace!(operation = name, index, %err, "typed array iteration aborted on fetch");
        })?;

        let Guarded {
            value: result,
            guard: _result_guard,
        } = interp
            .call_function(
                callback.clone(),
                this_arg.clone(),
                &[value.clone(), JsValue::Number(index as f64), this.clone()],
            )
            .inspect_err(|err| {
                trace!(operation = name, index, %err, "typed array iteration aborted in callback");
            })?;

        if reducer(index, value, result) == IterationDecision::Break {
            trace!(operation = name, index, "typed array iteration stopped early");
            break;
        }
    }

    Ok(())
}

pub fn typed_array_every(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<Guarded, JsError> {
    let mut all_truthy = true;
    for_each_item(
        interp,
        &this,
        args,
        "TypedArray.prototype.every",
        |_, _, result| {
            if result.to_boolean() {
                IterationDecision::Continue
            } else {
                all_truthy = false;
                IterationDecision::Break
            }
        },
    )?;
    Ok(Guarded::unguarded(JsValue::Boolean(all_truthy)))
}

pub fn typed_array_find(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<Guarded, JsError> {
    let mut found = JsValue::Undefined;
    for_each_item(
        interp,
        &this,
        args,
        "TypedArray.prototype.find",
        |_, value, result| {
            if result.to_boolean() {
                found = value;
                IterationDecision::Break
            } else {
                IterationDecision::Continue
            }
        },
    )?;
    // Elements are primitives
    Ok(Guarded::unguarded(found))
}

pub fn typed_array_find_index(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<Guarded, JsError> {
    let mut found_index: Option<usize> = None;
    for_each_item(
        interp,
        &this,
        args,
        "TypedArray.prototype.findIndex",
        |index, _, result| {
            if result.to_boolean() {
                found_index = Some(index);
                IterationDecision::Break
            } else {
                IterationDecision::Continue
            }
        },
    )?;
    let index = found_index.map_or(-1.0, |index| index as f64);
    Ok(Guarded::unguarded(JsValue::Number(index)))
}

pub fn typed_array_for_each(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<Guarded, JsError> {
    for_each_item(
        interp,
        &this,
        args,
        "TypedArray.prototype.forEach",
        |_, _, _| IterationDecision::Continue,
    )?;
    Ok(Guarded::unguarded(JsValue::Undefined))
}
