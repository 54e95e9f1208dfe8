//! Typed array views and Intl.NumberFormat for an embeddable JavaScript runtime
//!
//! The crate provides the built-in layer that sits between an evaluator and
//! its heap: typed array views over detachable `ArrayBuffer`s with the
//! `%TypedArray%.prototype` iteration methods, and `Intl.NumberFormat` whose
//! bound `format` function is a traced heap object.
//!
//! # Example
//!
//! ```
//! use jsview::{Interpreter, JsValue, TypedArrayKind};
//!
//! let mut interp = Interpreter::new();
//! let view = interp
//!     .create_typed_array_from(TypedArrayKind::Int32, &[1.into(), 2.into(), 3.into()])
//!     .unwrap();
//! let last = interp.invoke(&view.value, "at", &[JsValue::from(-1)]).unwrap();
//! assert_eq!(last.value, JsValue::Number(3.0));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod config;
pub mod error;
pub mod gc;
pub mod interpreter;
pub mod prelude;
pub mod string_dict;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{ErrorKind, JsError};
pub use gc::{Gc, GcStats, Guard, Heap};
pub use interpreter::Interpreter;
pub use interpreter::builtins::intl::{NumberFormatOptions, format_numeric};
pub use interpreter::coercion::Numeric;
pub use value::{
    CheapClone, Guarded, JsBigInt, JsObject, JsObjectRef, JsString, JsValue, NumberFormatStyle,
    PropertyKey, TypedArrayKind,
};
