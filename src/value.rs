//! JavaScript value representation
//!
//! The core JsValue type and the heap object model the built-ins operate on.

use crate::error::JsError;
use crate::gc::{Gc, Guard, Heap, Reset, Traceable, Visitor};
use crate::interpreter::Interpreter;
use crate::prelude::*;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data).
pub trait CheapClone: Clone {
    /// Semantically identical to `clone()`, but documents that it is O(1).
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    BigInt(JsBigInt),
    String(JsString),
    Object(JsObjectRef),
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    /// Check if this value is callable (a function)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::BigInt(b) => !b.is_zero(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// Render the value for diagnostics without running any user code.
    pub fn to_display_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::BigInt(b) => format!("{}n", b),
            JsValue::String(s) => s.to_string(),
            JsValue::Object(obj) => match obj.try_borrow_class_name() {
                Some(name) => format!("[object {}]", name),
                None => "[object Object]".to_string(),
            },
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::BigInt(a), JsValue::BigInt(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Gc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Number to string for diagnostics (integral values print without a fraction)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::BigInt(b) => write!(f, "{}n", b),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => {
                let Some(obj) = obj.try_borrow() else {
                    return write!(f, "{{<borrowed>}}");
                };
                match &obj.exotic {
                    ExoticObject::Ordinary => write!(f, "{{...}}"),
                    ExoticObject::Function(func) => {
                        write!(f, "[Function: {}]", func.name().unwrap_or("anonymous"))
                    }
                    ExoticObject::ArrayBuffer(data) => {
                        write!(f, "ArrayBuffer({})", data.byte_length())
                    }
                    ExoticObject::TypedArray(data) => {
                        write!(f, "{}({})", data.kind.name(), data.declared_length)
                    }
                    ExoticObject::NumberFormat(data) => {
                        write!(f, "NumberFormat [{}]", data.locale)
                    }
                }
            }
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsBigInt> for JsValue {
    fn from(b: JsBigInt) -> Self {
        JsValue::BigInt(b)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// Reference-counted string for efficient string handling
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString(Rc<str>);

// JsString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arbitrary-precision integer primitive.
///
/// Stored as canonical decimal text: optional `-`, no leading zeros, and
/// `"0"` for zero. The runtime only moves BigInts around; it does no
/// arithmetic on them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsBigInt(Rc<str>);

impl CheapClone for JsBigInt {}

impl JsBigInt {
    /// Parse an optionally signed decimal integer literal.
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            return Some(JsBigInt("0".into()));
        }
        if negative {
            Some(JsBigInt(format!("-{}", trimmed).into()))
        } else {
            Some(JsBigInt(trimmed.into()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        &*self.0 == "0"
    }

    pub fn is_negative(&self) -> bool {
        self.0.starts_with('-')
    }

    /// The value modulo 2^64 (two's complement for negatives).
    pub fn to_u64_wrapping(&self) -> u64 {
        let digits = self.0.trim_start_matches('-');
        let magnitude = digits.bytes().fold(0u64, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(u64::from(digit - b'0'))
        });
        if self.is_negative() {
            magnitude.wrapping_neg()
        } else {
            magnitude
        }
    }
}

impl From<i64> for JsBigInt {
    fn from(n: i64) -> Self {
        JsBigInt(n.to_string().into())
    }
}

impl From<u64> for JsBigInt {
    fn from(n: u64) -> Self {
        JsBigInt(n.to_string().into())
    }
}

impl From<i128> for JsBigInt {
    fn from(n: i128) -> Self {
        JsBigInt(n.to_string().into())
    }
}

impl fmt::Debug for JsBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n", self.0)
    }
}

impl fmt::Display for JsBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a heap-allocated object (GC-managed)
pub type JsObjectRef = Gc<JsObject>;

impl<T: Traceable> CheapClone for Gc<T> {}

impl JsObjectRef {
    fn try_borrow_class_name(&self) -> Option<&'static str> {
        if !self.is_alive() {
            return None;
        }
        self.try_borrow().map(|obj| obj.class_name())
    }
}

/// Reset implementation for JsObject - used by the GC when an object is swept.
impl Reset for JsObject {
    fn reset(&mut self) {
        self.prototype = None;
        self.extensible = true;
        self.properties.clear();
        self.exotic = ExoticObject::Ordinary;
    }
}

impl Traceable for JsObject {
    fn trace(&self, visitor: &mut Visitor<'_, Self>) {
        visitor.visit_opt(self.prototype.as_ref());

        for prop in self.properties.values() {
            if let JsValue::Object(obj) = &prop.value {
                visitor.visit(obj);
            }
            visitor.visit_opt(prop.getter.as_ref());
            visitor.visit_opt(prop.setter.as_ref());
        }

        match &self.exotic {
            ExoticObject::Ordinary | ExoticObject::ArrayBuffer(_) => {}
            ExoticObject::Function(func) => func.trace(visitor),
            ExoticObject::TypedArray(data) => visitor.visit(&data.buffer),
            ExoticObject::NumberFormat(data) => visitor.visit_opt(data.bound_format.as_ref()),
        }
    }
}

/// A JavaScript object
#[derive(Debug)]
pub struct JsObject {
    /// Prototype link
    pub prototype: Option<JsObjectRef>,
    /// Whether the object can have properties added
    pub extensible: bool,
    /// Own properties in insertion order
    pub properties: IndexMap<PropertyKey, Property>,
    /// Exotic object behavior
    pub exotic: ExoticObject,
}

impl JsObject {
    /// Create a new ordinary object
    pub fn new() -> Self {
        Self {
            prototype: None,
            extensible: true,
            properties: index_map_new(),
            exotic: ExoticObject::Ordinary,
        }
    }

    /// Check if this object is callable
    pub fn is_callable(&self) -> bool {
        matches!(self.exotic, ExoticObject::Function(_))
    }

    /// The built-in tag used by `Object.prototype.toString`
    pub fn class_name(&self) -> &'static str {
        match &self.exotic {
            ExoticObject::Ordinary => "Object",
            ExoticObject::Function(_) => "Function",
            ExoticObject::ArrayBuffer(_) => "ArrayBuffer",
            ExoticObject::TypedArray(data) => data.kind.name(),
            ExoticObject::NumberFormat(_) => "Intl.NumberFormat",
        }
    }

    /// Get an own property
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Get a property descriptor, searching the prototype chain
    /// Returns (property, found_in_prototype)
    pub fn get_property_descriptor(&self, key: &PropertyKey) -> Option<(Property, bool)> {
        if let Some(prop) = self.properties.get(key) {
            return Some((prop.clone(), false));
        }

        if let Some(ref proto) = self.prototype {
            if let Some((prop, _)) = proto.borrow().get_property_descriptor(key) {
                return Some((prop, true));
            }
        }

        None
    }

    /// Set a data property, respecting writability and extensibility
    pub fn set_property(&mut self, key: PropertyKey, value: JsValue) {
        if let Some(prop) = self.properties.get_mut(&key) {
            if prop.writable && !prop.is_accessor() {
                prop.value = value;
            }
        } else if self.extensible {
            self.properties.insert(key, Property::data(value));
        }
    }

    /// Define a property with attributes
    pub fn define_property(&mut self, key: PropertyKey, prop: Property) {
        self.properties.insert(key, prop);
    }

    pub fn is_typed_array(&self) -> bool {
        matches!(self.exotic, ExoticObject::TypedArray(_))
    }

    pub fn as_typed_array(&self) -> Option<&TypedArrayData> {
        match &self.exotic {
            ExoticObject::TypedArray(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_array_buffer(&self) -> Option<&ArrayBufferData> {
        match &self.exotic {
            ExoticObject::ArrayBuffer(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_array_buffer_mut(&mut self) -> Option<&mut ArrayBufferData> {
        match &mut self.exotic {
            ExoticObject::ArrayBuffer(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_number_format(&self) -> Option<&NumberFormatData> {
        match &self.exotic {
            ExoticObject::NumberFormat(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_number_format_mut(&mut self) -> Option<&mut NumberFormatData> {
        match &mut self.exotic {
            ExoticObject::NumberFormat(data) => Some(data),
            _ => None,
        }
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Property key (string or array index)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
}

impl PropertyKey {
    /// Check if this key equals a string literal (avoids allocation)
    #[inline]
    pub fn eq_str(&self, s: &str) -> bool {
        match self {
            PropertyKey::String(js_str) => js_str.as_str() == s,
            PropertyKey::Index(_) => false,
        }
    }
}

impl From<&str> for PropertyKey {
    #[inline]
    fn from(s: &str) -> Self {
        // Fast path: check first char is a digit before parsing
        if s.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
            if let Ok(idx) = s.parse::<u32>() {
                // Verify it's canonical (no leading zeros except "0")
                if idx.to_string() == s {
                    return PropertyKey::Index(idx);
                }
            }
        }
        PropertyKey::String(JsString::from(s))
    }
}

impl From<JsString> for PropertyKey {
    #[inline]
    fn from(s: JsString) -> Self {
        match PropertyKey::from(s.as_str()) {
            PropertyKey::Index(idx) => PropertyKey::Index(idx),
            PropertyKey::String(_) => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(idx: u32) -> Self {
        PropertyKey::Index(idx)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Object property descriptor
#[derive(Debug, Clone)]
pub struct Property {
    pub value: JsValue,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
    /// Getter function (for accessor properties)
    pub getter: Option<JsObjectRef>,
    /// Setter function (for accessor properties)
    pub setter: Option<JsObjectRef>,
}

impl Property {
    pub fn data(value: JsValue) -> Self {
        Self::with_attributes(value, true, true, true)
    }

    /// Built-in method slot: writable and configurable, not enumerable
    pub fn builtin(value: JsValue) -> Self {
        Self::with_attributes(value, true, false, true)
    }

    /// Built-in accessor: getter/setter, configurable, not enumerable
    pub fn accessor(getter: Option<JsObjectRef>, setter: Option<JsObjectRef>) -> Self {
        Self {
            value: JsValue::Undefined,
            writable: false,
            enumerable: false,
            configurable: true,
            getter,
            setter,
        }
    }

    /// Check if this is an accessor property (has getter or setter)
    pub fn is_accessor(&self) -> bool {
        self.getter.is_some() || self.setter.is_some()
    }

    /// Create a property with custom attributes
    pub fn with_attributes(
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value,
            writable,
            enumerable,
            configurable,
            getter: None,
            setter: None,
        }
    }
}

/// Exotic object behavior.
///
/// This is a closed set: receiver checks such as "is this a typed array" are
/// tag matches on this enum.
#[derive(Debug)]
pub enum ExoticObject {
    Ordinary,
    Function(JsFunction),
    ArrayBuffer(ArrayBufferData),
    TypedArray(TypedArrayData),
    NumberFormat(NumberFormatData),
}

// ═══════════════════════════════════════════════════════════════════════════════
// ArrayBuffer / TypedArray
// ═══════════════════════════════════════════════════════════════════════════════

/// Backing store of an ArrayBuffer.
#[derive(Debug, Default)]
pub struct ArrayBufferData {
    pub bytes: Vec<u8>,
    /// Once set, never cleared
    detached: bool,
}

impl ArrayBufferData {
    pub fn new(byte_length: usize) -> Self {
        Self {
            bytes: vec![0; byte_length],
            detached: false,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn byte_length(&self) -> usize {
        if self.detached { 0 } else { self.bytes.len() }
    }

    /// Release the byte store. Irreversible.
    pub fn detach(&mut self) {
        self.bytes = Vec::new();
        self.detached = true;
    }
}

/// Element type of a typed array view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub fn element_size(self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    /// Whether elements are BigInts rather than Numbers
    pub fn is_bigint(self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }
}

/// A typed array view over a (possibly shared) ArrayBuffer.
///
/// Only `buffer`'s detached flag ever changes. Every length query reads it
/// at the moment of the call; nothing here is cached.
#[derive(Debug)]
pub struct TypedArrayData {
    pub kind: TypedArrayKind,
    pub buffer: JsObjectRef,
    pub byte_offset: usize,
    pub declared_length: usize,
}

impl TypedArrayData {
    pub fn is_detached(&self) -> bool {
        self.buffer
            .borrow()
            .as_array_buffer()
            .is_none_or(ArrayBufferData::is_detached)
    }

    /// Element count, 0 once the buffer is detached
    pub fn element_length(&self) -> usize {
        if self.is_detached() {
            0
        } else {
            self.declared_length
        }
    }

    pub fn byte_length(&self) -> usize {
        self.element_length() * self.kind.element_size()
    }

    pub fn byte_offset(&self) -> usize {
        if self.is_detached() {
            0
        } else {
            self.byte_offset
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Intl.NumberFormat
// ═══════════════════════════════════════════════════════════════════════════════

/// Formatting style of a NumberFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormatStyle {
    #[default]
    Decimal,
    Percent,
}

impl NumberFormatStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberFormatStyle::Decimal => "decimal",
            NumberFormatStyle::Percent => "percent",
        }
    }
}

/// Internal slots of an Intl.NumberFormat object
#[derive(Debug)]
pub struct NumberFormatData {
    pub locale: JsString,
    pub style: NumberFormatStyle,
    pub minimum_fraction_digits: u8,
    pub maximum_fraction_digits: u8,
    pub use_grouping: bool,
    /// Cached result of the `format` getter
    pub bound_format: Option<JsObjectRef>,
}

impl Default for NumberFormatData {
    fn default() -> Self {
        Self {
            locale: JsString::from("en-US"),
            style: NumberFormatStyle::Decimal,
            minimum_fraction_digits: 0,
            maximum_fraction_digits: 3,
            use_grouping: true,
            bound_format: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════════════

/// Function representation
#[derive(Debug, Clone)]
pub enum JsFunction {
    /// Built-in implemented in Rust
    Native(NativeFunction),
    /// Embedder-supplied closure, standing in for user code
    Host(HostFunction),
    /// Intl.NumberFormat bound format function (has internal [[NumberFormat]] slot)
    NumberFormat(JsObjectRef),
}

impl JsFunction {
    pub fn name(&self) -> Option<&str> {
        match self {
            JsFunction::Native(f) => Some(f.name.as_ref()),
            JsFunction::Host(f) => Some(f.name.as_ref()),
            JsFunction::NumberFormat(_) => None,
        }
    }

    /// Report the heap references this function closes over.
    pub fn trace(&self, visitor: &mut Visitor<'_, JsObject>) {
        match self {
            JsFunction::Native(_) | JsFunction::Host(_) => {}
            JsFunction::NumberFormat(number_format) => visitor.visit(number_format),
        }
    }
}

/// Native function signature
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<Guarded, JsError>;

/// Native function wrapper
#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    pub arity: usize,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Host closure signature.
///
/// The collector cannot see into a closure, so a host function must not
/// capture `JsObjectRef`s it expects to stay alive; root them with a
/// `Guard` owned by the embedder instead.
pub type HostFn = dyn Fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError>;

#[derive(Clone)]
pub struct HostFunction {
    pub name: JsString,
    pub func: Rc<HostFn>,
    pub arity: usize,
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Guarded values
// ═══════════════════════════════════════════════════════════════════════════════

/// A value together with the guard that keeps it alive.
///
/// Native functions return `Guarded` so that a freshly allocated result
/// survives until the caller has stored it somewhere reachable.
pub struct Guarded {
    pub value: JsValue,
    pub guard: Option<Guard<JsObject>>,
}

impl Guarded {
    /// A value that needs no rooting (primitive, or already reachable)
    pub fn unguarded(value: JsValue) -> Self {
        Self { value, guard: None }
    }

    pub fn with_guard(value: JsValue, guard: Guard<JsObject>) -> Self {
        Self {
            value,
            guard: Some(guard),
        }
    }

    /// Root `value` with a fresh guard if it is an object
    pub fn from_value(value: JsValue, heap: &Heap<JsObject>) -> Self {
        match &value {
            JsValue::Object(obj) => {
                let guard = heap.create_guard();
                guard.guard(obj);
                Self::with_guard(value, guard)
            }
            _ => Self::unguarded(value),
        }
    }
}

impl fmt::Debug for Guarded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guarded({:?})", self.value)
    }
}
