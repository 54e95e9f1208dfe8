//! Interpreter state and the object operations shared by the built-ins

// Builtin function implementations (split into separate files)
pub mod builtins;

// ToNumeric and friends
pub mod coercion;

use builtins::*;

use crate::config::RuntimeConfig;
use crate::error::JsError;
use crate::gc::{GcStats, Guard, Heap};
use crate::prelude::*;
use crate::string_dict::StringDict;
use crate::value::{
    ArrayBufferData, CheapClone, ExoticObject, Guarded, HostFunction, JsFunction, JsObject,
    JsObjectRef, JsString, JsValue, NativeFn, NativeFunction, Property, PropertyKey,
    TypedArrayData, TypedArrayKind,
};

/// The interpreter state
pub struct Interpreter {
    heap: Heap<JsObject>,
    /// Roots the built-in prototypes for the interpreter's lifetime
    root_guard: Guard<JsObject>,
    string_dict: StringDict,
    config: RuntimeConfig,

    /// Object.prototype
    pub object_prototype: JsObjectRef,
    /// Function.prototype for all function objects
    pub function_prototype: JsObjectRef,
    /// ArrayBuffer.prototype
    pub array_buffer_prototype: JsObjectRef,
    /// %TypedArray%.prototype, shared by every view kind
    pub typed_array_prototype: JsObjectRef,
    /// Intl.NumberFormat.prototype
    pub number_format_prototype: JsObjectRef,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create an interpreter with the built-in prototypes installed
    pub fn with_config(config: RuntimeConfig) -> Self {
        let heap: Heap<JsObject> = Heap::new();
        // Nothing is reachable yet, so no collection may run while bootstrapping
        heap.set_gc_threshold(0);

        let root_guard = heap.create_guard();
        let object_prototype = root_guard.alloc();
        let derived_prototype = || {
            let proto = root_guard.alloc();
            proto.borrow_mut().prototype = Some(object_prototype.clone());
            proto
        };
        let function_prototype = derived_prototype();
        let array_buffer_prototype = derived_prototype();
        let typed_array_prototype = derived_prototype();
        let number_format_prototype = derived_prototype();

        let mut interp = Self {
            heap,
            root_guard,
            string_dict: StringDict::with_builtin_names(),
            config,
            object_prototype,
            function_prototype,
            array_buffer_prototype,
            typed_array_prototype,
            number_format_prototype,
        };

        init_array_buffer_prototype(&mut interp);
        init_typed_array_prototype(&mut interp);
        init_number_format_prototype(&mut interp);

        interp.heap.set_gc_threshold(interp.config.gc_threshold);
        tracing::debug!(
            gc_threshold = interp.config.gc_threshold,
            roots = interp.root_guard.len(),
            "interpreter initialized"
        );
        interp
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn heap(&self) -> &Heap<JsObject> {
        &self.heap
    }

    /// Create a guard for rooting objects across allocating operations
    pub fn create_guard(&self) -> Guard<JsObject> {
        self.heap.create_guard()
    }

    /// Intern a string in the dictionary, returning a shared JsString.
    #[inline]
    pub fn intern(&mut self, s: &str) -> JsString {
        self.string_dict.get_or_insert(s)
    }

    /// Create a PropertyKey from an interned string.
    #[inline]
    pub fn key(&mut self, s: &str) -> PropertyKey {
        PropertyKey::String(self.string_dict.get_or_insert(s))
    }

    // ═══════════════════════════════════════════════════════════════
    // Object creation
    // ═══════════════════════════════════════════════════════════════

    fn alloc_object(
        &self,
        guard: &Guard<JsObject>,
        prototype: &JsObjectRef,
        exotic: ExoticObject,
    ) -> JsObjectRef {
        let obj = guard.alloc();
        {
            let mut o = obj.borrow_mut();
            o.prototype = Some(prototype.cheap_clone());
            o.exotic = exotic;
        }
        obj
    }

    /// Create a plain object with the proper prototype
    pub fn create_object(&mut self, guard: &Guard<JsObject>) -> JsObjectRef {
        self.alloc_object(guard, &self.object_prototype, ExoticObject::Ordinary)
    }

    /// Create a function object with the proper prototype
    pub fn create_function(&mut self, guard: &Guard<JsObject>, func: JsFunction) -> JsObjectRef {
        self.alloc_object(guard, &self.function_prototype, ExoticObject::Function(func))
    }

    /// Create a native function object with `name` and `length` installed
    pub fn create_native_function(
        &mut self,
        guard: &Guard<JsObject>,
        name: &str,
        func: NativeFn,
        arity: usize,
    ) -> JsObjectRef {
        let name = self.intern(name);
        let f = self.create_function(
            guard,
            JsFunction::Native(NativeFunction {
                name: name.cheap_clone(),
                func,
                arity,
            }),
        );
        self.define_function_metadata(&f, name, arity);
        f
    }

    /// Wrap a Rust closure as a callable JS function.
    ///
    /// Host functions are how an embedder supplies callbacks to the iteration
    /// methods; they may reenter the interpreter, detach buffers, or fail.
    pub fn create_host_function<F>(
        &mut self,
        guard: &Guard<JsObject>,
        name: &str,
        arity: usize,
        func: F,
    ) -> JsObjectRef
    where
        F: Fn(&mut Interpreter, JsValue, &[JsValue]) -> Result<JsValue, JsError> + 'static,
    {
        let name = self.intern(name);
        let f = self.create_function(
            guard,
            JsFunction::Host(HostFunction {
                name: name.cheap_clone(),
                func: Rc::new(func),
                arity,
            }),
        );
        self.define_function_metadata(&f, name, arity);
        f
    }

    fn define_function_metadata(&mut self, func: &JsObjectRef, name: JsString, arity: usize) {
        let length_key = self.key("length");
        let name_key = self.key("name");
        let mut f = func.borrow_mut();
        f.define_property(
            length_key,
            Property::with_attributes(JsValue::Number(arity as f64), false, false, true),
        );
        f.define_property(
            name_key,
            Property::with_attributes(JsValue::String(name), false, false, true),
        );
    }

    /// Register a native method on a prototype object
    pub fn register_method(&mut self, obj: &JsObjectRef, name: &str, func: NativeFn, arity: usize) {
        let guard = self.heap.create_guard();
        let f = self.create_native_function(&guard, name, func, arity);
        let key = self.key(name);
        obj.borrow_mut()
            .define_property(key, Property::builtin(JsValue::Object(f)));
    }

    /// Register a getter-only accessor on a prototype object
    pub fn register_getter(&mut self, obj: &JsObjectRef, name: &str, func: NativeFn) {
        let guard = self.heap.create_guard();
        let getter = self.create_native_function(&guard, &format!("get {}", name), func, 0);
        let key = self.key(name);
        obj.borrow_mut()
            .define_property(key, Property::accessor(Some(getter), None));
    }

    /// Guard a JsValue if it contains an object.
    ///
    /// Returns Some(Guard) if the value is an object, None otherwise.
    /// Use this to protect values that need to survive across allocating operations.
    pub fn guard_value(&self, value: &JsValue) -> Option<Guard<JsObject>> {
        if let JsValue::Object(obj) = value {
            let guard = self.heap.create_guard();
            guard.guard(obj);
            Some(guard)
        } else {
            None
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Property access and calls
    // ═══════════════════════════════════════════════════════════════

    /// [[Get]]: walk the prototype chain, running getters against `target`
    pub fn get(&mut self, target: &JsValue, key: &PropertyKey) -> Result<Guarded, JsError> {
        let JsValue::Object(obj) = target else {
            if target.is_null_or_undefined() {
                return Err(JsError::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    target.to_display_string(),
                    key
                )));
            }
            return Ok(Guarded::unguarded(JsValue::Undefined));
        };

        let descriptor = obj.borrow().get_property_descriptor(key);
        match descriptor {
            None => Ok(Guarded::unguarded(JsValue::Undefined)),
            Some((prop, _)) if prop.is_accessor() => match prop.getter {
                Some(getter) => self.call_function(JsValue::Object(getter), target.clone(), &[]),
                None => Ok(Guarded::unguarded(JsValue::Undefined)),
            },
            Some((prop, _)) => Ok(Guarded::from_value(prop.value, &self.heap)),
        }
    }

    pub fn get_named(&mut self, target: &JsValue, name: &str) -> Result<Guarded, JsError> {
        let key = self.key(name);
        self.get(target, &key)
    }

    /// Look up `name` on `target` and call it with `target` as `this`
    pub fn invoke(
        &mut self,
        target: &JsValue,
        name: &str,
        args: &[JsValue],
    ) -> Result<Guarded, JsError> {
        let _target_guard = self.guard_value(target);
        let Guarded {
            value: method,
            guard: _method_guard,
        } = self.get_named(target, name)?;
        self.call_function(method, target.clone(), args)
    }

    /// Call a function value.
    ///
    /// The callee and arguments must be kept alive by the caller.
    pub fn call_function(
        &mut self,
        callee: JsValue,
        this_value: JsValue,
        args: &[JsValue],
    ) -> Result<Guarded, JsError> {
        let func = match &callee {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Function(f) => Some(f.clone()),
                _ => None,
            },
            _ => None,
        };
        let Some(func) = func else {
            return Err(JsError::type_error(format!(
                "{} is not a function",
                callee.to_display_string()
            )));
        };

        match func {
            JsFunction::Native(native) => (native.func)(self, this_value, args),
            JsFunction::Host(host) => {
                let value = (host.func)(self, this_value, args)?;
                Ok(Guarded::from_value(value, &self.heap))
            }
            JsFunction::NumberFormat(number_format) => {
                number_format_function_call(self, &number_format, args)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // ArrayBuffer / TypedArray
    // ═══════════════════════════════════════════════════════════════

    /// Allocate a zero-filled ArrayBuffer
    pub fn create_array_buffer(&mut self, byte_length: usize) -> Guarded {
        let guard = self.heap.create_guard();
        let buffer = self.alloc_object(
            &guard,
            &self.array_buffer_prototype,
            ExoticObject::ArrayBuffer(ArrayBufferData::new(byte_length)),
        );
        Guarded::with_guard(JsValue::Object(buffer), guard)
    }

    /// Detach an ArrayBuffer. Every view over it reads as empty from now on.
    pub fn detach_array_buffer(&mut self, buffer: &JsValue) -> Result<(), JsError> {
        let JsValue::Object(obj) = buffer else {
            return Err(JsError::type_error("Not an ArrayBuffer"));
        };
        let mut obj = obj.borrow_mut();
        let Some(data) = obj.as_array_buffer_mut() else {
            return Err(JsError::type_error("Not an ArrayBuffer"));
        };
        if data.is_detached() {
            return Ok(());
        }
        let byte_length = data.byte_length();
        data.detach();
        tracing::debug!(byte_length, "array buffer detached");
        Ok(())
    }

    /// Create a view of `length` elements over `buffer` starting at `byte_offset`
    pub fn create_typed_array(
        &mut self,
        kind: TypedArrayKind,
        buffer: &JsValue,
        byte_offset: usize,
        length: usize,
    ) -> Result<Guarded, JsError> {
        let JsValue::Object(buffer_obj) = buffer else {
            return Err(JsError::type_error(format!(
                "{} is not an ArrayBuffer",
                buffer.to_display_string()
            )));
        };

        let buffer_length = {
            let b = buffer_obj.borrow();
            let Some(data) = b.as_array_buffer() else {
                return Err(JsError::type_error(format!(
                    "{} is not an ArrayBuffer",
                    buffer.to_display_string()
                )));
            };
            if data.is_detached() {
                return Err(JsError::type_error(format!(
                    "Cannot construct {} on a detached ArrayBuffer",
                    kind.name()
                )));
            }
            data.byte_length()
        };

        let element_size = kind.element_size();
        if byte_offset % element_size != 0 {
            return Err(JsError::range_error(format!(
                "Start offset of {} should be a multiple of {}",
                kind.name(),
                element_size
            )));
        }
        let end = length
            .checked_mul(element_size)
            .and_then(|byte_length| byte_length.checked_add(byte_offset));
        if end.is_none_or(|end| end > buffer_length) {
            return Err(JsError::range_error(format!(
                "Invalid typed array length: {}",
                length
            )));
        }

        let guard = self.heap.create_guard();
        // The buffer may be unrooted; keep it alive across the allocation
        guard.guard(buffer_obj);
        let view = self.alloc_object(
            &guard,
            &self.typed_array_prototype,
            ExoticObject::TypedArray(TypedArrayData {
                kind,
                buffer: buffer_obj.cheap_clone(),
                byte_offset,
                declared_length: length,
            }),
        );
        guard.unguard(buffer_obj);
        Ok(Guarded::with_guard(JsValue::Object(view), guard))
    }

    /// Create a view over a fresh buffer holding `values` converted to `kind`
    pub fn create_typed_array_from(
        &mut self,
        kind: TypedArrayKind,
        values: &[JsValue],
    ) -> Result<Guarded, JsError> {
        let byte_length = values
            .len()
            .checked_mul(kind.element_size())
            .ok_or_else(|| JsError::range_error("Invalid typed array length"))?;
        let buffer = self.create_array_buffer(byte_length);
        let view = self.create_typed_array(kind, &buffer.value, 0, values.len())?;
        if let JsValue::Object(view_obj) = &view.value {
            for (index, value) in values.iter().enumerate() {
                typed_array_set(view_obj, index, value)?;
            }
        }
        Ok(view)
    }

    // ═══════════════════════════════════════════════════════════════
    // Intl.NumberFormat
    // ═══════════════════════════════════════════════════════════════

    pub fn create_number_format(
        &mut self,
        options: NumberFormatOptions,
    ) -> Result<Guarded, JsError> {
        let data = options.resolve(&self.config.default_locale)?;
        let guard = self.heap.create_guard();
        let number_format = self.alloc_object(
            &guard,
            &self.number_format_prototype,
            ExoticObject::NumberFormat(data),
        );
        Ok(Guarded::with_guard(JsValue::Object(number_format), guard))
    }

    // ═══════════════════════════════════════════════════════════════
    // GC
    // ═══════════════════════════════════════════════════════════════

    /// Run garbage collection manually. Returns the number of objects swept.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect()
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    pub fn gc_threshold(&self) -> usize {
        self.heap.gc_threshold()
    }

    /// Set the GC threshold
    ///
    /// - `0`: Disable threshold-based collection
    /// - `n > 0`: Collect after every `n` net allocations
    pub fn set_gc_threshold(&self, threshold: usize) {
        self.heap.set_gc_threshold(threshold);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
