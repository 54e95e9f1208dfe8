//! Tests for %TypedArray%.prototype accessors and iteration methods

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{
    call, create_test_runtime, get, greater_than, host_fn, rooted, throws_error, view_of,
};
use jsview::{ErrorKind, JsBigInt, JsError, JsValue, PropertyKey, TypedArrayKind};

#[test]
fn test_find_find_index_at_every_on_small_view() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int32, &[1.0, 2.0, 3.0]);

    let gt1 = greater_than(&mut interp, &guard, 1.0);
    assert_eq!(call(&mut interp, &view, "find", &[gt1]), JsValue::Number(2.0));

    let gt5 = greater_than(&mut interp, &guard, 5.0);
    assert_eq!(
        call(&mut interp, &view, "findIndex", &[gt5]),
        JsValue::Number(-1.0)
    );

    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::from(-1)]),
        JsValue::Number(3.0)
    );
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::from(5)]),
        JsValue::Undefined
    );

    let gt0 = greater_than(&mut interp, &guard, 0.0);
    assert_eq!(
        call(&mut interp, &view, "every", &[gt0]),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_find_index_returns_lowest_match() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Uint8, &[0.0, 7.0, 9.0, 7.0]);

    let gt5 = greater_than(&mut interp, &guard, 5.0);
    assert_eq!(
        call(&mut interp, &view, "findIndex", &[gt5.clone()]),
        JsValue::Number(1.0)
    );
    assert_eq!(call(&mut interp, &view, "find", &[gt5]), JsValue::Number(7.0));
}

#[test]
fn test_every_stops_at_first_falsy() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(
        &mut interp,
        &guard,
        TypedArrayKind::Float64,
        &[3.0, -1.0, 4.0, 5.0],
    );

    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let positive = host_fn(&mut interp, &guard, move |_, _, args| {
        counter.set(counter.get() + 1);
        Ok(JsValue::Boolean(
            matches!(args.first(), Some(JsValue::Number(n)) if *n > 0.0),
        ))
    });

    assert_eq!(
        call(&mut interp, &view, "every", &[positive]),
        JsValue::Boolean(false)
    );
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_at_positive_and_negative_indices_agree() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let values = [10.0, 20.0, 30.0, 40.0, 50.0];
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int16, &values);
    let length = values.len() as i32;

    for i in 0..length {
        let positive = call(&mut interp, &view, "at", &[JsValue::from(i)]);
        let negative = call(&mut interp, &view, "at", &[JsValue::from(i - length)]);
        assert_eq!(positive, negative, "at({}) vs at({})", i, i - length);
        assert_eq!(positive, JsValue::Number(values[i as usize]));
    }
}

#[test]
fn test_at_out_of_range_is_undefined() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int8, &[1.0, 2.0, 3.0]);

    for arg in [
        JsValue::Number(3.0),
        JsValue::Number(-4.0),
        JsValue::Number(f64::INFINITY),
        JsValue::Number(f64::NEG_INFINITY),
        JsValue::Number(1e300),
        JsValue::Number(-1e300),
        JsValue::Number(-9007199254740992.0),
        JsValue::from("-Infinity"),
    ] {
        assert_eq!(
            call(&mut interp, &view, "at", &[arg.clone()]),
            JsValue::Undefined,
            "at({:?})",
            arg
        );
    }
}

#[test]
fn test_at_coerces_its_argument() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int8, &[1.0, 2.0, 3.0]);

    // NaN and missing arguments become 0
    assert_eq!(call(&mut interp, &view, "at", &[]), JsValue::Number(1.0));
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::Number(f64::NAN)]),
        JsValue::Number(1.0)
    );
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::from("2")]),
        JsValue::Number(3.0)
    );
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::Number(-1.9)]),
        JsValue::Number(3.0)
    );
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::Boolean(true)]),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_at_propagates_coercion_failure() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int8, &[1.0]);

    let bigint = JsValue::BigInt(JsBigInt::from(0i64));
    assert!(throws_error(
        &mut interp,
        &view,
        "at",
        &[bigint],
        "Cannot convert a BigInt value to a number"
    ));

    let object = view.clone();
    assert!(throws_error(
        &mut interp,
        &view,
        "at",
        &[object],
        "Cannot convert object to primitive value"
    ));
}

#[test]
fn test_empty_view_results() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Float32, &[]);

    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let never = host_fn(&mut interp, &guard, move |_, _, _| {
        counter.set(counter.get() + 1);
        Ok(JsValue::Boolean(false))
    });

    assert_eq!(
        call(&mut interp, &view, "every", &[never.clone()]),
        JsValue::Boolean(true)
    );
    assert_eq!(
        call(&mut interp, &view, "find", &[never.clone()]),
        JsValue::Undefined
    );
    assert_eq!(
        call(&mut interp, &view, "findIndex", &[never.clone()]),
        JsValue::Number(-1.0)
    );
    assert_eq!(
        call(&mut interp, &view, "forEach", &[never]),
        JsValue::Undefined
    );
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::from(0)]),
        JsValue::Undefined
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_for_each_passes_value_index_view_and_this() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Uint16, &[5.0, 6.0]);
    let this_arg = JsValue::from("context");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let expected_view = view.clone();
    let record = host_fn(&mut interp, &guard, move |_, this, args| {
        assert_eq!(this, JsValue::from("context"));
        assert_eq!(args.get(2), Some(&expected_view));
        log.borrow_mut()
            .push((args.first().cloned(), args.get(1).cloned()));
        // Return values are ignored by forEach
        Ok(JsValue::Boolean(false))
    });

    let result = call(&mut interp, &view, "forEach", &[record, this_arg]);
    assert_eq!(result, JsValue::Undefined);
    assert_eq!(
        *seen.borrow(),
        vec![
            (Some(JsValue::Number(5.0)), Some(JsValue::Number(0.0))),
            (Some(JsValue::Number(6.0)), Some(JsValue::Number(1.0))),
        ]
    );
}

#[test]
fn test_missing_or_non_callable_callback() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int8, &[1.0]);

    for name in ["every", "find", "findIndex", "forEach"] {
        assert!(
            throws_error(
                &mut interp,
                &view,
                name,
                &[],
                &format!("TypedArray.prototype.{} requires at least one argument", name)
            ),
            "{} without callback",
            name
        );
        assert!(
            throws_error(
                &mut interp,
                &view,
                name,
                &[JsValue::Number(42.0)],
                "42 is not a function"
            ),
            "{} with a number callback",
            name
        );
    }
}

#[test]
fn test_callback_error_stops_iteration() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(
        &mut interp,
        &guard,
        TypedArrayKind::Int32,
        &[1.0, 2.0, 3.0, 4.0],
    );

    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let failing = host_fn(&mut interp, &guard, move |_, _, args| {
        counter.set(counter.get() + 1);
        match args.get(1) {
            Some(JsValue::Number(i)) if *i == 1.0 => Err(JsError::range_error("boom")),
            _ => Ok(JsValue::Undefined),
        }
    });

    let err = interp.invoke(&view, "forEach", &[failing]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert_eq!(err.to_string(), "RangeError: boom");
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_detach_during_iteration_fails_next_fetch() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(
        &mut interp,
        &guard,
        TypedArrayKind::Uint8,
        &[1.0, 2.0, 3.0, 4.0],
    );

    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let detach_at_one = host_fn(&mut interp, &guard, move |interp, _, args| {
        counter.set(counter.get() + 1);
        if args.get(1) == Some(&JsValue::Number(1.0)) {
            let view = args.get(2).cloned().unwrap_or_default();
            let buffer = interp.get_named(&view, "buffer")?;
            interp.detach_array_buffer(&buffer.value)?;
        }
        Ok(JsValue::Boolean(false))
    });

    let err = interp
        .invoke(&view, "find", &[detach_at_one])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert!(err.to_string().contains("detached ArrayBuffer"), "{}", err);
    assert_eq!(calls.get(), 2);

    // The view stays usable as an object; it just reads as empty
    assert_eq!(get(&mut interp, &view, "length"), JsValue::Number(0.0));
}

#[test]
fn test_detached_view_iterates_nothing() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int8, &[1.0, 2.0]);
    let buffer = get(&mut interp, &view, "buffer");
    interp.detach_array_buffer(&buffer).unwrap();

    let gt0 = greater_than(&mut interp, &guard, 0.0);
    assert_eq!(
        call(&mut interp, &view, "findIndex", &[gt0]),
        JsValue::Number(-1.0)
    );
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::from(0)]),
        JsValue::Undefined
    );
}

#[test]
fn test_accessors_with_offset() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let buffer = rooted(&guard, interp.create_array_buffer(16));
    let view = interp
        .create_typed_array(TypedArrayKind::Int32, &buffer, 4, 2)
        .unwrap();
    let view = rooted(&guard, view);

    assert_eq!(get(&mut interp, &view, "length"), JsValue::Number(2.0));
    assert_eq!(get(&mut interp, &view, "byteLength"), JsValue::Number(8.0));
    assert_eq!(get(&mut interp, &view, "byteOffset"), JsValue::Number(4.0));
    assert_eq!(get(&mut interp, &view, "buffer"), buffer);
}

#[test]
fn test_accessors_after_detach() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let buffer = rooted(&guard, interp.create_array_buffer(16));
    let view = interp
        .create_typed_array(TypedArrayKind::Uint16, &buffer, 2, 3)
        .unwrap();
    let view = rooted(&guard, view);

    interp.detach_array_buffer(&buffer).unwrap();

    assert_eq!(get(&mut interp, &view, "length"), JsValue::Number(0.0));
    assert_eq!(get(&mut interp, &view, "byteLength"), JsValue::Number(0.0));
    assert_eq!(get(&mut interp, &view, "byteOffset"), JsValue::Number(0.0));
    // The detached buffer object itself is still returned
    assert_eq!(get(&mut interp, &view, "buffer"), buffer);
}

#[test]
fn test_views_sharing_a_buffer_observe_detach() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let buffer = rooted(&guard, interp.create_array_buffer(8));
    let bytes = interp
        .create_typed_array(TypedArrayKind::Uint8, &buffer, 0, 8)
        .unwrap();
    let bytes = rooted(&guard, bytes);
    let words = interp
        .create_typed_array(TypedArrayKind::Uint32, &buffer, 4, 1)
        .unwrap();
    let words = rooted(&guard, words);

    let first = get(&mut interp, &words, "buffer");
    let second = get(&mut interp, &bytes, "buffer");
    assert_eq!(first, second);

    interp.detach_array_buffer(&buffer).unwrap();
    assert_eq!(get(&mut interp, &bytes, "length"), JsValue::Number(0.0));
    assert_eq!(get(&mut interp, &words, "length"), JsValue::Number(0.0));
}

#[test]
fn test_views_alias_the_same_bytes() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let bytes = view_of(&mut interp, &guard, TypedArrayKind::Uint8, &[1.0, 1.0, 0.0, 0.0]);
    let buffer = get(&mut interp, &bytes, "buffer");
    let halves = interp
        .create_typed_array(TypedArrayKind::Uint16, &buffer, 0, 2)
        .unwrap();
    let halves = rooted(&guard, halves);

    // Little-endian: bytes [1, 1] read as 0x0101
    assert_eq!(
        call(&mut interp, &halves, "at", &[JsValue::from(0)]),
        JsValue::Number(257.0)
    );
    assert_eq!(
        call(&mut interp, &halves, "at", &[JsValue::from(1)]),
        JsValue::Number(0.0)
    );
}

#[test]
fn test_bigint_view_elements() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let values = [
        JsValue::BigInt(JsBigInt::from(-5i64)),
        JsValue::BigInt(JsBigInt::from(9i64)),
    ];
    let view = interp
        .create_typed_array_from(TypedArrayKind::BigInt64, &values)
        .unwrap();
    let view = rooted(&guard, view);

    let is_positive = host_fn(&mut interp, &guard, |_, _, args| {
        Ok(JsValue::Boolean(
            matches!(args.first(), Some(JsValue::BigInt(b)) if !b.is_negative()),
        ))
    });
    let found = call(&mut interp, &view, "find", &[is_positive]);
    assert_eq!(found.to_display_string(), "9n");
    assert_eq!(
        call(&mut interp, &view, "at", &[JsValue::from(-2)]).to_display_string(),
        "-5n"
    );
}

#[test]
fn test_create_typed_array_validation() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let buffer = rooted(&guard, interp.create_array_buffer(8));

    let misaligned = interp.create_typed_array(TypedArrayKind::Float64, &buffer, 4, 0);
    assert_eq!(misaligned.unwrap_err().kind(), ErrorKind::Range);

    let too_long = interp.create_typed_array(TypedArrayKind::Int16, &buffer, 2, 4);
    assert_eq!(too_long.unwrap_err().kind(), ErrorKind::Range);

    let huge = interp.create_typed_array(TypedArrayKind::Float64, &buffer, 0, usize::MAX);
    assert_eq!(huge.unwrap_err().kind(), ErrorKind::Range);

    let not_buffer = interp.create_typed_array(TypedArrayKind::Int8, &JsValue::Null, 0, 0);
    assert_eq!(not_buffer.unwrap_err().kind(), ErrorKind::Type);

    interp.detach_array_buffer(&buffer).unwrap();
    let detached = interp.create_typed_array(TypedArrayKind::Int8, &buffer, 0, 0);
    assert_eq!(detached.unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_create_from_rejects_mismatched_element_types() {
    let mut interp = create_test_runtime();

    let err = interp
        .create_typed_array_from(TypedArrayKind::BigUint64, &[JsValue::Number(1.0)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);

    let err = interp
        .create_typed_array_from(
            TypedArrayKind::Int32,
            &[JsValue::BigInt(JsBigInt::from(1i64))],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_non_view_receiver_is_rejected() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let impostor = interp.create_object(&guard);
    impostor.borrow_mut().prototype = Some(interp.typed_array_prototype.clone());
    let impostor = JsValue::Object(impostor);

    let err = interp.get_named(&impostor, "length").unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Not a TypedArray");

    let gt0 = greater_than(&mut interp, &guard, 0.0);
    assert!(throws_error(&mut interp, &impostor, "every", &[gt0], "Not a TypedArray"));
    assert!(throws_error(&mut interp, &impostor, "at", &[], "Not a TypedArray"));

    // The receiver is checked before the callback
    assert!(throws_error(&mut interp, &impostor, "forEach", &[], "Not a TypedArray"));
}

#[test]
fn test_builtins_are_non_enumerable_and_configurable() {
    let interp = create_test_runtime();
    let proto = interp.typed_array_prototype.borrow();
    for name in ["at", "every", "find", "findIndex", "forEach"] {
        let prop = proto
            .get_own_property(&PropertyKey::from(name))
            .unwrap_or_else(|| panic!("{} missing", name));
        assert!(!prop.enumerable && prop.configurable && prop.writable, "{}", name);
    }
    for name in ["length", "buffer", "byteLength", "byteOffset"] {
        let prop = proto
            .get_own_property(&PropertyKey::from(name))
            .unwrap_or_else(|| panic!("{} missing", name));
        assert!(prop.getter.is_some() && prop.setter.is_none(), "{}", name);
        assert!(!prop.enumerable && prop.configurable, "{}", name);
    }
}

#[test]
fn test_method_arity() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let view = view_of(&mut interp, &guard, TypedArrayKind::Int8, &[]);
    for name in ["at", "every", "find", "findIndex", "forEach"] {
        let method = get(&mut interp, &view, name);
        assert_eq!(get(&mut interp, &method, "length"), JsValue::Number(1.0), "{}", name);
        assert_eq!(get(&mut interp, &method, "name"), JsValue::from(name));
    }
}
