//! Tests for Intl.NumberFormat and its bound format function

use pretty_assertions::assert_eq;

use super::{create_test_runtime, get, rooted, throws_error};
use jsview::{ErrorKind, JsBigInt, JsValue, NumberFormatOptions, NumberFormatStyle, PropertyKey};

fn options(json: &str) -> NumberFormatOptions {
    NumberFormatOptions::from_json(json).unwrap()
}

#[test]
fn test_format_getter_returns_same_function() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let nf = rooted(&guard, nf);

    let first = get(&mut interp, &nf, "format");
    let second = get(&mut interp, &nf, "format");
    assert!(first.is_callable());
    assert_eq!(first, second);

    // Each NumberFormat gets its own function
    let other = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let other = rooted(&guard, other);
    let third = get(&mut interp, &other, "format");
    assert!(first != third);
}

#[test]
fn test_format_function_length() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let nf = rooted(&guard, nf);
    let format = get(&mut interp, &nf, "format");

    let func = format.as_object().unwrap().clone();
    let func = func.borrow();
    let length = func.get_own_property(&PropertyKey::from("length")).unwrap();
    assert_eq!(length.value, JsValue::Number(1.0));
    assert!(!length.writable);
    assert!(!length.enumerable);
    assert!(length.configurable);
}

#[test]
fn test_format_through_bound_function() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let nf = rooted(&guard, nf);
    let format = get(&mut interp, &nf, "format");

    let cases = [
        (JsValue::Number(1234.5), "1,234.5"),
        (JsValue::Number(-0.0001), "-0"),
        (JsValue::from("42"), "42"),
        (JsValue::Boolean(true), "1"),
        (JsValue::Undefined, "NaN"),
        (JsValue::Null, "0"),
    ];
    for (arg, expected) in cases {
        let result = interp
            .call_function(format.clone(), JsValue::Undefined, &[arg])
            .unwrap();
        assert_eq!(result.value, JsValue::from(expected));
    }

    // No argument formats undefined
    let result = interp
        .call_function(format.clone(), JsValue::Undefined, &[])
        .unwrap();
    assert_eq!(result.value, JsValue::from("NaN"));

    // `this` is ignored; the function stays bound to its NumberFormat
    let result = interp
        .call_function(format, JsValue::from("ignored"), &[JsValue::Number(7.0)])
        .unwrap();
    assert_eq!(result.value, JsValue::from("7"));
}

#[test]
fn test_format_respects_options() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp
        .create_number_format(options(
            r#"{ "style": "percent", "minimumFractionDigits": 1 }"#,
        ))
        .unwrap();
    let nf = rooted(&guard, nf);
    let format = get(&mut interp, &nf, "format");

    let result = interp
        .call_function(format, JsValue::Undefined, &[JsValue::Number(0.1234)])
        .unwrap();
    assert_eq!(result.value, JsValue::from("12.3%"));
}

#[test]
fn test_format_high_precision_has_no_binary_noise() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let precise = interp
        .create_number_format(options(r#"{ "maximumFractionDigits": 20 }"#))
        .unwrap();
    let precise = rooted(&guard, precise);
    let cents = interp
        .create_number_format(options(r#"{ "maximumFractionDigits": 2 }"#))
        .unwrap();
    let cents = rooted(&guard, cents);

    let format = get(&mut interp, &precise, "format");
    let result = interp
        .call_function(format, JsValue::Undefined, &[JsValue::Number(0.1)])
        .unwrap();
    assert_eq!(result.value, JsValue::from("0.1"));

    let format = get(&mut interp, &cents, "format");
    let result = interp
        .call_function(format, JsValue::Undefined, &[JsValue::Number(1.005)])
        .unwrap();
    assert_eq!(result.value, JsValue::from("1.01"));
}

#[test]
fn test_format_bigint_is_not_implemented() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let nf = rooted(&guard, nf);
    let format = get(&mut interp, &nf, "format");

    let err = interp
        .call_function(
            format,
            JsValue::Undefined,
            &[JsValue::BigInt(JsBigInt::from(12i64))],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(
        err.to_string(),
        "InternalError: BigInt number formatting is not implemented"
    );
}

#[test]
fn test_format_propagates_coercion_failure() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let nf = rooted(&guard, nf);
    let format = get(&mut interp, &nf, "format");

    let err = interp
        .call_function(format, JsValue::Undefined, &[nf.clone()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_resolved_options() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let nf = interp
        .create_number_format(options(
            r#"{ "locale": "de-DE", "maximumFractionDigits": 1, "useGrouping": false }"#,
        ))
        .unwrap();
    let nf = rooted(&guard, nf);

    let resolved = rooted(&guard, interp.invoke(&nf, "resolvedOptions", &[]).unwrap());
    assert_eq!(get(&mut interp, &resolved, "locale"), JsValue::from("de-DE"));
    assert_eq!(get(&mut interp, &resolved, "style"), JsValue::from("decimal"));
    assert_eq!(
        get(&mut interp, &resolved, "minimumFractionDigits"),
        JsValue::Number(0.0)
    );
    assert_eq!(
        get(&mut interp, &resolved, "maximumFractionDigits"),
        JsValue::Number(1.0)
    );
    assert_eq!(
        get(&mut interp, &resolved, "useGrouping"),
        JsValue::Boolean(false)
    );
}

#[test]
fn test_default_locale_comes_from_config() {
    let config = jsview::RuntimeConfig::from_json(r#"{ "defaultLocale": "fr-FR" }"#).unwrap();
    let mut interp = jsview::Interpreter::with_config(config.with_gc_threshold(1));
    assert_eq!(interp.config().default_locale, "fr-FR");
    assert_eq!(interp.gc_threshold(), 1);
    let guard = interp.create_guard();
    let nf = interp.create_number_format(NumberFormatOptions::default()).unwrap();
    let nf = rooted(&guard, nf);

    let resolved = rooted(&guard, interp.invoke(&nf, "resolvedOptions", &[]).unwrap());
    assert_eq!(get(&mut interp, &resolved, "locale"), JsValue::from("fr-FR"));
}

#[test]
fn test_invalid_options_are_rejected() {
    let mut interp = create_test_runtime();

    let err = interp
        .create_number_format(options(r#"{ "maximumFractionDigits": 25 }"#))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);

    let err = interp
        .create_number_format(options(r#"{ "locale": "  " }"#))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);

    let err = NumberFormatOptions::from_json(r#"{ "style": "currency" }"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_options_parse_style() {
    assert_eq!(options(r#"{ "style": "percent" }"#).style, NumberFormatStyle::Percent);
    assert_eq!(options("{}").style, NumberFormatStyle::Decimal);
}

#[test]
fn test_methods_reject_incompatible_receiver() {
    let mut interp = create_test_runtime();
    let guard = interp.create_guard();
    let impostor = interp.create_object(&guard);
    impostor.borrow_mut().prototype = Some(interp.number_format_prototype.clone());
    let impostor = JsValue::Object(impostor);

    let err = interp.get_named(&impostor, "format").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert!(throws_error(
        &mut interp,
        &impostor,
        "resolvedOptions",
        &[],
        "Intl.NumberFormat.prototype.resolvedOptions called on incompatible receiver"
    ));
}
