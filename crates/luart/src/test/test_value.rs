// Value-level behavior: tag predicates, coercion policies, display
use crate::lua_value::{LuaValue, LuaValueKind};

#[test]
fn test_predicates_match_kinds() {
    let cases = [
        (LuaValue::nil(), LuaValueKind::Nil),
        (LuaValue::boolean(true), LuaValueKind::Boolean),
        (LuaValue::integer(1), LuaValueKind::Integer),
        (LuaValue::float(1.5), LuaValueKind::Float),
        (LuaValue::string("s"), LuaValueKind::String),
        (LuaValue::new_table(0, 0), LuaValueKind::Table),
        (
            LuaValue::native_function(|_, _| LuaValue::Nil),
            LuaValueKind::Function,
        ),
    ];
    for (value, kind) in cases {
        assert_eq!(value.kind(), kind);
    }
}

#[test]
fn test_truthiness() {
    assert!(LuaValue::integer(0).is_truthy());
    assert!(LuaValue::string("").is_truthy());
    assert!(LuaValue::float(f64::NAN).is_truthy());
    assert!(LuaValue::nil().is_falsy());
    assert!(LuaValue::boolean(false).is_falsy());
}

#[test]
fn test_coercion_policies_agree_on_success() {
    for text in ["42", "-3.5", "0x10", "  8  "] {
        let v = LuaValue::string(text);
        let strict = v.coerce_number().unwrap();
        assert_eq!(v.as_number_lenient(), strict);
    }
}

#[test]
fn test_coercion_policies_diverge_on_failure() {
    let v = LuaValue::string("not numeric");
    assert_eq!(v.coerce_number(), None);
    assert_eq!(v.as_number_lenient(), 0.0);
}

#[test]
fn test_display_formats() {
    assert_eq!(LuaValue::integer(42).to_string(), "42");
    assert_eq!(LuaValue::float(1.0).to_string(), "1.0");
    assert_eq!(LuaValue::float(1.5).to_string(), "1.5");
    assert_eq!(LuaValue::string("x").to_string(), "x");
    assert_eq!(LuaValue::nil().to_string(), "nil");
    assert!(LuaValue::new_table(0, 0).to_string().starts_with("table: 0x"));
}

#[test]
fn test_index_through_value() {
    let t = LuaValue::new_table(0, 0);
    t.set_index(LuaValue::string("k"), LuaValue::integer(1))
        .unwrap();
    assert_eq!(t.index(&LuaValue::string("k")).unwrap(), LuaValue::integer(1));
    assert!(LuaValue::string("s").index(&LuaValue::integer(1)).is_err());
    assert!(
        LuaValue::nil()
            .set_index(LuaValue::integer(1), LuaValue::integer(1))
            .is_err()
    );
}

#[test]
fn test_equality_across_clones_and_references() {
    let t = LuaValue::new_table(0, 0);
    assert_eq!(t, t.clone());
    assert_ne!(t, LuaValue::new_table(0, 0));

    let f = LuaValue::native_function(|_, _| LuaValue::Nil);
    assert_eq!(f, f.clone());
    assert_ne!(f, LuaValue::native_function(|_, _| LuaValue::Nil));
}
