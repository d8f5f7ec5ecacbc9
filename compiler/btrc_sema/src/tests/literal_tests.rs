//! Literal, arithmetic, and global-variable type inference.

use super::check_source;
use crate::CanonicalType;
use btrc_diagnostic::ErrorCode;

#[test]
fn int_literal_global_checks_clean() {
    let (_, diags) = check_source("int answer = 42;");
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
}

#[test]
fn global_init_type_mismatch_is_reported() {
    let (_, diags) = check_source("int x = \"not a number\";");
    assert!(diags.has_errors());
    assert!(diags.errors().any(|d| d.code == ErrorCode::S0002TypeMismatch));
}

#[test]
fn int_widens_to_double_in_arithmetic() {
    let (sema, diags) = check_source(
        r#"
        double add_one(int x) {
            return x + 1.5;
        }
        "#,
    );
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
    let f = sema.functions.values().next().unwrap();
    assert_eq!(f.ret, sema.types.double);
}

#[test]
fn unknown_global_type_is_reported() {
    let (_, diags) = check_source("Nope x;");
    assert!(diags.errors().any(|d| d.code == ErrorCode::S0012UnknownType));
}

#[test]
fn f_string_is_always_string_typed() {
    let (sema, diags) = check_source(
        r#"
        string greet(string name) {
            return f"hello {name}";
        }
        "#,
    );
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
    let f = sema.functions.values().next().unwrap();
    assert_eq!(f.ret, sema.types.str_);
    assert!(matches!(sema.types.get(f.ret), CanonicalType::Str));
}
