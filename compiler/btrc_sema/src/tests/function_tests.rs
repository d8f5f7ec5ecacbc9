//! Free-function, lambda, and control-flow type checking.

use super::check_source;
use btrc_diagnostic::ErrorCode;

#[test]
fn function_params_and_return_resolve() {
    let (sema, diags) = check_source("int add(int a, int b) { return a + b; }");
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
    let f = sema.functions.values().next().unwrap();
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.ret, sema.types.int);
}

#[test]
fn return_type_mismatch_is_reported() {
    let (_, diags) = check_source("int broken() { return \"nope\"; }");
    assert!(diags.errors().any(|d| d.code == ErrorCode::S0002TypeMismatch));
}

#[test]
fn calling_with_wrong_arity_is_reported() {
    let (_, diags) = check_source(
        r#"
        int add(int a, int b) { return a + b; }
        int main() { return add(1); }
        "#,
    );
    assert!(diags.errors().any(|d| d.code == ErrorCode::S0011NoMatchingOverload));
}

#[test]
fn forward_reference_between_top_level_functions_resolves() {
    // `first` calls `second`, declared later -- pass 1 registers every
    // name before pass 2 checks any body.
    let (_, diags) = check_source(
        r#"
        int first() { return second(); }
        int second() { return 1; }
        "#,
    );
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
}

#[test]
fn lambda_arrow_infers_function_type_from_body() {
    let (_, diags) = check_source(
        r#"
        int apply_one(int x) {
            return x + 1;
        }
        void use_lambda() {
            var f = (int x) => x + 1;
        }
        "#,
    );
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
}

#[test]
fn if_condition_must_be_bool() {
    let (_, diags) = check_source(
        r#"
        void check(int x) {
            if (x) {
                return;
            }
        }
        "#,
    );
    assert!(diags.errors().any(|d| d.code == ErrorCode::S0002TypeMismatch));
}

#[test]
fn for_in_over_range_binds_int_element() {
    let (_, diags) = check_source(
        r#"
        void count_up() {
            for (var i in range(0, 10)) {
                print(f"{i}");
            }
        }
        "#,
    );
    assert!(!diags.has_errors(), "{:?}", diags.into_vec());
}
