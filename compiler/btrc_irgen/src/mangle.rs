//! Name mangling (spec.md §4.5 "Name mangling"): every C identifier the IR
//! Generator invents is produced by one of these functions so the Emitter
//! never has to guess at a naming convention.

/// `ClassName_methodName`, the scheme spec.md §4.5 uses for every
/// non-static virtual/ctor/dtor thunk as well as plain methods.
#[must_use]
pub fn method(class: &str, method: &str) -> String {
    format!("{class}_{method}")
}

#[must_use]
pub fn ctor(class: &str) -> String {
    format!("{class}_new")
}

#[must_use]
pub fn dtor(class: &str) -> String {
    format!("{class}_delete")
}

/// The generated ARC teardown wrapper (spec.md §4.5): releases the dtor body
/// (if any) then frees the object. Distinct from [`dtor`], which names the
/// raw user destructor body itself -- `destroy` is what gets handed to
/// `__btrc_release`/`__btrc_release_cyclable` as the `void (*)(void*)` callback.
#[must_use]
pub fn destroy(class: &str) -> String {
    format!("{class}_destroy")
}

/// The per-class field-tracing function ARC cycle collection calls back
/// into (spec.md §4.8 "ARC cycle collection"), generated only for classes
/// `ClassInfo::is_cycle_capable` marks as able to form a reference cycle.
#[must_use]
pub fn trace(class: &str) -> String {
    format!("{class}_trace")
}

#[must_use]
pub fn vtable_type(class: &str) -> String {
    format!("{class}_VTable")
}

#[must_use]
pub fn vtable_instance(class: &str) -> String {
    format!("{class}_vtable")
}

/// `Generic_T1_T2`, the scheme spec.md §4.5 "Monomorphization" uses for a
/// concrete instantiation of a generic class/collection; `args` are
/// already-mangled type names (see [`crate::monomorphize::mangled_type_name`]).
#[must_use]
pub fn generic_instance(base: &str, args: &[String]) -> String {
    if args.is_empty() {
        return base.to_string();
    }
    let mut out = base.to_string();
    for arg in args {
        out.push('_');
        out.push_str(arg);
    }
    out
}

/// `__btrc_<helper>`, reserved for Helper Registry symbols (spec.md §4.8)
/// so user identifiers (which the grammar forbids from starting with two
/// underscores in generated code, though the parser itself does not
/// enforce this) never collide with runtime support code.
#[must_use]
pub fn helper(name: &str) -> String {
    format!("__btrc_{name}")
}

/// Lambda thunks are mangled by the enclosing function and a per-function
/// sequence number, since a source-level lambda has no name of its own.
#[must_use]
pub fn lambda(enclosing: &str, index: u32) -> String {
    format!("{enclosing}_lambda{index}")
}

/// The capture struct generated for a lambda that closes over locals.
#[must_use]
pub fn lambda_capture(enclosing: &str, index: u32) -> String {
    format!("{enclosing}_lambda{index}_Capture")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_joins_class_and_name() {
        assert_eq!(method("Counter", "increment"), "Counter_increment");
    }

    #[test]
    fn generic_instance_with_no_args_is_base_name() {
        assert_eq!(generic_instance("Vector", &[]), "Vector");
    }

    #[test]
    fn generic_instance_appends_each_arg() {
        assert_eq!(generic_instance("Vector", &["int".to_string()]), "Vector_int");
        assert_eq!(
            generic_instance("Map", &["string".to_string(), "int".to_string()]),
            "Map_string_int"
        );
    }

    #[test]
    fn helper_is_double_underscore_prefixed() {
        assert_eq!(helper("retain"), "__btrc_retain");
    }

    #[test]
    fn destroy_differs_from_dtor() {
        assert_eq!(destroy("Node"), "Node_destroy");
        assert_ne!(destroy("Node"), dtor("Node"));
    }

    #[test]
    fn trace_joins_class_and_suffix() {
        assert_eq!(trace("Node"), "Node_trace");
    }
}
