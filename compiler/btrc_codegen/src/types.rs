//! Renders an [`ir::Type`] to its C spelling. A pure function of the node
//! -- the Emitter never consults `TypeId`/`SemaResult` here, matching
//! spec.md §4.7 ("the emitter never inspects types for lowering
//! decisions"): every lowering decision already happened in stage 5.

use btrc_irgen::ir::Type;

#[must_use]
pub fn render(ty: &Type) -> String {
    match ty {
        Type::Void => "void".to_string(),
        Type::Int => "int".to_string(),
        Type::Float => "float".to_string(),
        Type::Double => "double".to_string(),
        Type::Bool => "bool".to_string(),
        Type::Char => "char".to_string(),
        Type::CString => "char*".to_string(),
        Type::Struct(name) => format!("struct {name}"),
        Type::Pointer(inner) => format!("{}*", render(inner)),
        Type::FunctionPointer(params, ret) => {
            let param_list = if params.is_empty() {
                "void".to_string()
            } else {
                params.iter().map(render).collect::<Vec<_>>().join(", ")
            };
            format!("{} (*)({param_list})", render(ret))
        }
    }
}

/// A variable declaration's `type name` spelling, handling the C function-
/// pointer declarator (`Ret (*name)(Params)`) which doesn't compose by
/// simple concatenation the way every other type does.
#[must_use]
pub fn render_declarator(ty: &Type, name: &str) -> String {
    if let Type::FunctionPointer(params, ret) = ty {
        let param_list = if params.is_empty() {
            "void".to_string()
        } else {
            params.iter().map(render).collect::<Vec<_>>().join(", ")
        };
        return format!("{} (*{name})({param_list})", render(ret));
    }
    format!("{} {name}", render(ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_nests_asterisks() {
        let ty = Type::Pointer(Box::new(Type::Pointer(Box::new(Type::Int))));
        assert_eq!(render(&ty), "int**");
    }

    #[test]
    fn struct_name_gets_struct_keyword() {
        assert_eq!(render(&Type::Struct("Animal".to_string())), "struct Animal");
    }

    #[test]
    fn function_pointer_declarator_wraps_name() {
        let ty = Type::FunctionPointer(vec![Type::Int, Type::Bool], Box::new(Type::CString));
        assert_eq!(render_declarator(&ty, "cb"), "char* (*cb)(int, bool)");
    }

    #[test]
    fn no_param_function_pointer_uses_void() {
        let ty = Type::FunctionPointer(Vec::new(), Box::new(Type::Void));
        assert_eq!(render_declarator(&ty, "cb"), "void (*cb)(void)");
    }
}
