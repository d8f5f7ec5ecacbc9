//! Top-level declaration parsing (spec.md §3 "Declarations").
//!
//! `#include` is parsed here only as a `Decl::Include` node; textual
//! inclusion itself is a driver-level concern (a `SourceLoader` expands
//! includes before tokens ever reach this crate — see the `btrc` binary).

use btrc_ir::ast::{
    Access, ClassDecl, Decl, EnumDecl, EnumVariant, Field, FunctionDecl, InterfaceDecl, Member, MethodSig, Param,
    StructDecl, TypeParam,
};
use btrc_ir::{Name, TokenKind, Type};

use crate::{ParseErrorKind, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_decl(&mut self) -> Option<Decl> {
        if self.is_keyword("class") {
            return self.parse_class().map(Decl::Class);
        }
        if self.is_keyword("interface") {
            return self.parse_interface().map(Decl::Interface);
        }
        if self.is_keyword("enum") {
            return self.parse_enum().map(Decl::Enum);
        }
        if self.is_keyword("struct") {
            return self.parse_struct().map(Decl::Struct);
        }
        if self.is_keyword("typedef") {
            return self.parse_typedef();
        }
        if self.is_keyword("extern") {
            return self.parse_extern();
        }
        if self.is_keyword("include") {
            return self.parse_include();
        }
        self.parse_function_or_global_var()
    }

    fn parse_class(&mut self) -> Option<ClassDecl> {
        let start = self.bump(); // "class"
        let (name, _span) = self.expect_identifier()?;

        let mut superclass = None;
        let mut interfaces = Vec::new();
        if self.eat_operator(":") {
            let (first, _) = self.expect_identifier()?;
            superclass = Some(first);
            while self.eat_operator(",") {
                let (iface, _) = self.expect_identifier()?;
                interfaces.push(iface);
            }
        }

        let type_params = if self.eat_operator("<") { self.parse_type_param_list()? } else { Vec::new() };

        self.expect_operator("{")?;
        let mut members = Vec::new();
        while !self.is_operator("}") && !self.at_eof() {
            let before = self.pos;
            match self.parse_member(name) {
                Some(member) => members.push(member),
                None => {
                    if self.pos == before {
                        self.bump();
                    }
                    self.recover_to_decl_boundary();
                }
            }
        }
        let end = self.expect_operator("}")?;

        Some(ClassDecl { name, superclass, interfaces, type_params, members, span: start.span.merge(end.span) })
    }

    fn parse_type_param_list(&mut self) -> Option<Vec<TypeParam>> {
        let mut params = Vec::new();
        let (first, _) = self.expect_identifier()?;
        params.push(TypeParam { name: first });
        while self.eat_operator(",") {
            let (name, _) = self.expect_identifier()?;
            params.push(TypeParam { name });
        }
        self.expect_operator(">")?;
        Some(params)
    }

    fn parse_member(&mut self, class_name: Name) -> Option<Member> {
        let access = if self.eat_keyword("private") {
            Access::Private
        } else {
            self.eat_keyword("public");
            Access::Public
        };
        let is_static = self.eat_keyword("static");
        // Whether a method overrides a superclass method is structural
        // (same name found along the inheritance chain), not a syntax
        // marker — there is no `override` keyword in the grammar.
        let is_override = false;

        // Constructor: `ClassName(params) { ... }`.
        if matches!(self.peek().kind, TokenKind::Identifier)
            && self.text(self.peek()) == self.interner.resolve(class_name)
            && self.is_operator_n(1, "(")
        {
            let start = self.bump();
            self.expect_operator("(")?;
            let params = self.parse_member_param_list()?;
            self.expect_operator(")")?;
            let body = self.parse_block()?;
            let span = start.span.merge(body.last().map_or(start.span, btrc_ir::ast::Stmt::span));
            return Some(Member::Ctor { params, body, span });
        }

        // Destructor: `~ClassName() { ... }`.
        if self.is_operator("~") {
            let start = self.bump();
            self.expect_identifier()?;
            self.expect_operator("(")?;
            self.expect_operator(")")?;
            let body = self.parse_block()?;
            let span = start.span.merge(body.last().map_or(start.span, btrc_ir::ast::Stmt::span));
            return Some(Member::Dtor { body, span });
        }

        // Property: `get/set Type name { ... }` — recognized by the `get`
        // or `set` soft keyword preceding the type.
        if self.is_keyword("get") {
            return self.parse_property(access);
        }

        // `keep` before the return type (spec.md §4.5) makes the caller
        // responsible for releasing the returned instance.
        let returns_kept = self.eat_keyword("keep");
        let ty = self.parse_type_or_report();
        let (name, name_span) = self.expect_identifier()?;

        if self.is_operator("(") {
            self.bump();
            let params = self.parse_member_param_list()?;
            self.expect_operator(")")?;
            if self.eat_operator(";") {
                // Abstract/interface-style method with no body.
                return Some(Member::Method {
                    name,
                    ret: ty,
                    params,
                    body: Vec::new(),
                    is_static,
                    is_override,
                    is_abstract: true,
                    returns_kept,
                    access,
                    span: name_span,
                });
            }
            let body = self.parse_block()?;
            let span = name_span.merge(body.last().map_or(name_span, btrc_ir::ast::Stmt::span));
            return Some(Member::Method {
                name,
                ret: ty,
                params,
                body,
                is_static,
                is_override,
                is_abstract: false,
                returns_kept,
                access,
                span,
            });
        }

        // Field, optionally with an initializer.
        let init = if self.eat_operator("=") { Some(self.parse_expression()?) } else { None };
        let end = self.expect_operator(";")?;
        Some(Member::Field { name, ty, access, init, is_static, span: name_span.merge(end.span) })
    }

    /// `get Type name { ... } [ set { ... } ]`.
    fn parse_property(&mut self, access: Access) -> Option<Member> {
        let start = self.bump(); // "get"
        let ty = self.parse_type_or_report();
        let (name, _span) = self.expect_identifier()?;
        let getter = self.parse_block()?;
        let mut has_setter = false;
        let mut setter = Vec::new();
        if self.eat_keyword("set") {
            has_setter = true;
            setter = self.parse_block()?;
        }
        let last = setter.last().or_else(|| getter.last()).map_or(start.span, btrc_ir::ast::Stmt::span);
        Some(Member::Property { name, ty, getter, setter, has_setter, access, span: start.span.merge(last) })
    }

    fn parse_member_param_list(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        if self.is_operator(")") {
            return Some(params);
        }
        loop {
            // `keep` before a parameter's type (spec.md §4.5) retains the
            // argument at the call site for the duration of the callee.
            let is_kept = self.eat_keyword("keep");
            let ty = self.parse_type_or_report();
            let (name, _span) = self.expect_identifier()?;
            let default_value = if self.eat_operator("=") { Some(self.parse_expression()?) } else { None };
            params.push(Param { name, ty, default_value, is_kept });
            if !self.eat_operator(",") {
                break;
            }
        }
        Some(params)
    }

    fn parse_interface(&mut self) -> Option<InterfaceDecl> {
        let start = self.bump(); // "interface"
        let (name, _span) = self.expect_identifier()?;
        self.expect_operator("{")?;
        let mut methods = Vec::new();
        while !self.is_operator("}") && !self.at_eof() {
            let ret = self.parse_type_or_report();
            let (method_name, method_span) = self.expect_identifier()?;
            self.expect_operator("(")?;
            let params = self.parse_member_param_list()?;
            self.expect_operator(")")?;
            self.expect_operator(";")?;
            methods.push(MethodSig { name: method_name, ret, params, span: method_span });
        }
        let end = self.expect_operator("}")?;
        Some(InterfaceDecl { name, methods, span: start.span.merge(end.span) })
    }

    fn parse_enum(&mut self) -> Option<EnumDecl> {
        let start = self.bump(); // "enum"
        let (name, _span) = self.expect_identifier()?;
        self.expect_operator("{")?;
        let mut variants = Vec::new();
        if !self.is_operator("}") {
            variants.push(self.parse_enum_variant()?);
            while self.eat_operator(",") {
                if self.is_operator("}") {
                    break;
                }
                variants.push(self.parse_enum_variant()?);
            }
        }
        let end = self.expect_operator("}")?;
        Some(EnumDecl { name, variants, span: start.span.merge(end.span) })
    }

    fn parse_enum_variant(&mut self) -> Option<EnumVariant> {
        let (name, span) = self.expect_identifier()?;
        let mut payload = Vec::new();
        if self.eat_operator("(") {
            if !self.is_operator(")") {
                payload.push(self.parse_type_or_report());
                while self.eat_operator(",") {
                    payload.push(self.parse_type_or_report());
                }
            }
            self.expect_operator(")")?;
        }
        Some(EnumVariant { name, payload, span })
    }

    fn parse_struct(&mut self) -> Option<StructDecl> {
        let start = self.bump(); // "struct"
        let (name, _span) = self.expect_identifier()?;
        self.expect_operator("{")?;
        let mut fields = Vec::new();
        while !self.is_operator("}") && !self.at_eof() {
            let ty = self.parse_type_or_report();
            let (field_name, field_span) = self.expect_identifier()?;
            self.expect_operator(";")?;
            fields.push(Field { name: field_name, ty, span: field_span });
        }
        let end = self.expect_operator("}")?;
        Some(StructDecl { name, fields, span: start.span.merge(end.span) })
    }

    fn parse_typedef(&mut self) -> Option<Decl> {
        let start = self.bump(); // "typedef"
        let ty = self.parse_type_or_report();
        let (name, _span) = self.expect_identifier()?;
        let end = self.expect_operator(";")?;
        Some(Decl::Typedef { name, ty, span: start.span.merge(end.span) })
    }

    fn parse_extern(&mut self) -> Option<Decl> {
        let start = self.bump(); // "extern"
        let ret = self.parse_type_or_report();
        let (name, _span) = self.expect_identifier()?;
        self.expect_operator("(")?;
        let params = self.parse_member_param_list()?;
        let close = self.expect_operator(")")?;
        let end = self.expect_operator(";").unwrap_or(close);
        Some(Decl::Extern { name, ret, params, span: start.span.merge(end.span) })
    }

    fn parse_include(&mut self) -> Option<Decl> {
        let start = self.bump(); // "include"
        let tok = self.peek();
        if !matches!(tok.kind, TokenKind::StringLiteral) {
            self.error_here(ParseErrorKind::UnexpectedToken {
                expected: "a quoted path".to_string(),
                found: self.describe(tok),
            });
            return None;
        }
        self.bump();
        let raw = self.text(tok);
        let path = raw[1..raw.len().saturating_sub(1)].to_string();
        let end = self.expect_operator(";")?;
        Some(Decl::Include { path, span: start.span.merge(end.span) })
    }

    /// Free function or global variable: both begin with a type, then a
    /// name; a following `(` makes it a function, anything else a global.
    fn parse_function_or_global_var(&mut self) -> Option<Decl> {
        let returns_kept = self.eat_keyword("keep");
        let ty = self.parse_type_or_report();
        let (name, name_span) = self.expect_identifier()?;

        let type_params = if self.eat_operator("<") { self.parse_type_param_list()? } else { Vec::new() };

        if self.eat_operator("(") {
            let params = self.parse_member_param_list()?;
            self.expect_operator(")")?;
            let body = self.parse_block()?;
            let span = name_span.merge(body.last().map_or(name_span, btrc_ir::ast::Stmt::span));
            return Some(Decl::Function(FunctionDecl { name, ret: ty, params, body, type_params, returns_kept, span }));
        }

        let init = if self.eat_operator("=") { Some(self.parse_expression()?) } else { None };
        let end = self.expect_operator(";")?;
        Some(Decl::GlobalVar { name, ty, init, span: name_span.merge(end.span) })
    }
}
