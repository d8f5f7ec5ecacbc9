//! Type syntax parsing (spec.md §3 "Types", §4.3 disambiguations).

use btrc_ir::{Name, Type};

use crate::{ParseErrorKind, Parser};

impl<'a> Parser<'a> {
    /// `type = primitive_or_name [ "<" type { "," type } ">" ] { "*" | "?" }
    ///        | "(" type { "," type } ")" [ "->" type ]`
    pub(crate) fn parse_type(&mut self) -> Option<Type> {
        let mut ty = if self.is_operator("(") {
            self.parse_paren_type_or_function_type()?
        } else {
            let (name, _span) = self.expect_type_name()?;
            if self.eat_operator("<") {
                let args = self.parse_type_arg_list()?;
                self.expect_operator(">")?;
                Type::Generic(name, args)
            } else {
                Type::Primitive(name)
            }
        };

        loop {
            if self.eat_operator("*") {
                ty = Type::Pointer(Box::new(ty));
            } else if self.eat_operator("?") {
                ty = Type::Nullable(Box::new(ty));
            } else {
                break;
            }
        }
        Some(ty)
    }

    fn parse_type_arg_list(&mut self) -> Option<Vec<Type>> {
        let mut args = Vec::new();
        args.push(self.parse_type()?);
        while self.eat_operator(",") {
            args.push(self.parse_type()?);
        }
        Some(args)
    }

    /// Disambiguates `(T1, …, Tn)` tuple type, `(T)` grouping, and
    /// `(T1, …) -> Tret` function type (spec.md §4.3: "a parenthesized list
    /// with `,` is a tuple type; a single parenthesized type is grouping").
    /// # Panics
    /// Never: the `elements.len() == 1` branch below only runs when
    /// `elements` has exactly one item.
    #[allow(clippy::unwrap_used)]
    fn parse_paren_type_or_function_type(&mut self) -> Option<Type> {
        self.expect_operator("(")?;
        let mut elements = Vec::new();
        if !self.is_operator(")") {
            elements.push(self.parse_type()?);
            while self.eat_operator(",") {
                elements.push(self.parse_type()?);
            }
        }
        self.expect_operator(")")?;

        if self.eat_operator("->") {
            let ret = self.parse_type()?;
            return Some(Type::Function(elements, Box::new(ret)));
        }

        if elements.len() == 1 {
            Some(elements.into_iter().next().unwrap())
        } else {
            Some(Type::Tuple(elements))
        }
    }

    /// Trial parse of `Name<T1,…>` used in *expression* position to
    /// disambiguate `a < b` from an explicit generic call `foo<int>(x)`
    /// (spec.md §4.3): speculatively parses a generic argument list and
    /// only commits if it's immediately followed by `(`, the one
    /// expression context a type application can legally appear in (a
    /// call). Rolled back otherwise, so `a < b` re-parses as a comparison.
    pub(crate) fn try_parse_generic_call_name(&mut self, name: Name) -> Option<Vec<Type>> {
        let checkpoint = self.pos;
        if !self.eat_operator("<") {
            return None;
        }
        let Some(args) = self.parse_type_arg_list() else {
            self.pos = checkpoint;
            return None;
        };
        if self.eat_operator(">") && self.is_operator("(") {
            Some(args)
        } else {
            self.pos = checkpoint;
            None
        }
    }

    pub(crate) fn parse_type_or_report(&mut self) -> Type {
        self.parse_type().unwrap_or_else(|| {
            self.error_here(ParseErrorKind::ExpectedType);
            Type::Primitive(Name::EMPTY)
        })
    }
}
