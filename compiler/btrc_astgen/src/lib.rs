//! ASDL node-definition generator (spec.md §6.4): reads `ast/btrc.asdl` and
//! prints the Rust node definitions it describes.
//!
//! This is the offline tool spec.md §6.4 calls for -- it is not part of the
//! compile pipeline and nothing in `btrc_ir` includes its output. The
//! workspace's actual `btrc_ir::ast` is hand-maintained in lockstep with
//! `ast/btrc.asdl` (see `DESIGN.md`); running this binary against that same
//! file is how a maintainer checks the two haven't drifted.

pub mod error;

pub use error::AsdlError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsdlModule {
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Single(String),
    Option(String),
    List(String),
}

/// Rule names that are mutually/self-recursive in `ast/btrc.asdl` and so
/// need a `Box` indirection wherever one appears directly (not already
/// inside a `Vec`) as a sibling field -- otherwise the generated type has
/// no finite size. `expr`/`stmt` reference each other and themselves
/// (`If` holds an `expr` and more `stmt`s). `type` is self-recursive too
/// but already boxes its own `Pointer`/`Nullable`/`Function` payloads, so a
/// sibling field typed plain `type` is already bounded and needs no second
/// layer of boxing.
const BOXED_RULES: &[&str] = &["expr", "stmt"];

pub fn load(path: impl AsRef<std::path::Path>) -> Result<AsdlModule, AsdlError> {
    let path_ref = path.as_ref();
    let path_str = path_ref.display().to_string();
    let text = std::fs::read_to_string(path_ref).map_err(|source| AsdlError::Io { path: path_str.clone(), source })?;
    parse(&text, &path_str)
}

pub fn parse(text: &str, path_label: &str) -> Result<AsdlModule, AsdlError> {
    let stripped = strip_comments(text);
    let (name, body) = extract_module(&stripped, path_label)?;
    let rules = split_into_rule_blocks(&body)
        .iter()
        .map(|block| parse_rule_block(path_label, block))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AsdlModule { name, rules })
}

fn strip_comments(text: &str) -> String {
    text.lines().map(|line| line.find("--").map_or(line, |idx| &line[..idx])).collect::<Vec<_>>().join("\n")
}

/// Finds `module <Name> { ... }` and returns the name plus the text
/// strictly between the matching outer braces (same brace-matching idiom
/// `btrc_grammar::loader::extract_braced_section` uses, simplified since
/// ASDL has no quoted strings for a brace to hide inside).
fn extract_module(text: &str, path: &str) -> Result<(String, String), AsdlError> {
    let kw_at = find_keyword(text, "module").ok_or_else(|| AsdlError::MissingModule { path: path.to_string() })?;
    let after_kw = &text[kw_at + "module".len()..];
    let trimmed = after_kw.trim_start();
    let name_len = trimmed.find(|c: char| !c.is_alphanumeric() && c != '_').unwrap_or(trimmed.len());
    if name_len == 0 {
        return Err(AsdlError::MissingModule { path: path.to_string() });
    }
    let name = trimmed[..name_len].to_string();
    let after_name = &trimmed[name_len..];
    let brace_rel = after_name.find('{').ok_or_else(|| AsdlError::MissingModule { path: path.to_string() })?;
    let open = text.len() - after_name.len() + brace_rel;

    let mut depth = 0i32;
    let mut end = None;
    for (i, c) in text.char_indices().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end.ok_or(AsdlError::UnterminatedBrace { path: path.to_string(), offset: open })?;
    Ok((name, text[open + 1..end].to_string()))
}

fn find_keyword(text: &str, kw: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(kw) {
        let at = search_from + rel;
        let before_ok = at == 0 || !text.as_bytes()[at - 1].is_ascii_alphanumeric();
        let after = at + kw.len();
        let after_ok = after >= text.len() || !text.as_bytes()[after].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return Some(at);
        }
        search_from = after;
    }
    None
}

/// Groups the module body's lines into one block per rule. A rule's
/// continuation lines are either inside an open `(...)` (a multi-line field
/// list) or start with `|` (another constructor alternative) -- both cases
/// keep accumulating into the current block.
fn split_into_rule_blocks(body: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut paren_depth = 0i32;
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if paren_depth == 0 && !trimmed.starts_with('|') && is_rule_start(trimmed) && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(trimmed);
        for c in trimmed.chars() {
            match c {
                '(' => paren_depth += 1,
                ')' => paren_depth -= 1,
                _ => {}
            }
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_rule_start(trimmed: &str) -> bool {
    let ident_len = trimmed.find(|c: char| !c.is_alphanumeric() && c != '_').unwrap_or(trimmed.len());
    if ident_len == 0 {
        return false;
    }
    trimmed[ident_len..].trim_start().starts_with('=')
}

fn parse_rule_block(path: &str, block: &str) -> Result<Rule, AsdlError> {
    let eq_pos = block.find('=').ok_or_else(|| AsdlError::MalformedRule {
        path: path.to_string(),
        snippet: block.to_string(),
        reason: "expected `name = ...`".to_string(),
    })?;
    let name = block[..eq_pos].trim().to_string();
    let constructors = split_top_level(&block[eq_pos + 1..], '|')
        .iter()
        .map(|alt| parse_constructor(path, alt.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Rule { name, constructors })
}

fn parse_constructor(path: &str, alt: &str) -> Result<Constructor, AsdlError> {
    let Some(open) = alt.find('(') else {
        return Ok(Constructor { name: alt.to_string(), fields: Vec::new() });
    };
    let name = alt[..open].trim().to_string();
    let close = alt.rfind(')').ok_or_else(|| AsdlError::MalformedRule {
        path: path.to_string(),
        snippet: alt.to_string(),
        reason: "missing closing `)`".to_string(),
    })?;
    let fields = split_top_level(&alt[open + 1..close], ',')
        .iter()
        .map(|f| parse_field(path, f.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Constructor { name, fields })
}

fn parse_field(path: &str, field: &str) -> Result<Field, AsdlError> {
    let parts: Vec<&str> = field.split_whitespace().collect();
    let [ty_spec, field_name] = parts[..] else {
        return Err(AsdlError::MalformedRule {
            path: path.to_string(),
            snippet: field.to_string(),
            reason: "expected `<type>[*|?] <name>`".to_string(),
        });
    };
    let ty = if let Some(base) = ty_spec.strip_suffix('*') {
        FieldType::List(base.to_string())
    } else if let Some(base) = ty_spec.strip_suffix('?') {
        FieldType::Option(base.to_string())
    } else {
        FieldType::Single(ty_spec.to_string())
    };
    Ok(Field { name: field_name.to_string(), ty })
}

fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Renders `module` as Rust node definitions: a sum-type rule (more than
/// one constructor) becomes an enum with one variant per constructor; a
/// product-type rule (exactly one constructor) becomes a struct named
/// after the constructor.
pub fn render_rust(module: &AsdlModule) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Generated by btrc_astgen from ast/btrc.asdl (module {}).\n", module.name));
    out.push_str("// Informational only -- btrc_ir::ast is the hand-maintained source of truth.\n\n");
    for rule in &module.rules {
        render_rule(&mut out, rule);
        out.push('\n');
    }
    out
}

fn render_rule(out: &mut String, rule: &Rule) {
    if rule.constructors.len() == 1 {
        render_struct(out, &rule.constructors[0]);
    } else {
        render_enum(out, rule);
    }
}

fn render_struct(out: &mut String, ctor: &Constructor) {
    out.push_str("#[derive(Clone, Debug)]\n");
    out.push_str(&format!("pub struct {} {{\n", ctor.name));
    for field in &ctor.fields {
        out.push_str(&format!("    pub {}: {},\n", field.name, render_type(&field.ty)));
    }
    out.push_str("}\n");
}

fn render_enum(out: &mut String, rule: &Rule) {
    let all_unit = rule.constructors.iter().all(|c| c.fields.is_empty());
    if all_unit {
        out.push_str("#[derive(Clone, Copy, Eq, PartialEq, Debug)]\n");
    } else {
        out.push_str("#[derive(Clone, Debug)]\n");
    }
    out.push_str(&format!("pub enum {} {{\n", pascal_case(&rule.name)));
    for ctor in &rule.constructors {
        if ctor.fields.is_empty() {
            out.push_str(&format!("    {},\n", ctor.name));
        } else {
            out.push_str(&format!("    {} {{\n", ctor.name));
            for field in &ctor.fields {
                out.push_str(&format!("        {}: {},\n", field.name, render_type(&field.ty)));
            }
            out.push_str("    },\n");
        }
    }
    out.push_str("}\n");
}

fn render_type(ty: &FieldType) -> String {
    match ty {
        FieldType::Single(base) => scalar_type(base),
        FieldType::Option(base) => format!("Option<{}>", scalar_type(base)),
        FieldType::List(base) => format!("Vec<{}>", mapped_type_name(base)),
    }
}

/// A `Single`/`Option` field's Rust type, boxing the rules that would
/// otherwise make the node infinite-sized (see [`BOXED_RULES`]). A `List`
/// field never needs this: `Vec` already provides its own indirection.
fn scalar_type(base: &str) -> String {
    let name = mapped_type_name(base);
    if BOXED_RULES.contains(&base) {
        format!("Box<{name}>")
    } else {
        name
    }
}

fn mapped_type_name(base: &str) -> String {
    match base {
        "identifier" => "Name".to_string(),
        "span" => "Span".to_string(),
        "string" => "String".to_string(),
        "i64" | "f64" | "bool" | "char" => base.to_string(),
        _ => pascal_case(base),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
        -- a comment
        module BTRC
        {
            program = Program(decl* decls)

            decl = Class(identifier name, identifier? superclass, span span)
                 | Interface(identifier name, span span)

            access = Public | Private

            param = Param(identifier name, type ty, expr? default_value)
        }
    ";

    #[test]
    fn parses_module_name_and_rule_count() {
        let module = parse(SAMPLE, "test").unwrap();
        assert_eq!(module.name, "BTRC");
        assert_eq!(module.rules.len(), 4);
    }

    #[test]
    fn multi_line_constructor_field_list_is_one_constructor() {
        let module = parse(SAMPLE, "test").unwrap();
        let decl = module.rules.iter().find(|r| r.name == "decl").unwrap();
        assert_eq!(decl.constructors.len(), 2);
        assert_eq!(decl.constructors[0].name, "Class");
        assert_eq!(decl.constructors[0].fields.len(), 3);
    }

    #[test]
    fn unit_only_rule_has_no_op_fields() {
        let module = parse(SAMPLE, "test").unwrap();
        let access = module.rules.iter().find(|r| r.name == "access").unwrap();
        assert!(access.constructors.iter().all(|c| c.fields.is_empty()));
    }

    #[test]
    fn list_field_modifier_is_recognized() {
        let module = parse(SAMPLE, "test").unwrap();
        let program = module.rules.iter().find(|r| r.name == "program").unwrap();
        assert!(matches!(program.constructors[0].fields[0].ty, FieldType::List(ref b) if b == "decl"));
    }

    #[test]
    fn optional_field_modifier_is_recognized() {
        let module = parse(SAMPLE, "test").unwrap();
        let decl = module.rules.iter().find(|r| r.name == "decl").unwrap();
        assert!(matches!(decl.constructors[0].fields[1].ty, FieldType::Option(ref b) if b == "identifier"));
    }

    #[test]
    fn render_boxes_recursive_expr_field() {
        let module = parse(SAMPLE, "test").unwrap();
        let rendered = render_rust(&module);
        assert!(rendered.contains("Option<Box<Expr>>"), "{rendered}");
    }

    #[test]
    fn render_emits_struct_for_single_constructor_rule() {
        let module = parse(SAMPLE, "test").unwrap();
        let rendered = render_rust(&module);
        assert!(rendered.contains("pub struct Param {"), "{rendered}");
    }

    #[test]
    fn render_emits_enum_for_sum_rule() {
        let module = parse(SAMPLE, "test").unwrap();
        let rendered = render_rust(&module);
        assert!(rendered.contains("pub enum Decl {"), "{rendered}");
        assert!(rendered.contains("Class {"), "{rendered}");
    }

    #[test]
    fn missing_module_keyword_is_an_error() {
        let result = parse("{ program = Program(decl* decls) }", "test");
        assert!(matches!(result, Err(AsdlError::MissingModule { .. })));
    }

    #[test]
    fn real_asdl_file_parses_and_renders() {
        let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/../../ast/btrc.asdl")).unwrap();
        let module = parse(&text, "btrc.asdl").unwrap();
        assert!(module.rules.iter().any(|r| r.name == "expr"));
        assert!(module.rules.iter().any(|r| r.name == "stmt"));
        let rendered = render_rust(&module);
        assert!(rendered.contains("pub enum Expr {"), "{rendered}");
        assert!(rendered.contains("pub enum Stmt {"), "{rendered}");
    }

    #[test]
    fn load_reads_the_real_asdl_file_from_disk() {
        let module = load(concat!(env!("CARGO_MANIFEST_DIR"), "/../../ast/btrc.asdl")).unwrap();
        assert!(module.rules.iter().any(|r| r.name == "decl"));
    }

    #[test]
    fn load_reports_io_error_for_missing_file() {
        let err = load("/nonexistent/definitely/not/here.asdl").unwrap_err();
        assert!(matches!(err, AsdlError::Io { .. }), "{err}");
    }
}
