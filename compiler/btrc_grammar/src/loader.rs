//! Parses the `@lexical` / `@syntax` EBNF file format into a [`GrammarInfo`].

use std::collections::HashSet;
use std::path::Path;

use btrc_ir::{KeywordId, OperatorId};
use rustc_hash::FxHashMap;

use crate::error::GrammarError;

/// Everything later stages need to know about the grammar: the keyword
/// set, the operator list (always longest-first), and a kind id for each
/// (spec.md §4.1).
#[derive(Debug)]
pub struct GrammarInfo {
    keywords: Vec<String>,
    keyword_index: FxHashMap<String, KeywordId>,
    /// Operators, always sorted longest-first by lexeme byte length.
    operators: Vec<String>,
    operator_index: FxHashMap<String, OperatorId>,
    /// The `@syntax` section's raw text, kept only for validity/documentation.
    pub syntax_text: String,
}

impl GrammarInfo {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.display().to_string();
        let text = std::fs::read_to_string(path_ref)
            .map_err(|source| GrammarError::Io { path: path_str.clone(), source })?;
        Self::parse(&text, &path_str)
    }

    pub fn parse(text: &str, path_label: &str) -> Result<Self, GrammarError> {
        let stripped = strip_comments(text);

        let lexical_body = extract_braced_section(&stripped, "@lexical").ok_or_else(|| {
            GrammarError::MissingLexicalSection { path: path_label.to_string() }
        })?;
        let syntax_body = extract_braced_section(&stripped, "@syntax").ok_or_else(|| {
            GrammarError::MissingSyntaxSection { path: path_label.to_string() }
        })?;

        let keywords_body = extract_braced_section(&lexical_body, "keywords").ok_or_else(|| {
            GrammarError::MalformedLexical {
                path: path_label.to_string(),
                reason: "missing `keywords { ... }` block".to_string(),
            }
        })?;
        let operators_body = extract_braced_section(&lexical_body, "operators").ok_or_else(|| {
            GrammarError::MalformedLexical {
                path: path_label.to_string(),
                reason: "missing `operators { ... }` block".to_string(),
            }
        })?;

        let mut keywords = Vec::new();
        let mut keyword_index = FxHashMap::default();
        let mut seen_keywords = HashSet::new();
        for word in keywords_body.split_whitespace() {
            if !seen_keywords.insert(word.to_string()) {
                return Err(GrammarError::DuplicateKeyword {
                    path: path_label.to_string(),
                    word: word.to_string(),
                });
            }
            let id = KeywordId(keywords.len() as u16);
            keywords.push(word.to_string());
            keyword_index.insert(word.to_string(), id);
        }

        let mut operator_lexemes = extract_quoted_strings(&operators_body);
        // The loader guarantees longest-first output regardless of how the
        // file grouped them for readability (spec.md §4.1's "operator list
        // in longest-first order").
        operator_lexemes.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut operators = Vec::new();
        let mut operator_index = FxHashMap::default();
        let mut seen_ops = HashSet::new();
        for op in operator_lexemes {
            if !seen_ops.insert(op.clone()) {
                return Err(GrammarError::DuplicateOperator { path: path_label.to_string(), op });
            }
            let id = OperatorId(operators.len() as u16);
            operator_index.insert(op.clone(), id);
            operators.push(op);
        }

        if keywords.is_empty() {
            return Err(GrammarError::MalformedLexical {
                path: path_label.to_string(),
                reason: "`keywords` block is empty".to_string(),
            });
        }
        if operators.is_empty() {
            return Err(GrammarError::MalformedLexical {
                path: path_label.to_string(),
                reason: "`operators` block is empty".to_string(),
            });
        }

        Ok(GrammarInfo {
            keywords,
            keyword_index,
            operators,
            operator_index,
            syntax_text: syntax_body,
        })
    }

    pub fn keyword_id(&self, text: &str) -> Option<KeywordId> {
        self.keyword_index.get(text).copied()
    }

    pub fn keyword_text(&self, id: KeywordId) -> &str {
        &self.keywords[id.0 as usize]
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Operators in longest-first order, for maximal-munch matching.
    pub fn operators(&self) -> &[String] {
        &self.operators
    }

    pub fn operator_id(&self, text: &str) -> Option<OperatorId> {
        self.operator_index.get(text).copied()
    }

    pub fn operator_text(&self, id: OperatorId) -> &str {
        &self.operators[id.0 as usize]
    }
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '(' && chars.peek() == Some(&'*') {
            chars.next();
            loop {
                match chars.next() {
                    Some('*') if chars.peek() == Some(&')') => {
                        chars.next();
                        break;
                    }
                    Some(_) => continue,
                    None => break,
                }
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Find `name { ... }` and return the text strictly between the matching
/// braces, tracking nested braces and skipping brace characters inside
/// quoted strings.
fn extract_braced_section(text: &str, name: &str) -> Option<String> {
    let start = find_keyword_followed_by_brace(text, name)?;
    let bytes = text.as_bytes();
    let mut i = start;
    while bytes[i] != b'{' {
        i += 1;
    }
    let open = i;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut end = None;
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let start_idx = chars.iter().position(|&(idx, _)| idx == open)?;
    for &(idx, c) in &chars[start_idx..] {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;
    Some(text[open + 1..end].to_string())
}

/// Find the byte offset of the `{` that follows a standalone occurrence of
/// `name` (as a whole word, not a substring of a longer identifier).
fn find_keyword_followed_by_brace(text: &str, name: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(name) {
        let at = search_from + rel;
        let before_ok = at == 0 || !text.as_bytes()[at - 1].is_ascii_alphanumeric();
        let after = at + name.len();
        let after_ok = after >= text.len() || !text.as_bytes()[after].is_ascii_alphanumeric();
        if before_ok && after_ok {
            let rest = text[after..].trim_start();
            if rest.starts_with('{') {
                return Some(after + (text[after..].len() - rest.len()));
            }
        }
        search_from = at + name.len();
    }
    None
}

fn extract_quoted_strings(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            let mut lexeme = String::new();
            for next in chars.by_ref() {
                if next == '"' {
                    break;
                }
                lexeme.push(next);
            }
            result.push(lexeme);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        (* a comment *)
        @lexical {
            keywords {
                class if else
            }
            operators {
                "==" "="
                "+" "-"
            }
        }
        @syntax {
            program = { declaration } ;
        }
    "#;

    #[test]
    fn parses_keywords_and_operators() {
        let grammar = GrammarInfo::parse(SAMPLE, "test").unwrap();
        assert_eq!(grammar.keywords(), &["class", "if", "else"]);
        assert!(grammar.keyword_id("if").is_some());
        assert!(grammar.keyword_id("nonexistent").is_none());
    }

    #[test]
    fn operators_are_sorted_longest_first() {
        let grammar = GrammarInfo::parse(SAMPLE, "test").unwrap();
        assert_eq!(grammar.operators(), &["==", "+", "-", "="]);
    }

    #[test]
    fn duplicate_keyword_is_an_error() {
        let text = SAMPLE.replace("class if else", "class if else if");
        let result = GrammarInfo::parse(&text, "test");
        assert!(matches!(result, Err(GrammarError::DuplicateKeyword { .. })));
    }

    #[test]
    fn missing_lexical_section_is_an_error() {
        let result = GrammarInfo::parse("@syntax { x = y ; }", "test");
        assert!(matches!(result, Err(GrammarError::MissingLexicalSection { .. })));
    }

    #[test]
    fn syntax_text_is_captured_for_validity_only() {
        let grammar = GrammarInfo::parse(SAMPLE, "test").unwrap();
        assert!(grammar.syntax_text.contains("program"));
    }
}
