//! `include "path.btrc";` textual inclusion (spec.md §6.2): performed on
//! the raw source text before tokenization ever begins, the same way the
//! C preprocessor splices in a header -- the lexer and parser downstream
//! never see an `include` directive, which is why `ast::Decl::Include`'s
//! lowering arm is a documented no-op (spec.md §5).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum IncludeError {
    #[error("{path}: {source}")]
    Io { path: String, source: std::io::Error },
}

/// Reads `main_path` and recursively splices in every `include "...";`
/// line it finds, resolving each include's path relative to the file
/// that names it. A file included more than once (directly or through a
/// cycle) is spliced in only the first time -- later includes of an
/// already-seen path become a no-op, the include-guard behavior spec.md
/// §6.2 calls for ("a file is included at most once per compilation").
pub fn resolve_includes(main_path: impl AsRef<Path>) -> Result<String, IncludeError> {
    let mut seen = HashSet::new();
    resolve_file(main_path.as_ref(), &mut seen)
}

fn resolve_file(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<String, IncludeError> {
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(canonical) {
        return Ok(String::new());
    }

    let raw = fs::read_to_string(path).map_err(|source| IncludeError::Io { path: path.display().to_string(), source })?;
    let normalized = raw.replace("\r\n", "\n");
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut out = String::with_capacity(normalized.len());
    for line in normalized.lines() {
        match parse_include_line(line) {
            Some(included_path) => {
                let resolved = resolve_file(&base_dir.join(included_path), seen)?;
                out.push_str(&resolved);
                if !resolved.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Recognizes a bare `include "path";` statement line, ignoring leading
/// and trailing whitespace. Any other shape (the directive sharing a
/// line with other code, a comment, a string literal elsewhere) is left
/// untouched and flows through to the lexer/parser unchanged.
fn parse_include_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("include")?;
    let rest = rest.strip_prefix(char::is_whitespace)?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let rest = rest.strip_suffix(';')?.trim_end();
    rest.strip_suffix('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn splices_in_the_included_file_verbatim() {
        let dir = tempfile_dir();
        write_temp(&dir, "util.btrc", "int helper() { return 1; }\n");
        let main = write_temp(&dir, "main.btrc", "include \"util.btrc\";\nvoid main() { }\n");
        let resolved = resolve_includes(&main).unwrap();
        assert!(resolved.contains("int helper() { return 1; }"));
        assert!(resolved.contains("void main() { }"));
    }

    #[test]
    fn same_file_included_twice_only_splices_once() {
        let dir = tempfile_dir();
        write_temp(&dir, "util.btrc", "int helper() { return 1; }\n");
        let main = write_temp(
            &dir,
            "main.btrc",
            "include \"util.btrc\";\ninclude \"util.btrc\";\nvoid main() { }\n",
        );
        let resolved = resolve_includes(&main).unwrap();
        assert_eq!(resolved.matches("int helper()").count(), 1);
    }

    #[test]
    fn crlf_is_normalized_to_lf() {
        let dir = tempfile_dir();
        let main = write_temp(&dir, "main.btrc", "void main() { }\r\n");
        let resolved = resolve_includes(&main).unwrap();
        assert!(!resolved.contains('\r'));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = resolve_includes("/nonexistent/definitely/not/here.btrc").unwrap_err();
        assert!(matches!(err, IncludeError::Io { .. }));
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("btrc_include_test_{:?}", std::thread::current().id()));
        let _ = fs::create_dir_all(&dir);
        dir
    }
}
