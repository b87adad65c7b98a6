//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep the try-on crates honest:
//! - No sleep() calls in production code (progress uses `tokio::time::interval`)
//! - No blocking I/O inside async functions
//!
//! Production code is everything in a file before its first `#[cfg(test)]`.

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories scanned by every check, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["tryon/core/src", "tryon/cli/src"];

/// A line of production code
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// The raw line
    pub text: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.text.trim())
    }
}

/// Root of the workspace this crate lives in
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files under `dir` (relative to the workspace root)
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Lines of a file up to its test module
pub fn production_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .collect()
}

/// Code part of a line, comments stripped
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Every production line in the scanned directories
pub fn scan_production_code() -> Vec<(SourceLine, Vec<String>)> {
    let mut out = Vec::new();
    for dir in PRODUCTION_DIRS {
        for path in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let lines: Vec<String> = production_lines(&content)
                .into_iter()
                .map(str::to_string)
                .collect();
            for (idx, text) in lines.iter().enumerate() {
                out.push((
                    SourceLine {
                        path: path.clone(),
                        number: idx + 1,
                        text: text.clone(),
                    },
                    lines[..idx].to_vec(),
                ));
            }
        }
    }
    out
}

/// `Some(is_async)` if the line opens a function
pub fn fn_header(line: &str) -> Option<bool> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    if rest.starts_with("fn ") {
        Some(false)
    } else if rest.starts_with("async fn ") {
        Some(true)
    } else {
        None
    }
}

/// Whether the nearest enclosing function above `preceding` is async
pub fn in_async_fn(preceding: &[String]) -> bool {
    preceding
        .iter()
        .rev()
        .find_map(|line| fn_header(line))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_header() {
        assert_eq!(fn_header("    pub async fn start(&mut self) {"), Some(true));
        assert_eq!(fn_header("pub(crate) fn helper() {"), Some(false));
        assert_eq!(fn_header("fn main() {"), Some(false));
        assert_eq!(fn_header("let f = 1;"), None);
    }

    #[test]
    fn test_production_lines_stop_at_tests() {
        let content = "fn a() {}\n#[cfg(test)]\nmod tests {}\n";
        assert_eq!(production_lines(content), vec!["fn a() {}"]);
    }

    #[test]
    fn test_in_async_fn() {
        let lines = vec![
            "fn sync_one() {}".to_string(),
            "pub async fn load() {".to_string(),
            "    let x = 1;".to_string(),
        ];
        assert!(in_async_fn(&lines));
        assert!(!in_async_fn(&lines[..1]));
    }

    #[test]
    fn test_scan_finds_the_core_crate() {
        assert!(!rust_files("tryon/core/src").is_empty());
    }
}
