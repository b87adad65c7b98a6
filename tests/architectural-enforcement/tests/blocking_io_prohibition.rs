//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in the try-on crates MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, async `reqwest`.
//!
//! Blocking calls in plain functions are accepted (config loading runs before
//! any request goes out).

use architectural_enforcement::{code_part, in_async_fn, scan_production_code};

#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();

    for (line, preceding) in scan_production_code() {
        let code = code_part(&line.text);
        if let Some(kind) = blocking_kind(code) {
            if in_async_fn(&preceding) {
                violations.push(format!("{line} ({kind})"));
            }
        }
        if code.contains("reqwest::blocking") {
            violations.push(format!("{line} (blocking HTTP client)"));
        }
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs / tokio::net inside async functions.");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

fn blocking_kind(code: &str) -> Option<&'static str> {
    if code.contains("std::fs::") || code.contains("use std::fs") {
        Some("blocking file I/O")
    } else if code.contains("std::net::") || code.contains("use std::net") {
        Some("blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("blocking process I/O")
    } else if code.contains("std::io::stdin()") {
        Some("blocking stdin")
    } else {
        None
    }
}

#[test]
fn test_blocking_detection() {
    assert_eq!(
        blocking_kind("    let contents = std::fs::read_to_string(\"file.txt\")?;"),
        Some("blocking file I/O")
    );
    assert_eq!(blocking_kind("let bytes = tokio::fs::read(&path).await?;"), None);
    assert!(in_async_fn(&["async fn load() {".to_string()]));
    assert!(!in_async_fn(&["pub fn load_config() {".to_string()]));
}
