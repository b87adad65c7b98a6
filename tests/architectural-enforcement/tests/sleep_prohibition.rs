//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the try-on crates MUST NOT call sleep methods.
//! Waiting happens on I/O, oneshot channels, or `tokio::time::interval` ticks.

use architectural_enforcement::{code_part, scan_production_code, SourceLine};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::time::interval for periodic work and await I/O otherwise.");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_sleep_violations() -> Vec<SourceLine> {
    scan_production_code()
        .into_iter()
        .filter(|(line, _)| is_sleep_call(code_part(&line.text)))
        .map(|(line, _)| line)
        .collect()
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep_call(
        "    tokio::time::sleep(Duration::from_millis(10)).await;"
    ));
    assert!(is_sleep_call("std::thread::sleep(d);"));
    assert!(!is_sleep_call("let mut ticker = tokio::time::interval(period);"));
    assert!(!is_sleep_call(code_part("// never sleep() here")));
}
