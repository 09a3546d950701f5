use colored::*;
use serde_json::Value;
use std::time::Duration;

use crate::api_client::Verification;

#[derive(Debug)]
pub struct TestResult {
    pub scenario: String,
    pub passed: bool,
    pub message: Option<String>,
    pub duration: Duration,
}

impl TestResult {
    pub fn pass(scenario: &str, message: Option<String>, duration: Duration) -> Self {
        Self {
            scenario: scenario.to_string(),
            passed: true,
            message,
            duration,
        }
    }

    pub fn fail(scenario: &str, message: String, duration: Duration) -> Self {
        Self {
            scenario: scenario.to_string(),
            passed: false,
            message: Some(message),
            duration,
        }
    }
}

pub fn print_header(title: &str) {
    println!("\n{}", format!("=== {} ===", title).bright_cyan().bold());
}

pub fn print_step(message: &str) {
    println!("{} {}", "→".blue(), message);
}

pub fn print_ok(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_failure(message: &str) {
    println!("{} {}", "✗".red(), message);
}

pub fn print_json(value: &Value) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        for line in pretty.lines() {
            println!("   {}", line.dimmed());
        }
    }
}

pub fn print_verification(verification: &Verification) {
    let actual = verification.actual.as_deref().unwrap_or("");
    if verification.passed() {
        print_ok(&format!("Phone saved correctly: '{}'", actual));
    } else {
        print_failure(&format!(
            "Phone NOT saved. Expected: '{}', Actual: '{}'",
            verification.expected, actual
        ));
    }
}

pub fn print_test_summary(results: &[TestResult]) {
    println!("\n{}", "=== TEST SUMMARY ===".bright_white().bold());

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total - passed;

    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };

        println!("[{}] {} ({:?})", status, result.scenario, result.duration);

        if let Some(msg) = &result.message {
            println!("      {}", msg.dimmed());
        }
    }

    println!(
        "\n{}: {} passed, {} failed",
        "Results".bold(),
        passed.to_string().green(),
        failed.to_string().red()
    );
}

pub fn all_passed(results: &[TestResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_passed_needs_at_least_one_result() {
        assert!(!all_passed(&[]));

        let results = vec![
            TestResult::pass("a", None, Duration::ZERO),
            TestResult::pass("b", Some("ok".to_string()), Duration::ZERO),
        ];
        assert!(all_passed(&results));
    }

    #[test]
    fn test_single_failure_fails_the_run() {
        let results = vec![
            TestResult::pass("a", None, Duration::ZERO),
            TestResult::fail("b", "boom".to_string(), Duration::ZERO),
        ];
        assert!(!all_passed(&results));
        assert_eq!(results[1].message.as_deref(), Some("boom"));
    }
}
