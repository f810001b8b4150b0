//! Human-facing status lines. Everything goes to stderr so stdout carries
//! only JSON reports.

use console::style;

use crate::types::{Issue, IssueLog, IssueSeverity};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        eprintln!("\n{}", style(message).bold());
        eprintln!("{}", "─".repeat(40));
    }

    /// One line per issue, errors first
    pub fn issues(&self, issues: &IssueLog) {
        for issue in issues.errors().chain(issues.warnings()) {
            let line = format_issue(issue);
            match issue.severity {
                IssueSeverity::Error => self.error(&line),
                IssueSeverity::Warning => self.warning(&line),
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn format_issue(issue: &Issue) -> String {
    let location = match (&issue.file, issue.line) {
        (Some(file), Some(line)) => format!("{}:{}: ", file, line),
        (Some(file), None) => format!("{}: ", file),
        _ => String::new(),
    };
    match &issue.hint {
        Some(hint) => format!("{}{} ({})", location, issue.message, style(hint).dim()),
        None => format!("{}{}", location, issue.message),
    }
}
