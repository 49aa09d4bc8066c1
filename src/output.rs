//! Structured output writer supporting JSON Lines and human-readable modes.

use serde::Serialize;

use crate::cli_style::{
    details_table, notice_box, results_table, section_header, styled_count, Icons, Theme,
};
use crate::core::api::format_radius;
use crate::core::model::StarSystem;
use crate::core::search::SearchOutcome;
use crate::error::StarfinderError;

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Structured operation result for JSON output
#[derive(Debug, Serialize)]
pub struct OperationResult {
    pub operation: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl OperationResult {
    pub fn ok(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            success: true,
            path: None,
            count: None,
            error: None,
            category: None,
        }
    }

    pub fn failed(operation: &str, err: &StarfinderError) -> Self {
        Self {
            operation: operation.to_string(),
            success: false,
            path: None,
            count: None,
            error: Some(sanitize_error(&err.to_string())),
            category: Some(err.category().to_string()),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// First JSON line of a search; one line per system follows
#[derive(Debug, Serialize)]
struct SearchSummary<'a> {
    operation: &'static str,
    star: &'a str,
    requested_radius: f64,
    radius_used: f64,
    count: usize,
    fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    notices: Vec<&'a str>,
    elapsed_secs: f64,
}

/// Structured output writer that supports both human-readable and JSON output
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    fn json_line<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            println!("{}", json);
        }
    }

    /// Print a search outcome, brief or with every field
    pub fn search_outcome(&self, outcome: &SearchOutcome, details: bool) {
        match self.mode {
            OutputMode::Json => {
                self.json_line(&SearchSummary {
                    operation: "search",
                    star: &outcome.star,
                    requested_radius: outcome.requested_radius,
                    radius_used: outcome.radius_used,
                    count: outcome.systems.len(),
                    fallback_used: outcome.fallback_used,
                    error: outcome.error.as_deref(),
                    notices: outcome.notices.iter().map(|n| n.message.as_str()).collect(),
                    elapsed_secs: outcome.elapsed.as_secs_f64(),
                });
                for system in &outcome.systems {
                    self.json_line(system);
                }
            }
            OutputMode::Human => {
                notice_box(&outcome.notices);
                if let Some(ref error) = outcome.error {
                    eprintln!("{}\n{}\n", Theme::warning("Some errors occurred:"), error);
                }
                if outcome.systems.is_empty() {
                    println!(
                        "No systems found within {} ly of '{}'.",
                        format_radius(outcome.radius_used),
                        outcome.star
                    );
                    return;
                }
                let title = format!(
                    "Star systems within {} ly of '{}'",
                    format_radius(outcome.radius_used),
                    outcome.star
                );
                self.print_systems(&title, &outcome.systems, details);
            }
        }
    }

    /// Print a list of systems under a title
    pub fn systems(&self, title: &str, systems: &[StarSystem], details: bool) {
        match self.mode {
            OutputMode::Json => {
                for system in systems {
                    self.json_line(system);
                }
            }
            OutputMode::Human => self.print_systems(title, systems, details),
        }
    }

    fn print_systems(&self, title: &str, systems: &[StarSystem], details: bool) {
        section_header(title);
        if details {
            for system in systems {
                println!("{} {}", Icons::STAR, Theme::star(&system.name));
                println!("{}", details_table(system));
                println!("{}", Theme::muted("-".repeat(40)));
            }
        } else {
            println!("{}", results_table(systems));
        }
        println!("Total: {}", styled_count(systems.len()));
    }

    /// Print an operation result
    pub fn operation_result(&self, result: &OperationResult) {
        match self.mode {
            OutputMode::Json => self.json_line(result),
            OutputMode::Human => {
                if result.success {
                    let mut line = format!("{} {}", Icons::SUCCESS, result.operation);
                    if let Some(count) = result.count {
                        line.push_str(&format!(": {}", count));
                    }
                    if let Some(ref path) = result.path {
                        line.push_str(&format!(" {} {}", Icons::ARROW_RIGHT, path));
                    }
                    println!("{}", Theme::success(line));
                } else if let Some(err) = &result.error {
                    eprintln!("  {} {}", Icons::ERROR, sanitize_error(err));
                }
            }
        }
    }

    /// Print an error message
    pub fn failure(&self, err: &StarfinderError, hint: Option<&str>) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(&OperationResult::failed("error", err)) {
                    eprintln!("{}", json);
                }
            }
            OutputMode::Human => crate::cli_style::print_error(&err.to_string(), hint),
        }
    }

    /// Print an info message (suppressed in JSON mode)
    pub fn info(&self, msg: &str) {
        if !self.is_json() {
            crate::cli_style::print_info(msg);
        }
    }
}

/// Sanitize error messages by collapsing whitespace
pub fn sanitize_error(msg: &str) -> String {
    msg.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_error() {
        assert_eq!(
            sanitize_error("EDSM system API error:\n\tbad   gateway\r\n"),
            "EDSM system API error: bad gateway"
        );
    }

    #[test]
    fn test_operation_result_json() {
        let result = OperationResult::ok("export_results")
            .with_path("results/Sol.json")
            .with_count(2);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["operation"], "export_results");
        assert_eq!(json["count"], 2);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_carries_category() {
        let err = StarfinderError::InvalidRadius {
            radius: 100.0,
            min: 4.0,
            max: 40.0,
        };
        let json = serde_json::to_value(OperationResult::failed("error", &err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["category"], "validation");
        assert_eq!(json["error"], "Invalid radius 100: must be between 4 and 40 ly");

        let json = serde_json::to_value(OperationResult::ok("cache_clear")).unwrap();
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_writer_mode() {
        assert!(OutputWriter::new(true).is_json());
        assert_eq!(OutputWriter::new(false).mode, OutputMode::Human);
    }
}
