//! JSON formatter for machine-readable output

use serde::Serialize;
use serval_core::diagnostic::Diagnostic;
use serval_core::risk::RiskReport;
use serval_core::rules::Severity;

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: Summary<'a>,
    diagnostics: &'a [Diagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    risk: Option<&'a RiskReport>,
}

#[derive(Serialize)]
struct Summary<'a> {
    analyzed_path: &'a str,
    total_files: usize,
    total_diagnostics: usize,
    errors: usize,
    warnings: usize,
}

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(
        &self,
        diagnostics: &[Diagnostic],
        total_files: usize,
        analyzed_path: &str,
        risk: Option<&RiskReport>,
    ) -> String {
        let output = JsonOutput {
            summary: Summary {
                analyzed_path,
                total_files,
                total_diagnostics: diagnostics.len(),
                errors: diagnostics
                    .iter()
                    .filter(|d| matches!(d.severity, Severity::Error))
                    .count(),
                warnings: diagnostics
                    .iter()
                    .filter(|d| matches!(d.severity, Severity::Warning))
                    .count(),
            },
            diagnostics,
            risk,
        };

        serde_json::to_string_pretty(&output)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {}\"}}", e))
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}
