//! Diagnostic reporting for analysis results
//!
//! Structured description of one issue found during analysis, with enough
//! position information for editors and formatters.

use serde::Serialize;

use crate::rules::{Confidence, Severity};

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Function the issue was found in, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl Diagnostic {
    pub fn new(
        rule_id: &str,
        severity: Severity,
        message: &str,
        file: &str,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            confidence: Confidence::default(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
            end_line: line,
            end_column: column,
            suggestion: None,
            function_name: None,
        }
    }

    pub fn with_end(mut self, line: usize, column: usize) -> Self {
        self.end_line = line;
        self.end_column = column;
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_function(mut self, function_name: &str) -> Self {
        self.function_name = Some(function_name.to_string());
        self
    }
}
