//! SARIF 2.1.0 formatter for CI and code-scanning integrations

use serde_json::{json, Value};
use serval_core::diagnostic::Diagnostic;
use serval_core::rules::{RuleRegistry, Severity};

pub struct SarifFormatter<'a> {
    registry: Option<&'a RuleRegistry>,
}

impl<'a> SarifFormatter<'a> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    pub fn with_registry(registry: &'a RuleRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn format(&self, diagnostics: &[Diagnostic]) -> String {
        let sarif = json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "serval",
                        "version": env!("CARGO_PKG_VERSION"),
                        "informationUri": "https://github.com/serval-tools/serval",
                        "rules": self.rule_descriptors(),
                    }
                },
                "results": diagnostics.iter().map(result_for).collect::<Vec<Value>>(),
            }]
        });

        serde_json::to_string_pretty(&sarif)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {}\"}}", e))
    }

    fn rule_descriptors(&self) -> Vec<Value> {
        let Some(registry) = self.registry else {
            return Vec::new();
        };

        registry
            .rules()
            .map(|rule| {
                let metadata = rule.metadata();
                let mut descriptor = json!({
                    "id": metadata.id,
                    "name": metadata.name,
                    "shortDescription": { "text": metadata.description },
                });
                if let Some(cwe) = metadata.cwe {
                    descriptor["properties"] = json!({ "tags": ["security", cwe] });
                }
                descriptor
            })
            .collect()
    }
}

impl Default for SarifFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn result_for(diag: &Diagnostic) -> Value {
    json!({
        "ruleId": diag.rule_id,
        "level": sarif_level(&diag.severity),
        "message": { "text": diag.message },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": { "uri": diag.file },
                "region": {
                    "startLine": diag.line,
                    "startColumn": diag.column,
                    "endLine": diag.end_line,
                    "endColumn": diag.end_column,
                }
            }
        }]
    })
}

fn sarif_level(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
        Severity::Hint => "note",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serval_core::analysis::AnalysisEngine;

    fn diag() -> Diagnostic {
        Diagnostic::new("S001", Severity::Error, "taint flow", "a.c", 4, 2).with_end(4, 8)
    }

    #[test]
    fn sarif_has_schema_and_version() {
        let formatter = SarifFormatter::new();
        let output = formatter.format(&[diag()]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "serval");
    }

    #[test]
    fn results_carry_location_and_level() {
        let formatter = SarifFormatter::new();
        let output = formatter.format(&[diag()]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let result = &parsed["runs"][0]["results"][0];
        assert_eq!(result["ruleId"], "S001");
        assert_eq!(result["level"], "error");
        let region = &result["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 4);
        assert_eq!(region["endColumn"], 8);
    }

    #[test]
    fn registry_rules_are_exported_as_descriptors() {
        let engine = AnalysisEngine::new();
        let formatter = SarifFormatter::with_registry(engine.registry());
        let output = formatter.format(&[]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let rules = parsed["runs"][0]["tool"]["driver"]["rules"]
            .as_array()
            .unwrap();
        assert!(rules.iter().any(|r| r["id"] == "S001"));
        assert!(rules.iter().any(|r| r["id"] == "Q101"));
    }

    #[test]
    fn info_and_hint_map_to_note() {
        assert_eq!(sarif_level(&Severity::Info), "note");
        assert_eq!(sarif_level(&Severity::Hint), "note");
    }
}
