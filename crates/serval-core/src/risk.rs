//! Risk scoring and compliance aggregation
//!
//! Turns diagnostics into numeric risk: per finding a likelihood/impact
//! pair with an explanation, per rule and per project an aggregate, plus a
//! summary of the compliance references (CWE, CERT-C, OWASP) implicated
//! by the rules that fired.

use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::rules::{Confidence, RuleRegistry, Severity};

#[derive(Debug, Clone, Serialize)]
pub struct RiskScore {
    /// Final computed risk, 0.0..=1.0.
    pub overall: f64,
    /// Probability of exploitation, 0.0..=1.0.
    pub likelihood: f64,
    /// Severity of impact, 0.0..=1.0.
    pub impact: f64,
    pub explanation: String,
}

impl RiskScore {
    fn zero() -> Self {
        Self {
            overall: 0.0,
            likelihood: 0.0,
            impact: 0.0,
            explanation: "no findings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleRisk {
    pub rule_id: String,
    pub findings: usize,
    pub score: RiskScore,
}

/// Distinct compliance references of the rules that produced findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComplianceSummary {
    pub cwe: Vec<String>,
    pub cert: Vec<String>,
    pub owasp: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub project: RiskScore,
    pub by_rule: Vec<RuleRisk>,
    pub compliance: ComplianceSummary,
}

fn severity_impact(severity: Severity) -> f64 {
    match severity {
        Severity::Error => 0.9,
        Severity::Warning => 0.6,
        Severity::Info => 0.3,
        Severity::Hint => 0.1,
    }
}

fn confidence_likelihood(confidence: Confidence) -> f64 {
    match confidence {
        Confidence::High => 0.9,
        Confidence::Medium => 0.6,
        Confidence::Low => 0.3,
    }
}

/// Risk of a single finding: likelihood from the rule's confidence, impact
/// from its severity.
pub fn finding_risk(diagnostic: &Diagnostic) -> RiskScore {
    let likelihood = confidence_likelihood(diagnostic.confidence);
    let impact = severity_impact(diagnostic.severity);
    let overall = likelihood * impact;

    RiskScore {
        overall,
        likelihood,
        impact,
        explanation: format!(
            "likelihood {:.2} x impact {:.2} = {:.2} ({})",
            likelihood, impact, overall, diagnostic.rule_id
        ),
    }
}

/// Assesses a set of diagnostics against the registry's rule metadata.
pub fn assess(diagnostics: &[Diagnostic], registry: &RuleRegistry) -> RiskReport {
    if diagnostics.is_empty() {
        return RiskReport {
            project: RiskScore::zero(),
            by_rule: Vec::new(),
            compliance: ComplianceSummary::default(),
        };
    }

    let mut grouped: HashMap<&str, Vec<&Diagnostic>> = HashMap::new();
    for diag in diagnostics {
        grouped.entry(&diag.rule_id).or_default().push(diag);
    }

    let mut by_rule: Vec<RuleRisk> = grouped
        .iter()
        .map(|(rule_id, findings)| {
            // Independent findings compound: 1 - prod(1 - risk).
            let survival: f64 = findings
                .iter()
                .map(|d| 1.0 - finding_risk(d).overall)
                .product();
            let overall = 1.0 - survival;
            let likelihood = findings
                .iter()
                .map(|d| confidence_likelihood(d.confidence))
                .fold(0.0, f64::max);
            let impact = findings
                .iter()
                .map(|d| severity_impact(d.severity))
                .fold(0.0, f64::max);

            RuleRisk {
                rule_id: rule_id.to_string(),
                findings: findings.len(),
                score: RiskScore {
                    overall,
                    likelihood,
                    impact,
                    explanation: format!(
                        "{} finding(s), compounded risk {:.2}",
                        findings.len(),
                        overall
                    ),
                },
            }
        })
        .collect();
    by_rule.sort_by(|a, b| {
        b.score
            .overall
            .partial_cmp(&a.score.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });

    let survival: f64 = by_rule.iter().map(|r| 1.0 - r.score.overall).product();
    let overall = 1.0 - survival;
    let likelihood = by_rule
        .iter()
        .map(|r| r.score.likelihood)
        .fold(0.0, f64::max);
    let impact = by_rule.iter().map(|r| r.score.impact).fold(0.0, f64::max);

    let project = RiskScore {
        overall,
        likelihood,
        impact,
        explanation: format!(
            "{} finding(s) across {} rule(s), compounded risk {:.2}",
            diagnostics.len(),
            by_rule.len(),
            overall
        ),
    };

    RiskReport {
        project,
        by_rule,
        compliance: compliance_summary(diagnostics, registry),
    }
}

fn compliance_summary(diagnostics: &[Diagnostic], registry: &RuleRegistry) -> ComplianceSummary {
    let mut cwe = BTreeSet::new();
    let mut cert = BTreeSet::new();
    let mut owasp = BTreeSet::new();

    for diag in diagnostics {
        let Some(rule) = registry.get_rule(&diag.rule_id) else {
            continue;
        };
        let metadata = rule.metadata();
        if let Some(reference) = metadata.cwe {
            cwe.insert(reference.to_string());
        }
        if let Some(reference) = metadata.cert_reference {
            cert.insert(reference.to_string());
        }
        if let Some(reference) = metadata.owasp_reference {
            owasp.insert(reference.to_string());
        }
    }

    ComplianceSummary {
        cwe: cwe.into_iter().collect(),
        cert: cert.into_iter().collect(),
        owasp: owasp.into_iter().collect(),
    }
}
