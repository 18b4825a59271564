use crate::types::TreeReport;
use anyhow::Result;

/// Trait for report formatters
pub trait ReportFormatter {
    fn format(&self, report: &TreeReport) -> Result<String>;
}

/// JSON formatter
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &TreeReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

/// Plain text formatter
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &TreeReport) -> Result<String> {
        let relations = report
            .relation_counts
            .iter()
            .map(|(kind, count)| format!("- {}: {}", kind, count))
            .collect::<Vec<_>>()
            .join("\n");

        let violations = if report.violations.is_empty() {
            "None".to_string()
        } else {
            report
                .violations
                .iter()
                .map(|v| format!("- {}", v))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(format!(
            r#"Family Tree Report
==================

Members: {}
Relationships: {}
Yeshiva members: {}
Rabbis: {}

Connected: {}
Components: {}
Members that cannot be removed: {}

Relations:
{}

Invariant violations:
{}

Generated at: {}
"#,
            report.member_count,
            report.relationship_count,
            report.yeshiva_count,
            report.rabbi_count,
            if report.connected { "yes" } else { "no" },
            report.components.len(),
            if report.bridge_members.is_empty() {
                "none".to_string()
            } else {
                report.bridge_members.join(", ")
            },
            if relations.is_empty() { "None".to_string() } else { relations },
            violations,
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvariantViolation;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn create_test_report() -> TreeReport {
        TreeReport {
            member_count: 2,
            relationship_count: 0,
            relation_counts: BTreeMap::new(),
            yeshiva_count: 0,
            rabbi_count: 0,
            connected: false,
            components: vec![vec!["a".into()], vec!["b".into()]],
            bridge_members: Vec::new(),
            violations: vec![InvariantViolation::Disconnected { components: 2 }],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_text_lists_violations() {
        let text = TextFormatter.format(&create_test_report()).unwrap();

        assert!(text.contains("Connected: no"));
        assert!(text.contains("- the tree is split into 2 disconnected groups"));
    }

    #[test]
    fn test_json_tags_violations() {
        let json = JsonFormatter.format(&create_test_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["violations"][0]["kind"], "disconnected");
        assert_eq!(value["violations"][0]["components"], 2);
    }
}
