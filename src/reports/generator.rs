use crate::kinship::FamilyTree;
use crate::reports::formatters::{JsonFormatter, ReportFormatter, TextFormatter};
use crate::types::{MemberType, TreeReport};
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

/// Report generator for tree health summaries
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Collect counts, connectivity and invariant findings for `tree`.
    pub fn generate(&self, tree: &FamilyTree) -> TreeReport {
        let members = tree.members();

        let mut relation_counts = BTreeMap::new();
        let mut entries = 0;
        for member in members.values() {
            for (kind, ids) in member.connections() {
                *relation_counts.entry(*kind).or_insert(0) += ids.len();
                entries += ids.len();
            }
        }

        let report = TreeReport {
            member_count: members.len(),
            relationship_count: entries / 2,
            relation_counts,
            yeshiva_count: members
                .values()
                .filter(|m| m.member_type == MemberType::Yeshiva)
                .count(),
            rabbi_count: members.values().filter(|m| m.is_rabbi).count(),
            connected: tree.is_tree_connected(),
            components: tree.components(),
            bridge_members: tree.bridge_members(),
            violations: tree.verify_invariants(),
            generated_at: Utc::now(),
        };

        debug!(
            "Generated report: {} members, {} relationships, {} violations",
            report.member_count,
            report.relationship_count,
            report.violations.len()
        );
        report
    }

    /// Render the report in the specified format
    pub fn render(&self, report: &TreeReport, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "json" => JsonFormatter.format(report),
            "text" => TextFormatter.format(report),
            _ => Err(anyhow::anyhow!("Unsupported format: {}", format)),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::RelationKind;
    use crate::types::{Gender, Member};

    fn create_test_tree() -> FamilyTree {
        let mut tree = FamilyTree::new();
        tree.add_first_member(Member::with_id("dad", "Yaakov", "Levi", Gender::Male).rabbi(false))
            .unwrap();
        tree.add_related_member(
            Member::with_id("mom", "Rachel", "Levi", Gender::Female),
            "dad",
            RelationKind::Spouse,
            false,
        )
        .unwrap();
        tree.add_related_member(
            Member::with_id("kid", "Yosef", "Levi", Gender::Male).yeshiva(Some(4)),
            "dad",
            RelationKind::Son,
            false,
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_generate_counts() {
        let report = ReportGenerator::new().generate(&create_test_tree());

        assert_eq!(report.member_count, 3);
        assert_eq!(report.relationship_count, 2);
        assert_eq!(report.relation_counts[&RelationKind::Spouse], 2);
        assert_eq!(report.relation_counts[&RelationKind::Father], 1);
        assert_eq!(report.yeshiva_count, 1);
        assert_eq!(report.rabbi_count, 2);
        assert_eq!(report.bridge_members, vec!["dad"]);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_render_formats() {
        let generator = ReportGenerator::new();
        let report = generator.generate(&create_test_tree());

        let json = generator.render(&report, "JSON").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["member_count"], 3);

        assert!(generator.render(&report, "text").unwrap().contains("Members: 3"));
        assert!(generator.render(&report, "xml").is_err());
    }
}
