use crate::types::{MemberId, MemberMap};
use petgraph::algo::connected_components;
use petgraph::dot::Dot;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;
use tracing::debug;

/// Wrapper around a petgraph UnGraph for rendering the family tree.
///
/// Each relationship appears once, labelled from both sides
/// (e.g. "son / father").
pub struct FamilyGraph {
    graph: UnGraph<String, String>,
    node_map: HashMap<MemberId, NodeIndex>,
}

impl FamilyGraph {
    pub fn from_members(members: &MemberMap) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut node_map = HashMap::new();

        for (id, member) in members {
            let index = graph.add_node(member.display_name());
            node_map.insert(id.clone(), index);
        }

        for (id, member) in members {
            for (kind, relative_id) in member.neighbors() {
                // Each edge is stored on both endpoints; keep the copy seen
                // from the smaller id.
                if relative_id <= id {
                    continue;
                }
                let (Some(&from), Some(&to), Some(relative)) = (
                    node_map.get(id),
                    node_map.get(relative_id),
                    members.get(relative_id),
                ) else {
                    continue;
                };

                let label = format!(
                    "{} / {}",
                    kind.display_as_relation(relative.gender),
                    kind.inverse(member.gender).display_as_relation(member.gender)
                );
                graph.add_edge(from, to, label);
            }
        }

        debug!(
            "Built family graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Self { graph, node_map }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::RelationKind;
    use crate::types::{Gender, Member};

    fn create_test_members() -> MemberMap {
        let mut map: MemberMap = [
            Member::with_id("a", "Avraham", "", Gender::Male).rabbi(false),
            Member::with_id("b", "Sarah", "", Gender::Female),
            Member::with_id("c", "Yitzchak", "", Gender::Male),
        ]
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

        for (source, target, kind) in [
            ("b", "a", RelationKind::Spouse),
            ("a", "c", RelationKind::Father),
            ("b", "c", RelationKind::Mother),
        ] {
            let target_gender = map[target].gender;
            map.get_mut(target).unwrap().link(kind, source);
            map.get_mut(source).unwrap().link(kind.inverse(target_gender), target);
        }
        map
    }

    #[test]
    fn test_each_relationship_is_one_edge() {
        let graph = FamilyGraph::from_members(&create_test_members());

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.component_count(), 1);
        assert!(graph.contains("a"));
    }

    #[test]
    fn test_dot_output() {
        let dot = FamilyGraph::from_members(&create_test_members()).to_dot();

        assert!(dot.starts_with("graph {"));
        assert!(dot.contains("Rabbi Avraham"));
        assert!(dot.contains("son / father"));
        assert!(dot.contains("wife / husband"));
    }

    #[test]
    fn test_isolated_member_is_its_own_component() {
        let mut members = create_test_members();
        members.insert("z".into(), Member::with_id("z", "Lot", "", Gender::Male));

        assert_eq!(FamilyGraph::from_members(&members).component_count(), 2);
    }
}
