use crate::error::PathError;
use crate::queue::UniqueQueue;
use crate::relations::RelationKind;
use crate::types::{Member, MemberId, MemberMap};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Connectivity queries over a caller-supplied member collection.
///
/// Every query is a breadth-first traversal with a [`UniqueQueue`] frontier.
/// Neighbors are discovered by relation kind order, then ascending id, so
/// results are reproducible. Nothing is cached between calls.
pub struct ConnectivityChecker;

impl ConnectivityChecker {
    /// True when every member can reach every other one. Trivially true for
    /// zero or one member.
    pub fn is_connected(members: &MemberMap) -> bool {
        let Some(start) = members.keys().next() else {
            return true;
        };
        if members.len() == 1 {
            return true;
        }

        let visited = Self::reachable(members, start, |_, _| true);
        debug!("Reached {} of {} members", visited.len(), members.len());
        visited.len() == members.len()
    }

    /// Would the tree stay connected without `target` and its edges?
    ///
    /// Works on a logical view that skips `target`; the collection is not
    /// copied. An id that is not in the collection leaves the graph as is.
    pub fn can_safely_delete(members: &MemberMap, target: &str) -> bool {
        if !members.contains_key(target) {
            return Self::is_connected(members);
        }

        let remaining = members.len() - 1;
        let Some(start) = members.keys().find(|id| id.as_str() != target) else {
            return true;
        };

        let visited = Self::reachable(members, start, |_, next| next != target);
        debug!(
            "Without {} reached {} of {} members",
            target,
            visited.len(),
            remaining
        );
        visited.len() == remaining
    }

    /// Would `a` and `b` stay connected if every edge between them were
    /// removed? Unknown ids are never safe to unlink.
    pub fn can_safely_unlink(members: &MemberMap, a: &str, b: &str) -> bool {
        let Some((start, _)) = members.get_key_value(a) else {
            return false;
        };
        if !members.contains_key(b) {
            return false;
        }

        let direct = |from: &str, to: &str| (from == a && to == b) || (from == b && to == a);
        let visited = Self::reachable(members, start, |from, to| !direct(from, to));
        debug!("Without the {}-{} edge, {} is reachable: {}", a, b, b, visited.contains(b));
        visited.contains(b)
    }

    /// Shortest chain of relations leading from `from` to `to`.
    pub fn shortest_connection_path<'a>(
        members: &'a MemberMap,
        from: &str,
        to: &str,
    ) -> Result<ConnectionPath<'a>, PathError> {
        if members.len() < 2 {
            return Err(PathError::InsufficientMembers);
        }

        let start = members
            .get(from)
            .ok_or_else(|| PathError::UnknownMember(from.to_string()))?;
        let end = members
            .get(to)
            .ok_or_else(|| PathError::UnknownMember(to.to_string()))?;

        let mut predecessor: HashMap<&'a str, (&'a str, RelationKind)> = HashMap::new();
        let mut discovered: HashSet<&'a str> = HashSet::new();
        let mut frontier = UniqueQueue::new();

        discovered.insert(start.id.as_str());
        frontier.add(start.id.as_str());

        while let Some(current) = frontier.pull() {
            if current == end.id {
                let path = Self::rebuild_path(members, start, current, &predecessor);
                debug!("Found connection of length {} from {} to {}", path.len(), from, to);
                return Ok(path);
            }

            let Some(member) = members.get(current) else {
                continue;
            };

            for (kind, neighbor) in member.neighbors() {
                let neighbor = neighbor.as_str();
                if members.contains_key(neighbor) && discovered.insert(neighbor) {
                    predecessor.insert(neighbor, (current, kind));
                    frontier.add(neighbor);
                }
            }
        }

        Err(PathError::NotFound(from.to_string(), to.to_string()))
    }

    /// Connected components, each sorted by id, ordered by their smallest id.
    pub fn components(members: &MemberMap) -> Vec<Vec<MemberId>> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut components = Vec::new();

        for id in members.keys() {
            if seen.contains(id.as_str()) {
                continue;
            }

            let reached = Self::reachable(members, id, |_, _| true);
            let mut component: Vec<MemberId> = reached.iter().map(|id| id.to_string()).collect();
            component.sort();
            seen.extend(reached);
            components.push(component);
        }

        components
    }

    /// Members whose removal would split the tree (bridge members).
    pub fn unsafe_to_delete(members: &MemberMap) -> Vec<MemberId> {
        members
            .keys()
            .filter(|id| !Self::can_safely_delete(members, id))
            .cloned()
            .collect()
    }

    /// Ids reachable from `start`, following only the steps `allow` accepts.
    fn reachable<'a, F>(members: &'a MemberMap, start: &'a str, allow: F) -> HashSet<&'a str>
    where
        F: Fn(&str, &str) -> bool,
    {
        let mut visited = HashSet::new();
        let mut frontier = UniqueQueue::new();
        frontier.add(start);

        while let Some(current) = frontier.pull() {
            if !visited.insert(current) {
                continue;
            }

            let Some(member) = members.get(current) else {
                continue;
            };

            for (_, neighbor) in member.neighbors() {
                let neighbor = neighbor.as_str();
                if !allow(current, neighbor) || visited.contains(neighbor) {
                    continue;
                }
                if members.contains_key(neighbor) {
                    frontier.add(neighbor);
                }
            }
        }

        visited
    }

    fn rebuild_path<'a>(
        members: &'a MemberMap,
        start: &'a Member,
        end: &'a str,
        predecessor: &HashMap<&'a str, (&'a str, RelationKind)>,
    ) -> ConnectionPath<'a> {
        let mut steps = Vec::new();
        let mut cursor = end;

        while let Some(&(previous, relation)) = predecessor.get(cursor) {
            if let Some(member) = members.get(cursor) {
                steps.push(PathStep { relation, member });
            }
            cursor = previous;
        }

        steps.reverse();
        ConnectionPath { start, steps }
    }
}

/// One hop of a connection path: `member` is the `relation` of the member
/// before it.
#[derive(Debug, Clone, Serialize)]
pub struct PathStep<'a> {
    pub relation: RelationKind,
    pub member: &'a Member,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionPath<'a> {
    pub start: &'a Member,
    pub steps: Vec<PathStep<'a>>,
}

impl<'a> ConnectionPath<'a> {
    /// Number of edges in the path.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn end(&self) -> &'a Member {
        self.steps.last().map_or(self.start, |step| step.member)
    }

    /// Every member on the path, start included.
    pub fn members(&self) -> Vec<&'a Member> {
        std::iter::once(self.start)
            .chain(self.steps.iter().map(|step| step.member))
            .collect()
    }

    pub fn member_ids(&self) -> Vec<&'a str> {
        self.members().into_iter().map(|m| m.id.as_str()).collect()
    }

    /// Readable chain, e.g. "Avraham Levi -> son Yitzchak Levi -> wife Rivka Levi".
    pub fn describe(&self) -> String {
        let mut description = self.start.display_name();
        for step in &self.steps {
            description.push_str(&format!(
                " -> {} {}",
                step.relation.display_as_relation(step.member.gender),
                step.member.display_name()
            ));
        }
        description
    }
}
