use crate::error::InvariantViolation;
use crate::relations::RelationKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Core types for the family tree graph

pub type MemberId = String;

/// Caller-owned member collection, indexed by id.
pub type MemberMap = BTreeMap<MemberId, Member>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberType {
    Yeshiva,
    NonYeshiva,
}

impl Default for MemberType {
    fn default() -> Self {
        MemberType::NonYeshiva
    }
}

/// One person in the family tree.
///
/// `connections[kind]` holds the ids of the members who are the `kind` of
/// this member, so a child's `Father` entry names its father. Members refer
/// to each other only by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub member_type: MemberType,
    /// Yeshiva cohort number, used only for display grouping.
    #[serde(default)]
    pub machzor: Option<u32>,
    #[serde(default)]
    pub is_rabbi: bool,
    #[serde(default)]
    pub is_yeshiva_rabbi: bool,
    #[serde(default)]
    pub born: Option<NaiveDate>,
    #[serde(default)]
    pub died: Option<NaiveDate>,
    #[serde(default)]
    connections: BTreeMap<RelationKind, BTreeSet<MemberId>>,
}

impl Member {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        gender: Gender,
    ) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), first_name, last_name, gender)
    }

    pub fn with_id(
        id: impl Into<MemberId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        gender: Gender,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            gender,
            member_type: MemberType::NonYeshiva,
            machzor: None,
            is_rabbi: false,
            is_yeshiva_rabbi: false,
            born: None,
            died: None,
            connections: BTreeMap::new(),
        }
    }

    pub fn yeshiva(mut self, machzor: Option<u32>) -> Self {
        self.member_type = MemberType::Yeshiva;
        self.machzor = machzor;
        self
    }

    pub fn rabbi(mut self, yeshiva_rabbi: bool) -> Self {
        self.is_rabbi = true;
        self.is_yeshiva_rabbi = yeshiva_rabbi;
        self
    }

    pub fn lifespan(mut self, born: Option<NaiveDate>, died: Option<NaiveDate>) -> Self {
        self.born = born;
        self.died = died;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Full name with the rabbinical title, if any.
    pub fn display_name(&self) -> String {
        let prefix = match (self.is_rabbi, self.gender) {
            (true, Gender::Male) => "Rabbi ",
            (true, Gender::Female) => "Rebbetzin ",
            (false, _) => "",
        };
        format!("{}{}", prefix, self.full_name())
    }

    pub fn connections(&self) -> &BTreeMap<RelationKind, BTreeSet<MemberId>> {
        &self.connections
    }

    /// Ids of the members who are the `kind` of this member, ascending.
    pub fn related(&self, kind: RelationKind) -> impl Iterator<Item = &MemberId> + '_ {
        self.connections.get(&kind).into_iter().flatten()
    }

    pub fn related_count(&self, kind: RelationKind) -> usize {
        self.connections.get(&kind).map_or(0, BTreeSet::len)
    }

    pub fn is_slot_full(&self, kind: RelationKind) -> bool {
        kind.max_cardinality().is_some_and(|max| self.related_count(kind) >= max)
    }

    /// How `other` is related to this member, if at all.
    pub fn relation_to(&self, other: &str) -> Option<RelationKind> {
        self.connections
            .iter()
            .find(|(_, ids)| ids.contains(other))
            .map(|(kind, _)| *kind)
    }

    pub fn is_related_to(&self, other: &str) -> bool {
        self.relation_to(other).is_some()
    }

    /// Every (kind, neighbor) pair, by kind order then ascending id.
    pub fn neighbors(&self) -> impl Iterator<Item = (RelationKind, &MemberId)> + '_ {
        self.connections
            .iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (*kind, id)))
    }

    pub fn degree(&self) -> usize {
        self.connections.values().map(BTreeSet::len).sum()
    }

    pub(crate) fn link(&mut self, kind: RelationKind, other: &str) -> bool {
        self.connections
            .entry(kind)
            .or_default()
            .insert(other.to_string())
    }

    pub(crate) fn clear_links(&mut self) {
        self.connections.clear();
    }

    /// Drop every edge to `other`, returning the kinds that were removed.
    pub(crate) fn unlink(&mut self, other: &str) -> Vec<RelationKind> {
        let mut removed = Vec::new();
        for (kind, ids) in self.connections.iter_mut() {
            if ids.remove(other) {
                removed.push(*kind);
            }
        }
        self.connections.retain(|_, ids| !ids.is_empty());
        removed
    }
}

/// A relationship the tree proposes after a commit. `source` is the `kind`
/// of `target`; nothing is applied until the caller validates and commits it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestedConnection {
    pub source: MemberId,
    pub target: MemberId,
    pub kind: RelationKind,
    /// Kind to offer instead if the user rejects `kind`.
    pub alternative: Option<RelationKind>,
}

impl SuggestedConnection {
    pub fn new(source: &str, target: &str, kind: RelationKind) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            alternative: None,
        }
    }

    pub fn with_alternative(mut self, alternative: RelationKind) -> Self {
        self.alternative = Some(alternative);
        self
    }
}

/// Ids touched since the last save, drained by the caller before persisting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub modified: BTreeSet<MemberId>,
    pub deleted: BTreeSet<MemberId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Health summary of a family tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeReport {
    pub member_count: usize,
    /// Each relationship counted once, not once per endpoint.
    pub relationship_count: usize,
    /// Stored entries per kind, e.g. `Father` counts members with a known father.
    pub relation_counts: BTreeMap<RelationKind, usize>,
    pub yeshiva_count: usize,
    pub rabbi_count: usize,
    pub connected: bool,
    pub components: Vec<Vec<MemberId>>,
    pub bridge_members: Vec<MemberId>,
    pub violations: Vec<InvariantViolation>,
    pub generated_at: DateTime<Utc>,
}

impl TreeReport {
    pub fn is_healthy(&self) -> bool {
        self.connected && self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_members_get_unique_ids() {
        let a = Member::new("Avraham", "Levi", Gender::Male);
        let b = Member::new("Avraham", "Levi", Gender::Male);
        assert_ne!(a.id, b.id);
        assert_eq!(a.full_name(), b.full_name());
    }

    #[test]
    fn test_display_name_titles() {
        let rabbi = Member::with_id("1", "Moshe", "Cohen", Gender::Male).rabbi(true);
        let mut wife = Member::with_id("2", "Rivka", "Cohen", Gender::Female);
        assert_eq!(rabbi.display_name(), "Rabbi Moshe Cohen");
        assert_eq!(wife.display_name(), "Rivka Cohen");

        wife.is_rabbi = true;
        assert_eq!(wife.display_name(), "Rebbetzin Rivka Cohen");
    }

    #[test]
    fn test_link_and_unlink() {
        let mut member = Member::with_id("c", "Dina", "Katz", Gender::Female);
        assert!(member.link(RelationKind::Father, "f"));
        assert!(!member.link(RelationKind::Father, "f"));
        member.link(RelationKind::Sibling, "s");

        assert_eq!(member.relation_to("f"), Some(RelationKind::Father));
        assert!(member.is_slot_full(RelationKind::Father));
        assert!(!member.is_slot_full(RelationKind::Sibling));
        assert_eq!(member.degree(), 2);

        assert_eq!(member.unlink("f"), vec![RelationKind::Father]);
        assert!(member.connections().get(&RelationKind::Father).is_none());
        assert_eq!(member.degree(), 1);
    }

    #[test]
    fn test_member_serialization() {
        let mut member = Member::with_id("m1", "Sara", "Stern", Gender::Female).yeshiva(Some(12));
        member.link(RelationKind::Son, "m2");

        let json = serde_json::to_string(&member).unwrap();
        let back: Member = serde_json::from_str(&json).unwrap();
        assert_eq!(back, member);
        assert_eq!(back.machzor, Some(12));
    }
}
