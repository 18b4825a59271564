use crate::error::{InvariantViolation, PathError, Rejection, TreeError};
use crate::kinship::suggestions::SuggestionEngine;
use crate::kinship::traversal::{ConnectionPath, ConnectivityChecker};
use crate::kinship::validator::{ProposedEdge, RelationshipValidator, ValidatorOptions, Verdict};
use crate::queue::UniqueQueue;
use crate::relations::RelationKind;
use crate::types::{ChangeSet, Member, MemberId, MemberMap, MemberType, SuggestedConnection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Queue follow-up relationships after each commit.
    pub suggestions_enabled: bool,
    pub validation: ValidatorOptions,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            suggestions_enabled: true,
            validation: ValidatorOptions::default(),
        }
    }
}

/// The member collection plus everything needed to mutate it safely.
///
/// All mutations go through the validator (adds) or the connectivity
/// checker (removals). Touched ids are recorded so the caller can persist
/// only what changed; the tree itself never does I/O.
#[derive(Debug, Clone, Default)]
pub struct FamilyTree {
    members: MemberMap,
    options: TreeOptions,
    changes: ChangeSet,
    suggestions: UniqueQueue<SuggestedConnection>,
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Wrap an existing snapshot. Nothing is validated here; run
    /// [`FamilyTree::verify_invariants`] on data from an untrusted source.
    pub fn from_members(members: MemberMap, options: TreeOptions) -> Self {
        debug!("Loaded tree with {} members", members.len());
        Self {
            members,
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn members(&self) -> &MemberMap {
        &self.members
    }

    pub fn into_members(self) -> MemberMap {
        self.members
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Start an empty tree. Any relations the member carries are dropped.
    pub fn add_first_member(&mut self, mut member: Member) -> Result<MemberId, TreeError> {
        if !self.members.is_empty() {
            return Err(TreeError::TreeNotEmpty);
        }

        member.clear_links();
        let id = member.id.clone();
        info!("Starting tree with {}", member.display_name());

        self.changes.modified.insert(id.clone());
        self.members.insert(id.clone(), member);
        Ok(id)
    }

    /// Add a new member as the `kind` of `target`.
    ///
    /// A possible duplicate name fails with [`TreeError::DuplicateName`]
    /// unless `allow_duplicate_name` is set.
    pub fn add_related_member(
        &mut self,
        mut member: Member,
        target: &str,
        kind: RelationKind,
        allow_duplicate_name: bool,
    ) -> Result<MemberId, TreeError> {
        if self.members.contains_key(&member.id) {
            return Err(TreeError::DuplicateId(member.id));
        }
        member.clear_links();

        match self.propose_relationship(&member, target, kind) {
            Verdict::Reject(rejection) => {
                warn!("Rejected new member {}: {}", member.display_name(), rejection);
                return Err(rejection.into());
            }
            Verdict::Warn(warning) if !allow_duplicate_name => {
                return Err(TreeError::DuplicateName(warning));
            }
            _ => {}
        }

        let id = member.id.clone();
        self.members.insert(id.clone(), member);
        self.commit_relationship(&id, target, kind)?;
        Ok(id)
    }

    /// Validate "`source` is the `kind` of `target`" without changing anything.
    pub fn propose_relationship(
        &self,
        source: &Member,
        target: &str,
        kind: RelationKind,
    ) -> Verdict {
        RelationshipValidator::validate(
            &self.members,
            &ProposedEdge::new(source, target, kind),
            &self.options.validation,
        )
    }

    /// Store the edge on both endpoints. The caller is expected to have
    /// validated it first.
    pub fn commit_relationship(
        &mut self,
        source: &str,
        target: &str,
        kind: RelationKind,
    ) -> Result<(), TreeError> {
        if !self.members.contains_key(source) {
            return Err(TreeError::UnknownMember(source.to_string()));
        }
        let target_gender = self
            .members
            .get(target)
            .map(|member| member.gender)
            .ok_or_else(|| TreeError::UnknownMember(target.to_string()))?;
        if source == target {
            return Err(Rejection::SelfRelation(source.to_string()).into());
        }

        if let Some(member) = self.members.get_mut(target) {
            member.link(kind, source);
        }
        if let Some(member) = self.members.get_mut(source) {
            member.link(kind.inverse(target_gender), target);
        }
        self.changes.modified.insert(source.to_string());
        self.changes.modified.insert(target.to_string());
        info!("Committed {} as {} of {}", source, kind, target);

        if kind == RelationKind::Spouse {
            self.propagate_rabbi(source, target);
        }
        if self.options.suggestions_enabled {
            let suggestions = SuggestionEngine::after_commit(&self.members, source, target, kind);
            self.suggestions.extend(suggestions);
        }
        Ok(())
    }

    /// Validate and commit a relationship between two existing members.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        kind: RelationKind,
    ) -> Result<(), TreeError> {
        let member = self
            .members
            .get(source)
            .ok_or_else(|| TreeError::UnknownMember(source.to_string()))?;

        if let Verdict::Reject(rejection) = self.propose_relationship(member, target, kind) {
            warn!("Rejected {} as {} of {}: {}", source, kind, target, rejection);
            return Err(rejection.into());
        }
        self.commit_relationship(source, target, kind)
    }

    /// Drop every edge between `a` and `b`, unless that would split the tree.
    pub fn remove_relationship(
        &mut self,
        a: &str,
        b: &str,
    ) -> Result<Vec<RelationKind>, TreeError> {
        let first = self
            .members
            .get(a)
            .ok_or_else(|| TreeError::UnknownMember(a.to_string()))?;
        let second = self
            .members
            .get(b)
            .ok_or_else(|| TreeError::UnknownMember(b.to_string()))?;

        if !first.is_related_to(b) && !second.is_related_to(a) {
            return Err(TreeError::NotRelated(a.to_string(), b.to_string()));
        }
        if !ConnectivityChecker::can_safely_unlink(&self.members, a, b) {
            warn!("Refusing to unlink {} and {}: tree would split", a, b);
            return Err(TreeError::UnsafeUnlink(a.to_string(), b.to_string()));
        }

        let removed = self
            .members
            .get_mut(a)
            .map(|member| member.unlink(b))
            .unwrap_or_default();
        if let Some(member) = self.members.get_mut(b) {
            member.unlink(a);
        }
        self.changes.modified.insert(a.to_string());
        self.changes.modified.insert(b.to_string());

        info!("Removed relation {:?} between {} and {}", removed, a, b);
        Ok(removed)
    }

    /// Remove a member and the mirrors of its edges. The returned member
    /// no longer carries any relations.
    pub fn remove_member(&mut self, id: &str) -> Result<Member, TreeError> {
        if !self.members.contains_key(id) {
            return Err(TreeError::UnknownMember(id.to_string()));
        }
        if !ConnectivityChecker::can_safely_delete(&self.members, id) {
            warn!("Refusing to delete {}: tree would split", id);
            return Err(TreeError::UnsafeDelete(id.to_string()));
        }

        let Some(mut member) = self.members.remove(id) else {
            return Err(TreeError::UnknownMember(id.to_string()));
        };
        let neighbors: Vec<MemberId> = member.neighbors().map(|(_, other)| other.clone()).collect();
        for other in neighbors {
            if let Some(relative) = self.members.get_mut(&other) {
                relative.unlink(id);
                self.changes.modified.insert(other);
            }
        }
        member.clear_links();

        self.changes.modified.remove(id);
        self.changes.deleted.insert(id.to_string());
        info!("Deleted member {} ({})", member.display_name(), id);
        Ok(member)
    }

    pub fn can_remove_member(&self, id: &str) -> bool {
        self.members.contains_key(id) && ConnectivityChecker::can_safely_delete(&self.members, id)
    }

    pub fn find_shortest_connection(
        &self,
        a: &str,
        b: &str,
    ) -> Result<ConnectionPath<'_>, PathError> {
        ConnectivityChecker::shortest_connection_path(&self.members, a, b)
    }

    pub fn is_tree_connected(&self) -> bool {
        ConnectivityChecker::is_connected(&self.members)
    }

    pub fn components(&self) -> Vec<Vec<MemberId>> {
        ConnectivityChecker::components(&self.members)
    }

    /// Members that cannot be deleted without splitting the tree.
    pub fn bridge_members(&self) -> Vec<MemberId> {
        ConnectivityChecker::unsafe_to_delete(&self.members)
    }

    /// Every structural rule the collection currently breaks.
    pub fn verify_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for (key, member) in &self.members {
            if key != &member.id {
                violations.push(InvariantViolation::KeyMismatch {
                    key: key.clone(),
                    id: member.id.clone(),
                });
            }

            for (&kind, ids) in member.connections() {
                if kind.max_cardinality().is_some_and(|max| ids.len() > max) {
                    violations.push(InvariantViolation::CardinalityExceeded {
                        member: member.id.clone(),
                        relation: kind,
                        count: ids.len(),
                    });
                }

                for relative_id in ids {
                    if relative_id == &member.id {
                        violations.push(InvariantViolation::SelfReference {
                            member: member.id.clone(),
                        });
                        continue;
                    }
                    let Some(relative) = self.members.get(relative_id) else {
                        violations.push(InvariantViolation::DanglingReference {
                            member: member.id.clone(),
                            relative: relative_id.clone(),
                        });
                        continue;
                    };

                    if kind.required_gender().is_some_and(|gender| gender != relative.gender) {
                        violations.push(InvariantViolation::GenderMismatch {
                            member: member.id.clone(),
                            relative: relative_id.clone(),
                            relation: kind,
                        });
                    }

                    let mirror = kind.inverse(member.gender);
                    if !relative.related(mirror).any(|id| id == &member.id) {
                        violations.push(InvariantViolation::MissingMirror {
                            member: member.id.clone(),
                            relative: relative_id.clone(),
                            relation: kind,
                        });
                    }
                }
            }
        }

        let components = ConnectivityChecker::components(&self.members).len();
        if components > 1 {
            violations.push(InvariantViolation::Disconnected { components });
        }

        debug!("Found {} invariant violations", violations.len());
        violations
    }

    /// Members whose full name contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<&Member> {
        let needle = term.trim().to_lowercase();
        self.members
            .values()
            .filter(|member| member.full_name().to_lowercase().contains(&needle))
            .collect()
    }

    /// Yeshiva members grouped by cohort, then by name.
    pub fn yeshiva_members(&self) -> Vec<&Member> {
        let mut members: Vec<&Member> = self
            .members
            .values()
            .filter(|member| member.member_type == MemberType::Yeshiva)
            .collect();
        members.sort_by(|a, b| {
            a.machzor
                .cmp(&b.machzor)
                .then_with(|| a.full_name().cmp(&b.full_name()))
        });
        members
    }

    /// Kinds a new relative could still take with respect to `id`.
    pub fn available_relations(&self, id: &str) -> Result<Vec<RelationKind>, TreeError> {
        let member = self
            .members
            .get(id)
            .ok_or_else(|| TreeError::UnknownMember(id.to_string()))?;

        Ok(RelationKind::ALL
            .into_iter()
            .filter(|kind| !member.is_slot_full(*kind))
            .collect())
    }

    /// What `b` is to `a`, if they are directly related.
    pub fn relation_between(&self, a: &str, b: &str) -> Option<RelationKind> {
        self.members.get(a)?.relation_to(b)
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Hand the accumulated changes to the caller and start a fresh set.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    /// Put back changes the caller failed to persist.
    pub fn restore_changes(&mut self, changes: ChangeSet) {
        self.changes.modified.extend(changes.modified);
        self.changes.deleted.extend(changes.deleted);
    }

    /// Next suggestion that still applies. Suggestions whose members were
    /// removed or have since been related are dropped.
    pub fn next_suggestion(&mut self) -> Option<SuggestedConnection> {
        while let Some(suggestion) = self.suggestions.pull() {
            if is_current(&self.members, &suggestion) {
                return Some(suggestion);
            }
            debug!("Dropping stale suggestion {:?}", suggestion);
        }
        None
    }

    pub fn peek_suggestion(&mut self) -> Option<&SuggestedConnection> {
        while let Some(head) = self.suggestions.peek() {
            if is_current(&self.members, head) {
                break;
            }
            self.suggestions.pull();
        }
        self.suggestions.peek()
    }

    pub fn has_suggestions(&mut self) -> bool {
        self.peek_suggestion().is_some()
    }

    pub fn pending_suggestions(&self) -> impl Iterator<Item = &SuggestedConnection> {
        self.suggestions.iter()
    }

    /// Validate and commit a suggestion.
    pub fn accept_suggestion(&mut self, suggestion: &SuggestedConnection) -> Result<(), TreeError> {
        self.connect(&suggestion.source, &suggestion.target, suggestion.kind)
    }

    /// The alternative to offer once the user turns `suggestion` down.
    pub fn decline_suggestion(
        &self,
        suggestion: &SuggestedConnection,
    ) -> Option<SuggestedConnection> {
        let alternative = suggestion.alternative?;
        Some(SuggestedConnection::new(&suggestion.source, &suggestion.target, alternative))
    }

    /// A rabbi's spouse carries the title as well.
    fn propagate_rabbi(&mut self, a: &str, b: &str) {
        let any_rabbi = [a, b]
            .iter()
            .any(|id| self.members.get(*id).is_some_and(|member| member.is_rabbi));
        if !any_rabbi {
            return;
        }

        for id in [a, b] {
            if let Some(member) = self.members.get_mut(id) {
                if !member.is_rabbi {
                    member.is_rabbi = true;
                    self.changes.modified.insert(id.to_string());
                    debug!("{} now carries the rabbinical title", id);
                }
            }
        }
    }
}

fn is_current(members: &MemberMap, suggestion: &SuggestedConnection) -> bool {
    match (members.get(&suggestion.source), members.get(&suggestion.target)) {
        (Some(source), Some(_)) => !source.is_related_to(&suggestion.target),
        _ => false,
    }
}
