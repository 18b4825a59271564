use crate::error::{Rejection, Warning};
use crate::relations::RelationKind;
use crate::types::{Member, MemberMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A relationship awaiting validation: `source` is the `kind` of `target`.
///
/// The source may be a freshly created member that is not in the collection
/// yet; the target must already be in it.
#[derive(Debug, Clone, Copy)]
pub struct ProposedEdge<'a> {
    pub source: &'a Member,
    pub target: &'a str,
    pub kind: RelationKind,
}

impl<'a> ProposedEdge<'a> {
    pub fn new(source: &'a Member, target: &'a str, kind: RelationKind) -> Self {
        Self { source, target, kind }
    }
}

/// Outcome of validating a proposed relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    /// Acceptable, but the caller should confirm before committing.
    Warn(Warning),
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Reject(rejection) => Some(rejection),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&Warning> {
        match self {
            Verdict::Warn(warning) => Some(warning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Warn when a new member shares an existing member's full name.
    pub check_duplicate_names: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            check_duplicate_names: true,
        }
    }
}

/// Pure relationship rules. Nothing here mutates the collection.
pub struct RelationshipValidator;

impl RelationshipValidator {
    /// Run every check in order; the first failure decides the verdict.
    pub fn validate(
        members: &MemberMap,
        edge: &ProposedEdge<'_>,
        options: &ValidatorOptions,
    ) -> Verdict {
        let verdict = match Self::check(members, edge) {
            Err(rejection) => Verdict::Reject(rejection),
            Ok(()) if options.check_duplicate_names => {
                match Self::check_duplicate_name(members, edge.source) {
                    Some(warning) => Verdict::Warn(warning),
                    None => Verdict::Accept,
                }
            }
            Ok(()) => Verdict::Accept,
        };

        debug!(
            "Validated {} as {} of {}: {:?}",
            edge.source.id, edge.kind, edge.target, verdict
        );
        verdict
    }

    fn check(members: &MemberMap, edge: &ProposedEdge<'_>) -> Result<(), Rejection> {
        Self::check_gender(edge)?;

        let target = members
            .get(edge.target)
            .ok_or_else(|| Rejection::UnknownMember(edge.target.to_string()))?;
        if edge.source.id == target.id {
            return Err(Rejection::SelfRelation(target.id.clone()));
        }

        // Prefer the stored copy of an existing source over the caller's.
        let source = members.get(&edge.source.id).unwrap_or(edge.source);

        Self::check_cardinality(source, target, edge.kind)?;
        Self::check_spouse_genders(source, target, edge.kind)?;
        Self::check_not_related(source, target)?;
        Ok(())
    }

    pub fn check_gender(edge: &ProposedEdge<'_>) -> Result<(), Rejection> {
        match edge.kind.required_gender() {
            Some(required) if edge.source.gender != required => Err(Rejection::GenderMismatch {
                relation: edge.kind,
                member: edge.source.id.clone(),
                relative: edge.target.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// The target's slot for `kind` and the source's mirrored slot must both
    /// have room.
    pub fn check_cardinality(
        source: &Member,
        target: &Member,
        kind: RelationKind,
    ) -> Result<(), Rejection> {
        if target.is_slot_full(kind) {
            return Err(Rejection::CardinalityExceeded {
                relation: kind,
                holder: target.id.clone(),
            });
        }

        let mirror = kind.inverse(target.gender);
        if source.is_slot_full(mirror) {
            return Err(Rejection::CardinalityExceeded {
                relation: mirror,
                holder: source.id.clone(),
            });
        }

        Ok(())
    }

    pub fn check_spouse_genders(
        source: &Member,
        target: &Member,
        kind: RelationKind,
    ) -> Result<(), Rejection> {
        if kind == RelationKind::Spouse && source.gender == target.gender {
            return Err(Rejection::SameSexMarriage {
                first: source.id.clone(),
                second: target.id.clone(),
            });
        }
        Ok(())
    }

    pub fn check_not_related(source: &Member, target: &Member) -> Result<(), Rejection> {
        let existing = target
            .relation_to(&source.id)
            .or_else(|| source.relation_to(&target.id).map(|kind| kind.inverse(source.gender)));

        match existing {
            Some(existing) => Err(Rejection::AlreadyRelated {
                member: source.id.clone(),
                relative: target.id.clone(),
                existing,
            }),
            None => Ok(()),
        }
    }

    /// Only members not yet in the collection are checked.
    pub fn check_duplicate_name(members: &MemberMap, candidate: &Member) -> Option<Warning> {
        if members.contains_key(&candidate.id) {
            return None;
        }

        let name = candidate.full_name();
        members
            .values()
            .find(|member| member.full_name() == name)
            .map(|existing| Warning::PossibleDuplicate {
                existing: existing.id.clone(),
                name,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    fn members(list: Vec<Member>) -> MemberMap {
        list.into_iter().map(|m| (m.id.clone(), m)).collect()
    }

    fn linked(mut map: MemberMap, source: &str, target: &str, kind: RelationKind) -> MemberMap {
        let target_gender = map[target].gender;
        map.get_mut(target).unwrap().link(kind, source);
        map.get_mut(source).unwrap().link(kind.inverse(target_gender), target);
        map
    }

    fn family() -> MemberMap {
        members(vec![
            Member::with_id("dad", "Yaakov", "Levi", Gender::Male),
            Member::with_id("mom", "Leah", "Levi", Gender::Female),
            Member::with_id("kid", "Yosef", "Levi", Gender::Male),
        ])
    }

    fn validate(map: &MemberMap, source: &Member, target: &str, kind: RelationKind) -> Verdict {
        RelationshipValidator::validate(
            map,
            &ProposedEdge::new(source, target, kind),
            &ValidatorOptions::default(),
        )
    }

    #[test]
    fn test_female_father_rejected_regardless_of_target() {
        let map = family();
        let mom = map["mom"].clone();

        for target in ["dad", "kid", "mom", "nobody"] {
            let verdict = validate(&map, &mom, target, RelationKind::Father);
            assert!(
                matches!(verdict, Verdict::Reject(Rejection::GenderMismatch { .. })),
                "target {target}: {verdict:?}"
            );
        }
    }

    #[test]
    fn test_second_father_rejected_but_second_son_accepted() {
        let map = linked(family(), "dad", "kid", RelationKind::Father);
        let uncle = Member::with_id("uncle", "Esav", "Levi", Gender::Male);
        let mut with_uncle = map.clone();
        with_uncle.insert(uncle.id.clone(), uncle.clone());

        let verdict = validate(&with_uncle, &uncle, "kid", RelationKind::Father);
        assert_eq!(
            verdict,
            Verdict::Reject(Rejection::CardinalityExceeded {
                relation: RelationKind::Father,
                holder: "kid".to_string(),
            })
        );

        let second_son = Member::with_id("kid2", "Binyamin", "Levi", Gender::Male);
        assert_eq!(validate(&map, &second_son, "dad", RelationKind::Son), Verdict::Accept);
    }

    #[test]
    fn test_mirror_slot_is_checked() {
        // kid already has a father; proposing kid as son of another man fails on kid's side
        let mut map = linked(family(), "dad", "kid", RelationKind::Father);
        map.insert(
            "other".to_string(),
            Member::with_id("other", "Lavan", "Aram", Gender::Male),
        );
        let kid = map["kid"].clone();

        assert_eq!(
            validate(&map, &kid, "other", RelationKind::Son),
            Verdict::Reject(Rejection::CardinalityExceeded {
                relation: RelationKind::Father,
                holder: "kid".to_string(),
            })
        );
    }

    #[test]
    fn test_spouse_rules() {
        let map = family();
        let dad = map["dad"].clone();
        let kid = map["kid"].clone();

        assert!(matches!(
            validate(&map, &kid, "dad", RelationKind::Spouse),
            Verdict::Reject(Rejection::SameSexMarriage { .. })
        ));
        assert_eq!(validate(&map, &dad, "mom", RelationKind::Spouse), Verdict::Accept);

        let married = linked(map, "dad", "mom", RelationKind::Spouse);
        let second = Member::with_id("bilha", "Bilha", "", Gender::Female);
        assert!(matches!(
            validate(&married, &second, "dad", RelationKind::Spouse),
            Verdict::Reject(Rejection::CardinalityExceeded {
                relation: RelationKind::Spouse,
                ..
            })
        ));
    }

    #[test]
    fn test_already_related_rejected() {
        let map = linked(family(), "dad", "kid", RelationKind::Father);
        let kid = map["kid"].clone();

        let verdict = validate(&map, &kid, "dad", RelationKind::Sibling);
        assert_eq!(
            verdict,
            Verdict::Reject(Rejection::AlreadyRelated {
                member: "kid".to_string(),
                relative: "dad".to_string(),
                existing: RelationKind::Son,
            })
        );
    }

    #[test]
    fn test_structural_rejections() {
        let map = family();
        let dad = map["dad"].clone();

        assert_eq!(
            validate(&map, &dad, "dad", RelationKind::Sibling),
            Verdict::Reject(Rejection::SelfRelation("dad".to_string()))
        );
        assert_eq!(
            validate(&map, &dad, "ghost", RelationKind::Sibling),
            Verdict::Reject(Rejection::UnknownMember("ghost".to_string()))
        );
    }

    #[test]
    fn test_duplicate_name_is_a_warning() {
        let map = family();
        let twin = Member::with_id("new", "Yosef", "Levi", Gender::Male);

        let verdict = validate(&map, &twin, "mom", RelationKind::Son);
        assert_eq!(
            verdict.warning(),
            Some(&Warning::PossibleDuplicate {
                existing: "kid".to_string(),
                name: "Yosef Levi".to_string(),
            })
        );

        let relaxed = RelationshipValidator::validate(
            &map,
            &ProposedEdge::new(&twin, "mom", RelationKind::Son),
            &ValidatorOptions { check_duplicate_names: false },
        );
        assert!(relaxed.is_accept());
    }

    #[test]
    fn test_validation_is_pure() {
        let map = family();
        let before = map.clone();
        let dad = map["dad"].clone();

        let first = validate(&map, &dad, "kid", RelationKind::Father);
        let second = validate(&map, &dad, "kid", RelationKind::Father);

        assert_eq!(first, second);
        assert_eq!(map, before);
    }
}
