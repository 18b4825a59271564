use crate::relations::RelationKind;
use crate::types::{Member, MemberId, MemberMap, SuggestedConnection};
use tracing::debug;

/// Derives follow-up relationships after an edge has been committed.
///
/// The engine only proposes. Every suggestion still has to pass the
/// validator before the tree commits it.
pub struct SuggestionEngine;

impl SuggestionEngine {
    /// Suggestions implied by `source` having just become the `kind` of
    /// `target`. Both endpoints must already carry the new edge.
    pub fn after_commit(
        members: &MemberMap,
        source: &str,
        target: &str,
        kind: RelationKind,
    ) -> Vec<SuggestedConnection> {
        let (Some(source), Some(target)) = (members.get(source), members.get(target)) else {
            return Vec::new();
        };

        let mut suggestions = Vec::new();
        if kind.is_symmetric() {
            Self::symmetric(members, kind, source, target, &mut suggestions);
            Self::symmetric(members, kind, target, source, &mut suggestions);
        } else if kind.is_parent() {
            Self::parent(members, source, target, &mut suggestions);
        } else if kind.is_child() {
            Self::parent(members, target, source, &mut suggestions);
        } else if kind.is_grandparent() {
            Self::grandparent(members, source, target, &mut suggestions);
        } else if kind.is_grandchild() {
            Self::grandparent(members, target, source, &mut suggestions);
        }

        debug!(
            "{} suggestions after {} became {} of {}",
            suggestions.len(),
            source.id,
            kind,
            target.id
        );
        suggestions
    }

    fn symmetric(
        members: &MemberMap,
        kind: RelationKind,
        member: &Member,
        other: &Member,
        out: &mut Vec<SuggestedConnection>,
    ) {
        match kind {
            RelationKind::Spouse => Self::spouse(members, member, other, out),
            RelationKind::Sibling => Self::sibling(members, member, other, out),
            RelationKind::Cousin => Self::cousin(members, member, other, out),
            _ => {}
        }
    }

    /// `partner` is probably a parent of `member`'s children and a
    /// grandparent of their grandchildren.
    fn spouse(
        members: &MemberMap,
        member: &Member,
        partner: &Member,
        out: &mut Vec<SuggestedConnection>,
    ) {
        for child in children(member) {
            push(
                members,
                out,
                partner,
                child,
                RelationKind::parent_for(partner.gender),
            );
        }
        for grandchild in grandchildren(member) {
            push(
                members,
                out,
                partner,
                grandchild,
                RelationKind::grandparent_for(partner.gender),
            );
        }
    }

    fn parent(
        members: &MemberMap,
        parent: &Member,
        child: &Member,
        out: &mut Vec<SuggestedConnection>,
    ) {
        for sibling in children(parent).filter(|id| *id != &child.id) {
            if let Some(sibling) = members.get(sibling) {
                push(members, out, sibling, &child.id, RelationKind::Sibling);
            }
        }
        for spouse in parent.related(RelationKind::Spouse) {
            if let Some(spouse) = members.get(spouse) {
                push(
                    members,
                    out,
                    spouse,
                    &child.id,
                    RelationKind::parent_for(spouse.gender),
                );
            }
        }
        for grandparent in parents(parent) {
            if let Some(grandparent) = members.get(grandparent) {
                push(
                    members,
                    out,
                    grandparent,
                    &child.id,
                    RelationKind::grandparent_for(grandparent.gender),
                );
            }
        }

        // The child's other parent, when neither of the two is married yet.
        if let Some(other) = parents(child)
            .filter(|id| *id != &parent.id)
            .find_map(|id| members.get(id))
        {
            if other.gender != parent.gender && is_unmarried(parent) && is_unmarried(other) {
                push(members, out, other, &parent.id, RelationKind::Spouse);
            }
        }

        // The parent's grandchildren may be the child's own children.
        for grandchild in grandchildren(parent) {
            push(
                members,
                out,
                child,
                grandchild,
                RelationKind::parent_for(child.gender),
            );
        }

        // Children of the parent's siblings are the child's cousins.
        for uncle in parent.related(RelationKind::Sibling) {
            let Some(uncle) = members.get(uncle) else {
                continue;
            };
            for cousin in children(uncle) {
                if let Some(cousin) = members.get(cousin) {
                    push(members, out, cousin, &child.id, RelationKind::Cousin);
                }
            }
        }
    }

    fn grandparent(
        members: &MemberMap,
        grandparent: &Member,
        grandchild: &Member,
        out: &mut Vec<SuggestedConnection>,
    ) {
        // Other grandchildren are cousins unless the user says they are siblings.
        for other in grandchildren(grandparent).filter(|id| *id != &grandchild.id) {
            push_cousin(members, out, other, grandchild);
        }

        let parent_kind = RelationKind::parent_for(grandparent.gender);
        for parent in parents(grandchild) {
            push(members, out, grandparent, parent, parent_kind);
        }

        let grandparent_kind = RelationKind::grandparent_for(grandparent.gender);
        for cousin in grandchild.related(RelationKind::Cousin) {
            push(members, out, grandparent, cousin, grandparent_kind);
        }

        if let Some(other) = grandparents(grandchild)
            .filter(|id| *id != &grandparent.id)
            .filter_map(|id| members.get(id))
            .find(|other| other.gender != grandparent.gender && is_unmarried(other))
        {
            if is_unmarried(grandparent) {
                push(members, out, other, &grandparent.id, RelationKind::Spouse);
            }
        }
    }

    fn sibling(
        members: &MemberMap,
        member: &Member,
        sibling: &Member,
        out: &mut Vec<SuggestedConnection>,
    ) {
        for parent in parents(member) {
            if let Some(parent) = members.get(parent) {
                push(
                    members,
                    out,
                    parent,
                    &sibling.id,
                    RelationKind::parent_for(parent.gender),
                );
            }
        }
    }

    fn cousin(
        members: &MemberMap,
        member: &Member,
        cousin: &Member,
        out: &mut Vec<SuggestedConnection>,
    ) {
        for grandparent in grandparents(member) {
            if let Some(grandparent) = members.get(grandparent) {
                push(
                    members,
                    out,
                    grandparent,
                    &cousin.id,
                    RelationKind::grandparent_for(grandparent.gender),
                );
            }
        }
        for other in member.related(RelationKind::Cousin).filter(|id| *id != &cousin.id) {
            push_cousin(members, out, other, cousin);
        }
    }
}

fn related_where(
    member: &Member,
    predicate: fn(RelationKind) -> bool,
) -> impl Iterator<Item = &MemberId> + '_ {
    member
        .neighbors()
        .filter(move |(kind, _)| predicate(*kind))
        .map(|(_, id)| id)
}

fn children(member: &Member) -> impl Iterator<Item = &MemberId> + '_ {
    related_where(member, RelationKind::is_child)
}

fn parents(member: &Member) -> impl Iterator<Item = &MemberId> + '_ {
    related_where(member, RelationKind::is_parent)
}

fn grandchildren(member: &Member) -> impl Iterator<Item = &MemberId> + '_ {
    related_where(member, RelationKind::is_grandchild)
}

fn grandparents(member: &Member) -> impl Iterator<Item = &MemberId> + '_ {
    related_where(member, RelationKind::is_grandparent)
}

fn is_unmarried(member: &Member) -> bool {
    member.related_count(RelationKind::Spouse) == 0
}

/// A candidate is worth suggesting only if both ends exist, differ and are
/// not related yet.
fn is_candidate(members: &MemberMap, candidate: &str, target: &Member) -> bool {
    candidate != target.id && members.contains_key(candidate) && !target.is_related_to(candidate)
}

fn push(
    members: &MemberMap,
    out: &mut Vec<SuggestedConnection>,
    candidate: &Member,
    target: &str,
    kind: RelationKind,
) {
    let Some(target) = members.get(target) else {
        return;
    };
    if is_candidate(members, &candidate.id, target) {
        out.push(SuggestedConnection::new(&candidate.id, &target.id, kind));
    }
}

fn push_cousin(
    members: &MemberMap,
    out: &mut Vec<SuggestedConnection>,
    candidate: &str,
    target: &Member,
) {
    if is_candidate(members, candidate, target) {
        out.push(
            SuggestedConnection::new(candidate, &target.id, RelationKind::Cousin)
                .with_alternative(RelationKind::Sibling),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    fn link(map: &mut MemberMap, source: &str, target: &str, kind: RelationKind) {
        let target_gender = map[target].gender;
        map.get_mut(target).unwrap().link(kind, source);
        map.get_mut(source).unwrap().link(kind.inverse(target_gender), target);
    }

    fn suggest(
        map: &MemberMap,
        source: &str,
        target: &str,
        kind: RelationKind,
    ) -> Vec<SuggestedConnection> {
        SuggestionEngine::after_commit(map, source, target, kind)
    }

    fn family() -> MemberMap {
        [
            Member::with_id("dad", "Yaakov", "Levi", Gender::Male),
            Member::with_id("mom", "Leah", "Levi", Gender::Female),
            Member::with_id("reuven", "Reuven", "Levi", Gender::Male),
            Member::with_id("dina", "Dina", "Levi", Gender::Female),
            Member::with_id("saba", "Yitzchak", "Levi", Gender::Male),
        ]
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect()
    }

    #[test]
    fn test_new_spouse_is_suggested_as_parent() {
        let mut map = family();
        link(&mut map, "dad", "reuven", RelationKind::Father);
        link(&mut map, "dad", "dina", RelationKind::Father);
        link(&mut map, "mom", "dad", RelationKind::Spouse);

        let suggestions = suggest(&map, "mom", "dad", RelationKind::Spouse);
        assert_eq!(
            suggestions,
            vec![
                SuggestedConnection::new("mom", "reuven", RelationKind::Mother),
                SuggestedConnection::new("mom", "dina", RelationKind::Mother),
            ]
        );
    }

    #[test]
    fn test_new_child_gets_siblings_and_grandparents() {
        let mut map = family();
        link(&mut map, "saba", "dad", RelationKind::Father);
        link(&mut map, "mom", "dad", RelationKind::Spouse);
        link(&mut map, "dad", "reuven", RelationKind::Father);
        link(&mut map, "dina", "dad", RelationKind::Daughter);

        let suggestions = suggest(&map, "dina", "dad", RelationKind::Daughter);
        assert_eq!(
            suggestions,
            vec![
                SuggestedConnection::new("reuven", "dina", RelationKind::Sibling),
                SuggestedConnection::new("mom", "dina", RelationKind::Mother),
                SuggestedConnection::new("saba", "dina", RelationKind::Grandfather),
            ]
        );
    }

    #[test]
    fn test_related_candidates_are_skipped() {
        let mut map = family();
        link(&mut map, "dad", "reuven", RelationKind::Father);
        link(&mut map, "mom", "reuven", RelationKind::Mother);
        link(&mut map, "mom", "dad", RelationKind::Spouse);

        let suggestions = suggest(&map, "mom", "dad", RelationKind::Spouse);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_other_grandchildren_are_cousins_with_sibling_alternative() {
        let mut map = family();
        link(&mut map, "saba", "reuven", RelationKind::Grandfather);
        link(&mut map, "saba", "dina", RelationKind::Grandfather);

        let suggestions = suggest(&map, "saba", "dina", RelationKind::Grandfather);
        assert_eq!(
            suggestions,
            vec![SuggestedConnection::new("reuven", "dina", RelationKind::Cousin)
                .with_alternative(RelationKind::Sibling)]
        );
    }

    #[test]
    fn test_sibling_shares_parents() {
        let mut map = family();
        link(&mut map, "dad", "reuven", RelationKind::Father);
        link(&mut map, "dina", "reuven", RelationKind::Sibling);

        let suggestions = suggest(&map, "dina", "reuven", RelationKind::Sibling);
        assert_eq!(
            suggestions,
            vec![SuggestedConnection::new("dad", "dina", RelationKind::Father)]
        );
    }

    fn add(map: &mut MemberMap, member: Member) {
        map.insert(member.id.clone(), member);
    }

    #[test]
    fn test_second_parent_is_suggested_as_spouse() {
        let mut map = family();
        link(&mut map, "dad", "reuven", RelationKind::Father);
        link(&mut map, "mom", "reuven", RelationKind::Mother);

        let suggestions = suggest(&map, "mom", "reuven", RelationKind::Mother);
        assert_eq!(
            suggestions,
            vec![SuggestedConnection::new("dad", "mom", RelationKind::Spouse)]
        );

        add(&mut map, Member::with_id("bilha", "Bilha", "", Gender::Female));
        link(&mut map, "bilha", "dad", RelationKind::Spouse);
        let suggestions = suggest(&map, "mom", "reuven", RelationKind::Mother);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_new_child_may_parent_the_grandchildren() {
        let mut map = family();
        link(&mut map, "saba", "reuven", RelationKind::Grandfather);
        link(&mut map, "dad", "saba", RelationKind::Son);

        let suggestions = suggest(&map, "dad", "saba", RelationKind::Son);
        assert_eq!(
            suggestions,
            vec![SuggestedConnection::new("dad", "reuven", RelationKind::Father)]
        );
    }

    #[test]
    fn test_children_of_uncles_are_cousins() {
        let mut map = family();
        add(&mut map, Member::with_id("lavan", "Lavan", "", Gender::Male));
        add(&mut map, Member::with_id("rachel", "Rachel", "", Gender::Female));
        link(&mut map, "lavan", "dad", RelationKind::Sibling);
        link(&mut map, "lavan", "rachel", RelationKind::Father);
        link(&mut map, "dad", "dina", RelationKind::Father);

        let suggestions = suggest(&map, "dad", "dina", RelationKind::Father);
        assert_eq!(
            suggestions,
            vec![SuggestedConnection::new("rachel", "dina", RelationKind::Cousin)]
        );
    }

    #[test]
    fn test_grandparent_reaches_parents_cousins_and_other_grandparent() {
        let mut map = family();
        add(&mut map, Member::with_id("rachel", "Rachel", "", Gender::Female));
        add(&mut map, Member::with_id("savta", "Rivka", "", Gender::Female));
        link(&mut map, "dad", "dina", RelationKind::Father);
        link(&mut map, "rachel", "dina", RelationKind::Cousin);
        link(&mut map, "savta", "dina", RelationKind::Grandmother);
        link(&mut map, "saba", "dina", RelationKind::Grandfather);

        let suggestions = suggest(&map, "saba", "dina", RelationKind::Grandfather);
        assert_eq!(
            suggestions,
            vec![
                SuggestedConnection::new("saba", "dad", RelationKind::Father),
                SuggestedConnection::new("saba", "rachel", RelationKind::Grandfather),
                SuggestedConnection::new("savta", "saba", RelationKind::Spouse),
            ]
        );
    }

    #[test]
    fn test_new_cousin_meets_the_other_cousins() {
        let mut map = family();
        add(&mut map, Member::with_id("rachel", "Rachel", "", Gender::Female));
        link(&mut map, "rachel", "reuven", RelationKind::Cousin);
        link(&mut map, "dina", "reuven", RelationKind::Cousin);

        let suggestions = suggest(&map, "dina", "reuven", RelationKind::Cousin);
        assert_eq!(
            suggestions,
            vec![SuggestedConnection::new("rachel", "dina", RelationKind::Cousin)
                .with_alternative(RelationKind::Sibling)]
        );
    }

    #[test]
    fn test_unknown_endpoints_yield_nothing() {
        let map = family();
        assert!(suggest(&map, "ghost", "dad", RelationKind::Spouse).is_empty());
    }
}
