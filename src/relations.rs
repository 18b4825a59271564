use crate::types::Gender;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of relationship an edge can carry.
///
/// Variant order is significant: traversals discover neighbors in this
/// order, which keeps shortest paths reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationKind {
    Father,
    Mother,
    Son,
    Daughter,
    Spouse,
    Grandfather,
    Grandmother,
    Grandson,
    Granddaughter,
    Sibling,
    Cousin,
}

impl RelationKind {
    pub const ALL: [RelationKind; 11] = [
        RelationKind::Father,
        RelationKind::Mother,
        RelationKind::Son,
        RelationKind::Daughter,
        RelationKind::Spouse,
        RelationKind::Grandfather,
        RelationKind::Grandmother,
        RelationKind::Grandson,
        RelationKind::Granddaughter,
        RelationKind::Sibling,
        RelationKind::Cousin,
    ];

    /// Gender the member playing this role must have, if any.
    pub fn required_gender(self) -> Option<Gender> {
        match self {
            RelationKind::Father
            | RelationKind::Son
            | RelationKind::Grandfather
            | RelationKind::Grandson => Some(Gender::Male),
            RelationKind::Mother
            | RelationKind::Daughter
            | RelationKind::Grandmother
            | RelationKind::Granddaughter => Some(Gender::Female),
            RelationKind::Spouse | RelationKind::Sibling | RelationKind::Cousin => None,
        }
    }

    /// Maximum number of members a single member may hold under this kind.
    pub fn max_cardinality(self) -> Option<usize> {
        match self {
            RelationKind::Father | RelationKind::Mother | RelationKind::Spouse => Some(1),
            RelationKind::Grandfather | RelationKind::Grandmother => Some(2),
            _ => None,
        }
    }

    /// The kind stored on the other endpoint, given that endpoint's gender.
    ///
    /// If `a` is the `self` of `b`, then `b` is the `self.inverse(b.gender)` of `a`.
    pub fn inverse(self, other: Gender) -> RelationKind {
        match self {
            RelationKind::Father | RelationKind::Mother => match other {
                Gender::Male => RelationKind::Son,
                Gender::Female => RelationKind::Daughter,
            },
            RelationKind::Son | RelationKind::Daughter => Self::parent_for(other),
            RelationKind::Grandfather | RelationKind::Grandmother => match other {
                Gender::Male => RelationKind::Grandson,
                Gender::Female => RelationKind::Granddaughter,
            },
            RelationKind::Grandson | RelationKind::Granddaughter => Self::grandparent_for(other),
            RelationKind::Spouse | RelationKind::Sibling | RelationKind::Cousin => self,
        }
    }

    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            RelationKind::Spouse | RelationKind::Sibling | RelationKind::Cousin
        )
    }

    pub fn is_parent(self) -> bool {
        matches!(self, RelationKind::Father | RelationKind::Mother)
    }

    pub fn is_child(self) -> bool {
        matches!(self, RelationKind::Son | RelationKind::Daughter)
    }

    pub fn is_grandparent(self) -> bool {
        matches!(self, RelationKind::Grandfather | RelationKind::Grandmother)
    }

    pub fn is_grandchild(self) -> bool {
        matches!(self, RelationKind::Granddaughter | RelationKind::Grandson)
    }

    pub fn parent_for(gender: Gender) -> RelationKind {
        match gender {
            Gender::Male => RelationKind::Father,
            Gender::Female => RelationKind::Mother,
        }
    }

    pub fn grandparent_for(gender: Gender) -> RelationKind {
        match gender {
            Gender::Male => RelationKind::Grandfather,
            Gender::Female => RelationKind::Grandmother,
        }
    }

    /// Human-readable name of the role, e.g. "wife" for a female spouse.
    pub fn display_as_relation(self, gender: Gender) -> &'static str {
        let male = gender == Gender::Male;
        match self {
            RelationKind::Father => "father",
            RelationKind::Mother => "mother",
            RelationKind::Son => "son",
            RelationKind::Daughter => "daughter",
            RelationKind::Spouse => {
                if male {
                    "husband"
                } else {
                    "wife"
                }
            }
            RelationKind::Grandfather => "grandfather",
            RelationKind::Grandmother => "grandmother",
            RelationKind::Grandson => "grandson",
            RelationKind::Granddaughter => "granddaughter",
            RelationKind::Sibling => {
                if male {
                    "brother"
                } else {
                    "sister"
                }
            }
            RelationKind::Cousin => "cousin",
        }
    }

    /// Role phrased as a connection, e.g. "wife of".
    pub fn display_as_connection(self, gender: Gender) -> String {
        format!("{} of", self.display_as_relation(gender))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Father => "father",
            RelationKind::Mother => "mother",
            RelationKind::Son => "son",
            RelationKind::Daughter => "daughter",
            RelationKind::Spouse => "spouse",
            RelationKind::Grandfather => "grandfather",
            RelationKind::Grandmother => "grandmother",
            RelationKind::Grandson => "grandson",
            RelationKind::Granddaughter => "granddaughter",
            RelationKind::Sibling => "sibling",
            RelationKind::Cousin => "cousin",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "father" => RelationKind::Father,
            "mother" => RelationKind::Mother,
            "son" => RelationKind::Son,
            "daughter" => RelationKind::Daughter,
            "spouse" | "husband" | "wife" | "marriage" => RelationKind::Spouse,
            "grandfather" => RelationKind::Grandfather,
            "grandmother" => RelationKind::Grandmother,
            "grandson" => RelationKind::Grandson,
            "granddaughter" => RelationKind::Granddaughter,
            "sibling" | "brother" | "sister" => RelationKind::Sibling,
            "cousin" => RelationKind::Cousin,
            other => return Err(format!("unknown relation kind: {}", other)),
        };
        Ok(kind)
    }
}
