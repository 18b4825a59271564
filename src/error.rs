use crate::relations::RelationKind;
use crate::types::MemberId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard reasons the validator refuses a proposed relationship.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("member {member} cannot be the {relation} of {relative}: gender does not match")]
    GenderMismatch {
        relation: RelationKind,
        member: MemberId,
        relative: MemberId,
    },

    #[error("member {holder} already has the maximum number of {relation} relations")]
    CardinalityExceeded {
        relation: RelationKind,
        holder: MemberId,
    },

    #[error("members {first} and {second} have the same gender and cannot marry")]
    SameSexMarriage { first: MemberId, second: MemberId },

    #[error("a member cannot be related to itself: {0}")]
    SelfRelation(MemberId),

    #[error("member not found in tree: {0}")]
    UnknownMember(MemberId),

    #[error("members {member} and {relative} are already related as {existing}")]
    AlreadyRelated {
        member: MemberId,
        relative: MemberId,
        existing: RelationKind,
    },
}

/// Soft findings the caller may override.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Warning {
    #[error("a member named '{name}' already exists ({existing})")]
    PossibleDuplicate { existing: MemberId, name: String },
}

/// Failures of mutating tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("member not found in tree: {0}")]
    UnknownMember(MemberId),

    #[error("removing member {0} would disconnect the family tree")]
    UnsafeDelete(MemberId),

    #[error("removing the relation between {0} and {1} would disconnect the family tree")]
    UnsafeUnlink(MemberId, MemberId),

    #[error("members {0} and {1} are not related")]
    NotRelated(MemberId, MemberId),

    #[error("the tree already has members; new members must be related to an existing one")]
    TreeNotEmpty,

    #[error("a member with id {0} already exists")]
    DuplicateId(MemberId),

    #[error("relationship rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("relationship needs confirmation: {0}")]
    DuplicateName(Warning),
}

/// Failures of shortest-connection queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("at least two members are needed to look for a connection")]
    InsufficientMembers,

    #[error("member not found in tree: {0}")]
    UnknownMember(MemberId),

    #[error("no connection exists between {0} and {1}")]
    NotFound(MemberId, MemberId),
}

/// A broken structural rule found in a member collection, typically a
/// snapshot loaded from a store.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    #[error("member {member} lists {relative} as {relation}, but {relative} does not list it back")]
    MissingMirror {
        member: MemberId,
        relative: MemberId,
        relation: RelationKind,
    },

    #[error("member {member} refers to unknown member {relative}")]
    DanglingReference { member: MemberId, relative: MemberId },

    #[error("member {member} is related to itself")]
    SelfReference { member: MemberId },

    #[error("member {member} has {count} {relation} relations")]
    CardinalityExceeded {
        member: MemberId,
        relation: RelationKind,
        count: usize,
    },

    #[error("member {member} lists {relative} as {relation}, which does not match their gender")]
    GenderMismatch {
        member: MemberId,
        relative: MemberId,
        relation: RelationKind,
    },

    #[error("the tree is split into {components} disconnected groups")]
    Disconnected { components: usize },

    #[error("member stored under key {key} has id {id}")]
    KeyMismatch { key: MemberId, id: MemberId },
}
