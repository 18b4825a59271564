pub mod config;
pub mod error;
pub mod kinship;
pub mod queue;
pub mod relations;
pub mod reports;
pub mod session;
pub mod store;
pub mod types;

pub use error::{InvariantViolation, PathError, Rejection, TreeError, Warning};
pub use kinship::{ConnectivityChecker, FamilyTree, TreeOptions, Verdict};
pub use queue::UniqueQueue;
pub use relations::RelationKind;
pub use types::{Gender, Member, MemberId, MemberMap};
