pub mod file;
pub mod memory;

pub use file::{FileStore, SnapshotFormat};
pub use memory::InMemoryStore;

use crate::types::{ChangeSet, MemberMap};
use anyhow::Result;
use async_trait::async_trait;

/// Persistence collaborator for a family tree.
///
/// The tree never calls a store itself; callers load a snapshot, mutate the
/// tree, then hand the result back here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Full snapshot of the stored members.
    async fn load_members(&self) -> Result<MemberMap>;

    /// Save after a successful mutation. `changes` names the ids touched
    /// since the previous save.
    async fn persist(&self, members: &MemberMap, changes: &ChangeSet) -> Result<()>;
}
