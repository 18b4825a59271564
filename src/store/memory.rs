use crate::store::MemberStore;
use crate::types::{ChangeSet, MemberMap};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Store kept in process memory. Saves are applied incrementally from the
/// change set, the way a document store would update individual records.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    members: RwLock<MemberMap>,
    history: RwLock<Vec<ChangeSet>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: MemberMap) -> Self {
        Self {
            members: RwLock::new(members),
            history: RwLock::new(Vec::new()),
        }
    }

    pub async fn snapshot(&self) -> MemberMap {
        self.members.read().await.clone()
    }

    /// Every change set persisted so far, oldest first.
    pub async fn history(&self) -> Vec<ChangeSet> {
        self.history.read().await.clone()
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn load_members(&self) -> Result<MemberMap> {
        Ok(self.snapshot().await)
    }

    async fn persist(&self, members: &MemberMap, changes: &ChangeSet) -> Result<()> {
        let mut stored = self.members.write().await;

        for id in &changes.deleted {
            stored.remove(id);
        }
        for id in &changes.modified {
            match members.get(id) {
                Some(member) => {
                    stored.insert(id.clone(), member.clone());
                }
                None => {
                    stored.remove(id);
                }
            }
        }

        debug!(
            "Applied {} updates and {} deletions",
            changes.modified.len(),
            changes.deleted.len()
        );
        self.history.write().await.push(changes.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Gender, Member};

    #[tokio::test]
    async fn test_persist_applies_only_changed_ids() {
        let stale = Member::with_id("b", "Old", "Name", Gender::Male);
        let store = InMemoryStore::with_members(
            [("b".to_string(), stale.clone()), ("c".to_string(), stale.clone())]
                .into_iter()
                .collect(),
        );

        let members: MemberMap = [
            ("a".to_string(), Member::with_id("a", "Aharon", "Cohen", Gender::Male)),
            ("b".to_string(), Member::with_id("b", "New", "Name", Gender::Male)),
        ]
        .into_iter()
        .collect();
        let changes = ChangeSet {
            modified: ["a".to_string()].into_iter().collect(),
            deleted: ["c".to_string()].into_iter().collect(),
        };

        store.persist(&members, &changes).await.unwrap();
        let snapshot = store.snapshot().await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["a"].first_name, "Aharon");
        // b was not in the change set, so the stored copy is untouched.
        assert_eq!(snapshot["b"], stale);
        assert_eq!(store.history().await, vec![changes]);
    }

    #[tokio::test]
    async fn test_load_returns_snapshot() {
        let store = InMemoryStore::new();
        assert!(store.load_members().await.unwrap().is_empty());
    }
}
