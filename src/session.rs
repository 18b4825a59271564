use crate::kinship::{FamilyTree, TreeOptions};
use crate::relations::RelationKind;
use crate::store::MemberStore;
use crate::types::{Member, MemberId, SuggestedConnection};
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// A family tree bound to the store it came from.
///
/// Every successful mutation is persisted exactly once; a rejected one
/// never reaches the store.
pub struct TreeSession<S: MemberStore> {
    store: S,
    tree: FamilyTree,
}

impl<S: MemberStore> TreeSession<S> {
    /// Load the snapshot and refuse it if it breaks any tree invariant.
    pub async fn open(store: S, options: TreeOptions) -> Result<Self> {
        let members = store
            .load_members()
            .await
            .context("Failed to load family tree")?;
        let tree = FamilyTree::from_members(members, options);

        let violations = tree.verify_invariants();
        if !violations.is_empty() {
            for violation in &violations {
                warn!("Invariant violation: {}", violation);
            }
            bail!("Stored tree breaks {} invariants", violations.len());
        }

        info!("Opened family tree with {} members", tree.len());
        Ok(Self { store, tree })
    }

    pub fn tree(&self) -> &FamilyTree {
        &self.tree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (S, FamilyTree) {
        (self.store, self.tree)
    }

    pub async fn add_first_member(&mut self, member: Member) -> Result<MemberId> {
        let id = self.tree.add_first_member(member)?;
        self.save().await?;
        Ok(id)
    }

    pub async fn add_related_member(
        &mut self,
        member: Member,
        target: &str,
        kind: RelationKind,
        allow_duplicate_name: bool,
    ) -> Result<MemberId> {
        let id = self
            .tree
            .add_related_member(member, target, kind, allow_duplicate_name)?;
        self.save().await?;
        Ok(id)
    }

    pub async fn connect(&mut self, source: &str, target: &str, kind: RelationKind) -> Result<()> {
        self.tree.connect(source, target, kind)?;
        self.save().await
    }

    pub async fn remove_relationship(&mut self, a: &str, b: &str) -> Result<Vec<RelationKind>> {
        let removed = self.tree.remove_relationship(a, b)?;
        self.save().await?;
        Ok(removed)
    }

    pub async fn remove_member(&mut self, id: &str) -> Result<Member> {
        let member = self.tree.remove_member(id)?;
        self.save().await?;
        Ok(member)
    }

    pub fn next_suggestion(&mut self) -> Option<SuggestedConnection> {
        self.tree.next_suggestion()
    }

    pub async fn accept_suggestion(&mut self, suggestion: &SuggestedConnection) -> Result<()> {
        self.tree.accept_suggestion(suggestion)?;
        self.save().await
    }

    async fn save(&mut self) -> Result<()> {
        let changes = self.tree.take_changes();
        if changes.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.store.persist(self.tree.members(), &changes).await {
            self.tree.restore_changes(changes);
            return Err(err).context("Failed to persist family tree");
        }
        Ok(())
    }
}
