//! The authorization boundary consumed by the merge workflow.
//!
//! The platform's membership service decides who administers which tree;
//! this crate only asks. The answer is treated as an opaque, possibly
//! stale boolean: it is checked once as a precondition of resolving a
//! request, not re-checked between reconciliation steps.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use vansh_types::{TreeId, UserId};

/// Answers "is this user an admin of this tree".
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn is_admin(&self, tree: TreeId, user: UserId) -> bool;
}

/// Gate backed by an in-memory role table. For tests and embedding.
#[derive(Default)]
pub struct StaticAdminGate {
    admins: RwLock<HashMap<TreeId, HashSet<UserId>>>,
}

impl StaticAdminGate {
    /// Create a gate with no admins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `user` admin rights on `tree`.
    pub fn grant(&self, tree: TreeId, user: UserId) {
        self.admins
            .write()
            .expect("lock poisoned")
            .entry(tree)
            .or_default()
            .insert(user);
    }

    /// Revoke `user`'s admin rights on `tree`.
    pub fn revoke(&self, tree: TreeId, user: UserId) {
        if let Some(users) = self.admins.write().expect("lock poisoned").get_mut(&tree) {
            users.remove(&user);
        }
    }
}

#[async_trait]
impl AuthorizationGate for StaticAdminGate {
    async fn is_admin(&self, tree: TreeId, user: UserId) -> bool {
        self.admins
            .read()
            .expect("lock poisoned")
            .get(&tree)
            .is_some_and(|users| users.contains(&user))
    }
}

/// Gate that admits everyone. For tests only.
pub struct AllowAllGate;

#[async_trait]
impl AuthorizationGate for AllowAllGate {
    async fn is_admin(&self, _tree: TreeId, _user: UserId) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_gate_grants_and_revokes() {
        let gate = StaticAdminGate::new();
        let tree = TreeId::new();
        let user = UserId::new();

        assert!(!gate.is_admin(tree, user).await);
        gate.grant(tree, user);
        assert!(gate.is_admin(tree, user).await);
        gate.revoke(tree, user);
        assert!(!gate.is_admin(tree, user).await);
    }

    #[tokio::test]
    async fn grants_are_tree_scoped() {
        let gate = StaticAdminGate::new();
        let user = UserId::new();
        gate.grant(TreeId::new(), user);
        assert!(!gate.is_admin(TreeId::new(), user).await);
    }

    #[tokio::test]
    async fn allow_all_admits_anyone() {
        assert!(AllowAllGate.is_admin(TreeId::new(), UserId::new()).await);
    }
}
