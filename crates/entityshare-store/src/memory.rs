//! In-memory implementation of the ShareStore trait.
//!
//! Same semantics as SQLite, no persistence. Used by tests and by sessions
//! that do not need to outlive the process.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use entityshare_core::{Grant, GranteeRef, ShareableRef};

use crate::error::{Result, StoreError};
use crate::traits::{check_save, SaveResult, ShareStore};

/// In-memory store implementation. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryShareStore {
    /// Grants per shareable, in insertion order.
    inner: RwLock<HashMap<ShareableRef, Vec<Grant>>>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn save(&self, grant: &Grant) -> Result<SaveResult> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let rows = inner.entry(grant.shareable()).or_default();

        let position = rows.iter().position(|g| g.grantee == grant.grantee);
        let current_owner = rows.iter().find(|g| g.is_owner()).map(|g| &g.grantee);
        check_save(
            grant,
            position.map(|i| rows[i].access_level),
            current_owner,
        )?;

        match position {
            Some(i) => {
                rows[i] = grant.clone();
                Ok(SaveResult::Updated)
            }
            None => {
                rows.push(grant.clone());
                Ok(SaveResult::Inserted)
            }
        }
    }

    async fn delete(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<bool> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = inner.get_mut(shareable) else {
            return Ok(false);
        };
        let Some(i) = rows.iter().position(|g| &g.grantee == grantee) else {
            return Ok(false);
        };
        if rows[i].is_owner() {
            return Err(StoreError::Invariant(format!(
                "owner grant of {shareable} cannot be deleted"
            )));
        }
        rows.remove(i);
        Ok(true)
    }

    async fn get(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<Option<Grant>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .get(shareable)
            .and_then(|rows| rows.iter().find(|g| &g.grantee == grantee))
            .cloned())
    }

    async fn load(&self, shareable: &ShareableRef) -> Result<Vec<Grant>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.get(shareable).cloned().unwrap_or_default())
    }

    async fn count(&self, shareable: &ShareableRef) -> Result<usize> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.get(shareable).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityshare_core::{AccessLevel, GrantedBy};

    fn project() -> ShareableRef {
        ShareableRef::new("Project", "proj-1")
    }

    fn grant(grantee: GranteeRef, level: AccessLevel) -> Grant {
        Grant::new(&project(), grantee, level, GrantedBy::new("1", "Russell Holmes"), 0)
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryShareStore::new();
        let owner = grant(GranteeRef::party("1"), AccessLevel::Owner);
        let viewer = grant(GranteeRef::party("2"), AccessLevel::Viewer);

        assert_eq!(store.save(&owner).await.unwrap(), SaveResult::Inserted);
        assert_eq!(store.save(&viewer).await.unwrap(), SaveResult::Inserted);
        assert_eq!(store.count(&project()).await.unwrap(), 2);

        let loaded = store.load(&project()).await.unwrap();
        assert_eq!(loaded, vec![owner, viewer]);
    }

    #[tokio::test]
    async fn test_memory_store_upsert_keeps_position() {
        let store = MemoryShareStore::new();
        store.save(&grant(GranteeRef::party("1"), AccessLevel::Owner)).await.unwrap();
        store.save(&grant(GranteeRef::party("2"), AccessLevel::Viewer)).await.unwrap();
        store.save(&grant(GranteeRef::role("role-1"), AccessLevel::Viewer)).await.unwrap();

        let result = store
            .save(&grant(GranteeRef::party("2"), AccessLevel::Editor))
            .await
            .unwrap();
        assert_eq!(result, SaveResult::Updated);

        let loaded = store.load(&project()).await.unwrap();
        assert_eq!(loaded[1].access_level, AccessLevel::Editor);
        assert_eq!(loaded[2].grantee, GranteeRef::role("role-1"));
    }

    #[tokio::test]
    async fn test_memory_store_owner_invariants() {
        let store = MemoryShareStore::new();
        store.save(&grant(GranteeRef::party("1"), AccessLevel::Owner)).await.unwrap();

        let second_owner = grant(GranteeRef::party("2"), AccessLevel::Owner);
        assert!(matches!(
            store.save(&second_owner).await,
            Err(StoreError::Invariant(_))
        ));
        assert!(matches!(
            store.save(&grant(GranteeRef::party("1"), AccessLevel::Viewer)).await,
            Err(StoreError::Invariant(_))
        ));
        assert!(matches!(
            store.delete(&project(), &GranteeRef::party("1")).await,
            Err(StoreError::Invariant(_))
        ));
        assert_eq!(store.count(&project()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_delete_is_idempotent() {
        let store = MemoryShareStore::new();
        store.save(&grant(GranteeRef::party("2"), AccessLevel::Viewer)).await.unwrap();

        assert!(store.delete(&project(), &GranteeRef::party("2")).await.unwrap());
        assert!(!store.delete(&project(), &GranteeRef::party("2")).await.unwrap());
        assert!(store.get(&project(), &GranteeRef::party("2")).await.unwrap().is_none());
    }
}
