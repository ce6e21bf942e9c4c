//! ShareStore trait: the abstract interface for grant persistence.
//!
//! The registry never talks to storage. The session layer writes every
//! committed mutation through this trait, so any backend honouring it can be
//! swapped in without touching policy logic.

use async_trait::async_trait;
use entityshare_core::{AccessLevel, Grant, GranteeRef, ShareableRef};

use crate::error::{Result, StoreError};

/// Result of saving a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// No grant existed for this grantee on this shareable.
    Inserted,
    /// An existing grant was overwritten in place.
    Updated,
}

/// Async interface for grant persistence.
///
/// Rows are keyed by `(shareableType, shareableId, granteeType, granteeId)`,
/// which is what [`entityshare_core::ShareId`] is derived from. Saves are
/// upserts and deletes of missing rows are no-ops, so retrying any write is
/// safe.
///
/// # Invariants
///
/// Backends reject, with [`crate::StoreError::Invariant`]:
/// - deleting the owner grant;
/// - saving an owner grant when another grantee already owns the shareable;
/// - overwriting the owner grant with a lower level.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Insert or overwrite a grant.
    async fn save(&self, grant: &Grant) -> Result<SaveResult>;

    /// Delete the grant held by `grantee`. Returns whether a row existed.
    async fn delete(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<bool>;

    /// Fetch one grant.
    async fn get(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<Option<Grant>>;

    /// Every grant on `shareable`, in insertion order.
    async fn load(&self, shareable: &ShareableRef) -> Result<Vec<Grant>>;

    /// Number of grants on `shareable`.
    async fn count(&self, shareable: &ShareableRef) -> Result<usize>;
}

/// Extension trait for common store patterns.
pub trait ShareStoreExt: ShareStore {
    /// Save grants one after another, stopping at the first failure.
    ///
    /// Returns how many were newly inserted.
    fn save_all(&self, grants: &[Grant]) -> impl std::future::Future<Output = Result<usize>> + Send;
}

impl<S: ShareStore + ?Sized> ShareStoreExt for S {
    async fn save_all(&self, grants: &[Grant]) -> Result<usize> {
        let mut inserted = 0;
        for grant in grants {
            if self.save(grant).await? == SaveResult::Inserted {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

/// Check a save against the owner invariants.
///
/// `existing` is the level currently stored for the same grantee,
/// `current_owner` the grantee currently holding the owner row, if any.
pub(crate) fn check_save(
    grant: &Grant,
    existing: Option<AccessLevel>,
    current_owner: Option<&GranteeRef>,
) -> Result<()> {
    if grant.is_owner() {
        if let Some(owner) = current_owner {
            if owner != &grant.grantee {
                return Err(StoreError::Invariant(format!(
                    "{} already owns {}",
                    owner,
                    grant.shareable()
                )));
            }
        }
    } else if existing == Some(AccessLevel::Owner) {
        return Err(StoreError::Invariant(format!(
            "owner grant of {} cannot be downgraded",
            grant.shareable()
        )));
    }
    Ok(())
}
