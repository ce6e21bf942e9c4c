//! Test fixtures and helpers.
//!
//! The people, teams, roles and entities used across the workspace's tests,
//! plus a store wrapper that can be told to fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use entityshare_core::{
    Grant, GrantedBy, GranteeRef, InMemoryDirectory, Party, PartyId, SecurityRole,
    ShareableEntity, ShareableRef,
};
use entityshare_store::{MemoryShareStore, Result, SaveResult, ShareStore, StoreError};

/// Owner of both fixture entities.
pub const OWNER_ID: &str = "1";

pub fn russell() -> Party {
    Party::individual("1", "Russell Holmes").with_email("russell@example.com")
}

pub fn jonathan() -> Party {
    Party::individual("2", "Jonathan Bailey").with_email("jonathan.bailey@cloud.com")
}

pub fn rick() -> Party {
    Party::individual("3", "Rick Kolosk").with_email("rick.kolosk@gmail.com")
}

pub fn external_user() -> Party {
    Party::individual("4", "Test External User")
        .with_email("test-external-user@example.com")
        .external()
}

/// Individuals 1-4, then teams 5-7.
pub fn parties() -> Vec<Party> {
    vec![
        russell(),
        jonathan(),
        rick(),
        external_user(),
        Party::organization("5", "Engineering Team"),
        Party::organization("6", "Design Team"),
        Party::organization("7", "Product Team"),
    ]
}

pub fn roles() -> Vec<SecurityRole> {
    [
        ("role-1", "Finance Admin", "Manage budgets and financial records"),
        ("role-2", "HR Manager", "Access employee records and benefits"),
        ("role-3", "Project Admin", "Create and manage all projects"),
        ("role-4", "Content Editor", "Edit and publish content across workspace"),
        ("role-5", "Timesheet Approver", "Review and approve timesheets"),
    ]
    .into_iter()
    .map(|(id, name, description)| SecurityRole::new(id, name).with_description(description))
    .collect()
}

/// A directory holding every fixture party and role.
pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new(parties(), roles())
}

/// A confidential entity.
pub fn project() -> ShareableEntity {
    ShareableEntity::new(
        "proj-1",
        "Project",
        "DEV Cross-Tenant Test Project",
        OWNER_ID,
        "tenant-1",
    )
}

/// An open-collaboration entity.
pub fn conversation() -> ShareableEntity {
    ShareableEntity::new("conv-1", "Conversation", "Launch planning", OWNER_ID, "tenant-1")
}

/// The owner as the acting party.
pub fn owner() -> GrantedBy {
    GrantedBy::new(OWNER_ID, "Russell Holmes")
}

/// Members of `tenant-1`: the three internal individuals.
pub fn tenant_members() -> Vec<PartyId> {
    ["1", "2", "3"].into_iter().map(PartyId::from).collect()
}

/// A store whose writes can be made to fail on demand. Reads always pass
/// through.
pub struct FailingStore {
    inner: MemoryShareStore,
    fail_writes: AtomicBool,
    /// Writes allowed before every further write fails.
    writes_left: AtomicUsize,
}

impl Default for FailingStore {
    fn default() -> Self {
        Self {
            inner: MemoryShareStore::default(),
            fail_writes: AtomicBool::new(false),
            writes_left: AtomicUsize::new(usize::MAX),
        }
    }
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save and delete fail (or succeed again).
    /// Turning failures off also clears any write budget.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
        if !fail {
            self.writes_left.store(usize::MAX, Ordering::SeqCst);
        }
    }

    /// Let `n` more writes through, then fail every write after them.
    pub fn fail_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let spent = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                usize::MAX => Some(left),
                0 => None,
                _ => Some(left - 1),
            });
        match spent {
            Ok(_) => Ok(()),
            Err(_) => Err(injected()),
        }
    }
}

fn injected() -> StoreError {
    StoreError::Io(std::io::Error::other("injected write failure"))
}

#[async_trait]
impl ShareStore for FailingStore {
    async fn save(&self, grant: &Grant) -> Result<SaveResult> {
        self.check()?;
        self.inner.save(grant).await
    }

    async fn delete(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<bool> {
        self.check()?;
        self.inner.delete(shareable, grantee).await
    }

    async fn get(&self, shareable: &ShareableRef, grantee: &GranteeRef) -> Result<Option<Grant>> {
        self.inner.get(shareable, grantee).await
    }

    async fn load(&self, shareable: &ShareableRef) -> Result<Vec<Grant>> {
        self.inner.load(shareable).await
    }

    async fn count(&self, shareable: &ShareableRef) -> Result<usize> {
        self.inner.count(shareable).await
    }
}
