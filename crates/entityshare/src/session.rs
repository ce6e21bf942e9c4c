//! The ShareSession: unified API for sharing one entity.
//!
//! A session owns the entity's [`GrantRegistry`], the directory used to find
//! grantees and the store that persists grants. Every mutation is applied to
//! a copy of the registry, written through to the store, and only then made
//! visible; a failed write leaves the session exactly as it was.

use std::sync::Arc;

use entityshare_core::{
    partition_parties, AccessLevel, Directory, Grant, GrantedBy, Grantee, GranteeRef, Party,
    PartyId, ShareableEntity,
};
use entityshare_perms::{GrantRegistry, PermsError, SharingPolicy};
use entityshare_store::{ShareStore, ShareStoreExt};

use crate::error::{Result, ShareError};

/// Configuration for a sharing session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Level used by [`ShareSession::share`] until changed.
    pub default_access_level: AccessLevel,
    /// Sharing-pattern table.
    pub policy: SharingPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_access_level: AccessLevel::Viewer,
            policy: SharingPolicy::default(),
        }
    }
}

/// A sharing session over one entity.
pub struct ShareSession<S: ShareStore, D: Directory> {
    registry: GrantRegistry,
    store: Arc<S>,
    directory: D,
    config: SessionConfig,
}

impl<S: ShareStore, D: Directory> ShareSession<S, D> {
    /// Open a session on `entity`.
    ///
    /// If the store already holds grants for the entity they are restored;
    /// otherwise a fresh registry is seeded (owner plus, for open
    /// collaboration, every tenant member) and persisted. On restore, tenant
    /// members without a grant are seeded and persisted too, so a seed cut
    /// short by a failed write is completed on the next open.
    pub async fn open(
        entity: ShareableEntity,
        actor: GrantedBy,
        tenant_members: impl IntoIterator<Item = PartyId>,
        store: Arc<S>,
        directory: D,
        config: SessionConfig,
    ) -> Result<Self> {
        let shareable = entity.reference();
        let persisted = store.load(&shareable).await?;

        let registry = if persisted.is_empty() {
            let owner_name = directory
                .resolve(&entity.owner_ref())
                .map(|owner| owner.name().to_string())
                .unwrap_or_else(|| entity.owner_party_id.to_string());

            let registry = GrantRegistry::builder(entity, &config.policy)
                .owner_name(owner_name)
                .acting_as(actor)
                .tenant_members(tenant_members)
                .build();

            let grants: Vec<Grant> = registry.list_grants().cloned().collect();
            let inserted = store.save_all(&grants).await?;
            tracing::debug!(entity = %shareable, inserted, "seeded grant registry");
            registry
        } else {
            let mut registry =
                GrantRegistry::restore(entity, &config.policy, actor, persisted)?;
            let missing = registry.seed_members(tenant_members);
            if !missing.is_empty() {
                store.save_all(&missing).await?;
            }
            tracing::debug!(
                entity = %shareable,
                grants = registry.len(),
                seeded = missing.len(),
                "restored grant registry"
            );
            registry
        };

        Ok(Self {
            registry,
            store,
            directory,
            config,
        })
    }

    /// The current grant set.
    pub fn registry(&self) -> &GrantRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// End the session, handing back the final grant set.
    pub fn close(self) -> GrantRegistry {
        tracing::debug!(entity = %self.registry.shareable(), grants = self.registry.len(), "closed share session");
        self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Grantees matching `query` that hold no grant yet.
    pub fn search(&self, query: &str) -> Vec<Grantee> {
        self.directory.search(query, &self.registry.granted_refs())
    }

    /// Parties matching `query` that hold no grant yet, split into
    /// `(individuals, teams)`.
    pub fn search_parties(&self, query: &str) -> (Vec<Party>, Vec<Party>) {
        partition_parties(
            self.directory
                .search_parties(query, &self.registry.granted_refs()),
        )
    }

    pub fn default_access_level(&self) -> AccessLevel {
        self.config.default_access_level
    }

    /// Change the level [`share`](Self::share) hands out.
    pub fn set_default_access_level(&mut self, level: AccessLevel) -> Result<()> {
        if !self.registry.rules().allows_level(level) {
            return Err(PermsError::InvalidAccessLevel {
                level,
                pattern: self.registry.pattern(),
            }
            .into());
        }
        self.config.default_access_level = level;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant the session's default level.
    pub async fn share(&mut self, grantee: impl Into<Grantee>) -> Result<Grant> {
        let level = self.config.default_access_level;
        self.add_grant(grantee, level).await
    }

    /// Invite a party from outside the tenant at the pattern's guest level.
    pub async fn invite_guest(&mut self, party: Party) -> Result<Grant> {
        let level = self.registry.rules().guest_level;
        self.add_grant(party.external(), level).await
    }

    pub async fn add_grant(
        &mut self,
        grantee: impl Into<Grantee>,
        level: AccessLevel,
    ) -> Result<Grant> {
        let grantee = grantee.into();
        self.apply("add_grant", |registry| registry.add_grant(grantee, level))
            .await
    }

    /// Grant `level` to a grantee known only by reference, resolving it
    /// through the directory first.
    pub async fn add_grant_by_ref(
        &mut self,
        grantee: &GranteeRef,
        level: AccessLevel,
    ) -> Result<Grant> {
        let resolved = self
            .directory
            .resolve(grantee)
            .ok_or_else(|| ShareError::UnknownGrantee(grantee.clone()))?;
        self.add_grant(resolved, level).await
    }

    pub async fn change_access_level(
        &mut self,
        grantee: &GranteeRef,
        level: AccessLevel,
    ) -> Result<()> {
        self.apply("change_access_level", |registry| {
            registry.change_access_level(grantee, level)
        })
        .await
    }

    pub async fn remove_grant(&mut self, grantee: &GranteeRef) -> Result<()> {
        self.apply("remove_grant", |registry| registry.remove_grant(grantee))
            .await
    }

    pub async fn create_public_link(
        &mut self,
        level: AccessLevel,
        expires_at: Option<i64>,
    ) -> Result<Grant> {
        self.apply("create_public_link", |registry| {
            registry.create_public_link(level, expires_at)
        })
        .await
    }

    pub async fn set_expiration(
        &mut self,
        grantee: &GranteeRef,
        expires_at: Option<i64>,
    ) -> Result<()> {
        self.apply("set_expiration", |registry| {
            registry.set_expiration(grantee, expires_at)
        })
        .await
    }

    pub async fn set_can_reshare(&mut self, grantee: &GranteeRef, can_reshare: bool) -> Result<()> {
        self.apply("set_can_reshare", |registry| {
            registry.set_can_reshare(grantee, can_reshare)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `mutate` on a copy of the registry, persist the difference, then
    /// swap the copy in.
    async fn apply<T, F>(&mut self, operation: &'static str, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut GrantRegistry) -> entityshare_perms::Result<T>,
    {
        let mut next = self.registry.clone();
        let value = mutate(&mut next)?;

        if let Err(e) = self.persist(&next).await {
            tracing::warn!(
                operation,
                entity = %self.registry.shareable(),
                error = %e,
                "store write failed, change rolled back"
            );
            return Err(e);
        }

        self.registry = next;
        tracing::debug!(
            operation,
            entity = %self.registry.shareable(),
            grants = self.registry.len(),
            "applied grant change"
        );
        Ok(value)
    }

    /// Write every grant that differs between the current registry and
    /// `next`.
    async fn persist(&self, next: &GrantRegistry) -> Result<()> {
        for grant in next.list_grants() {
            if self.registry.get(&grant.grantee) != Some(grant) {
                self.store.save(grant).await?;
            }
        }
        for grant in self.registry.list_grants() {
            if !next.contains(&grant.grantee) {
                self.store
                    .delete(next.shareable(), &grant.grantee)
                    .await?;
            }
        }
        Ok(())
    }
}
