//! The grant registry.
//!
//! A [`GrantRegistry`] is the authoritative set of grants on one entity. It
//! holds exactly one owner grant, at most one grant per grantee, and checks
//! every mutation against the entity's [`PatternRules`]. A failed operation
//! leaves the registry untouched.

use std::collections::{BTreeMap, HashMap};
use std::iter;

use entityshare_core::{
    AccessLevel, Grant, GrantMetadata, GrantedBy, Grantee, GranteeRef, GranteeScope, LinkToken,
    PartyId, ShareId, ShareableEntity, ShareableRef,
};

use crate::error::{PermsError, Result};
use crate::policy::{PatternRules, SharingPattern, SharingPolicy};

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// The grants on a single entity.
#[derive(Debug, Clone)]
pub struct GrantRegistry {
    entity: ShareableEntity,
    shareable: ShareableRef,
    pattern: SharingPattern,
    rules: PatternRules,

    /// Who mutations are attributed to and authorized against.
    actor: GrantedBy,

    owner: Grant,

    /// Non-owner grants keyed by insertion sequence.
    grants: BTreeMap<u64, Grant>,

    /// Grantee -> insertion sequence.
    index: HashMap<GranteeRef, u64>,

    next_seq: u64,
}

/// Builds a fresh registry for an entity with no persisted grants.
pub struct RegistryBuilder<'a> {
    entity: ShareableEntity,
    policy: &'a SharingPolicy,
    owner_name: Option<String>,
    actor: Option<GrantedBy>,
    members: Vec<PartyId>,
}

impl<'a> RegistryBuilder<'a> {
    /// Display name recorded on the owner grant.
    pub fn owner_name(mut self, name: impl Into<String>) -> Self {
        self.owner_name = Some(name.into());
        self
    }

    /// Attribute mutations to `actor`. Defaults to the owner.
    pub fn acting_as(mut self, actor: GrantedBy) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Tenant members that receive the pattern's implicit grant, if any.
    pub fn tenant_members(mut self, members: impl IntoIterator<Item = PartyId>) -> Self {
        self.members.extend(members);
        self
    }

    pub fn build(self) -> GrantRegistry {
        let now = now_millis();
        let pattern = self.policy.pattern_for(&self.entity.entity_type);
        let rules = self.policy.rules(pattern).clone();
        let shareable = self.entity.reference();

        let owner_by = GrantedBy::new(
            self.entity.owner_party_id.clone(),
            self.owner_name
                .unwrap_or_else(|| self.entity.owner_party_id.to_string()),
        );
        let owner = Grant::new(
            &shareable,
            self.entity.owner_ref(),
            AccessLevel::Owner,
            owner_by.clone(),
            now,
        )
        .with_can_reshare(true);

        let mut registry = GrantRegistry {
            pattern,
            shareable,
            owner,
            actor: self.actor.unwrap_or(owner_by),
            grants: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            entity: self.entity,
            rules,
        };

        registry.seed_members(self.members);
        registry
    }
}

impl GrantRegistry {
    /// Start building a registry for `entity`. The owner grant is seeded on
    /// build.
    pub fn builder(entity: ShareableEntity, policy: &SharingPolicy) -> RegistryBuilder<'_> {
        RegistryBuilder {
            entity,
            policy,
            owner_name: None,
            actor: None,
            members: Vec::new(),
        }
    }

    /// Rebuild a registry from persisted grants.
    ///
    /// The owner grant is placed first; the rest keep their given order.
    /// Fails if the grants would violate any registry invariant.
    pub fn restore(
        entity: ShareableEntity,
        policy: &SharingPolicy,
        actor: GrantedBy,
        grants: impl IntoIterator<Item = Grant>,
    ) -> Result<Self> {
        let shareable = entity.reference();
        let owner_ref = entity.owner_ref();

        let mut grants: Vec<Grant> = grants.into_iter().collect();
        grants.sort_by_key(|g| !g.is_owner());

        let mut grants = grants.into_iter();
        let owner = match grants.next() {
            Some(g) if g.is_owner() => g,
            _ => return Err(PermsError::InvalidGrant("missing owner grant".into())),
        };
        if owner.grantee != owner_ref {
            return Err(PermsError::InvalidGrant(format!(
                "owner grant held by {} instead of {}",
                owner.grantee, owner_ref
            )));
        }
        check_belongs(&owner, &shareable)?;

        let pattern = policy.pattern_for(&entity.entity_type);
        let mut registry = Self {
            entity,
            shareable,
            pattern,
            rules: policy.rules(pattern).clone(),
            actor,
            owner,
            grants: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        };

        for grant in grants {
            check_belongs(&grant, &registry.shareable)?;
            if grant.is_owner() {
                return Err(PermsError::InvalidGrant(format!(
                    "second owner grant for {}",
                    grant.grantee
                )));
            }
            if registry.contains(&grant.grantee) {
                return Err(PermsError::InvalidGrant(format!(
                    "duplicate grant for {}",
                    grant.grantee
                )));
            }
            registry.insert(grant);
        }

        Ok(registry)
    }

    /// Grant the pattern's implicit member level to every tenant member that
    /// holds no grant yet, returning the grants added. Does nothing under a
    /// pattern without implicit membership.
    ///
    /// Membership is reconciled rather than trusted: a restored registry may
    /// be missing members that joined later or whose seed never reached the
    /// store.
    pub fn seed_members(&mut self, members: impl IntoIterator<Item = PartyId>) -> Vec<Grant> {
        let Some(level) = self.rules.implicit_member_level else {
            return Vec::new();
        };

        let now = now_millis();
        let mut seeded = Vec::new();
        for member in members {
            let reference = GranteeRef::Party(member);
            if self.contains(&reference) {
                continue;
            }
            let grant = Grant::new(
                &self.shareable,
                reference,
                level,
                self.owner.granted_by.clone(),
                now,
            )
            .with_grantee_scope(GranteeScope::TenantMembers);
            self.insert(grant.clone());
            seeded.push(grant);
        }
        seeded
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Grant `level` to a new grantee.
    pub fn add_grant(&mut self, grantee: impl Into<Grantee>, level: AccessLevel) -> Result<Grant> {
        let grantee = grantee.into();
        self.check_level(level)?;
        self.authorize()?;

        let reference = grantee.reference();
        if LinkToken::is_link_ref(&reference) {
            return Err(PermsError::InvalidGrant(format!(
                "{reference} is reserved for public links"
            )));
        }
        if self.contains(&reference) {
            return Err(PermsError::DuplicateGrantee(reference));
        }

        match &grantee {
            Grantee::Role(_) if !self.rules.allow_role_grants => {
                return Err(self.not_permitted("granting a security role"));
            }
            Grantee::Party(party) if self.rules.external_only && !party.is_external => {
                return Err(self.not_permitted("adding a tenant party"));
            }
            _ => {}
        }

        let grant = Grant::new(
            &self.shareable,
            reference,
            level,
            self.actor.clone(),
            now_millis(),
        )
        .with_external(grantee.is_external());
        self.insert(grant.clone());
        Ok(grant)
    }

    /// Change the level of an existing non-owner grant. Setting the current
    /// level again is a no-op.
    pub fn change_access_level(&mut self, grantee: &GranteeRef, level: AccessLevel) -> Result<()> {
        self.authorize()?;
        self.check_mutable(grantee)?;
        self.check_level(level)?;

        if let Some(grant) = self.grant_mut(grantee) {
            grant.access_level = level;
        }
        Ok(())
    }

    /// Remove a non-owner grant.
    pub fn remove_grant(&mut self, grantee: &GranteeRef) -> Result<()> {
        self.authorize()?;
        let grant = self.check_mutable(grantee)?;
        if grant.is_tenant_member() && !self.rules.members_removable {
            return Err(PermsError::MembershipImmutable(grantee.clone()));
        }

        if let Some(seq) = self.index.remove(grantee) {
            self.grants.remove(&seq);
        }
        Ok(())
    }

    /// Issue a public link granting `level` to anyone who holds it.
    pub fn create_public_link(
        &mut self,
        level: AccessLevel,
        expires_at: Option<i64>,
    ) -> Result<Grant> {
        self.check_level(level)?;
        self.authorize()?;
        if !self.rules.allow_public_links {
            return Err(self.not_permitted("creating a public link"));
        }
        if expires_at.is_some() && !self.rules.allow_expiration {
            return Err(self.not_permitted("expiring access"));
        }

        let token = LinkToken::generate();
        let grant = Grant::new(
            &self.shareable,
            token.grantee_ref(),
            level,
            self.actor.clone(),
            now_millis(),
        )
        .with_grantee_scope(GranteeScope::PublicLink)
        .with_metadata(GrantMetadata {
            expires_at,
            message: None,
            public_link_token: Some(token),
        });
        self.insert(grant.clone());
        Ok(grant)
    }

    /// Set or clear the expiration of a non-owner grant.
    pub fn set_expiration(&mut self, grantee: &GranteeRef, expires_at: Option<i64>) -> Result<()> {
        self.authorize()?;
        if !self.rules.allow_expiration {
            return Err(self.not_permitted("expiring access"));
        }
        self.check_mutable(grantee)?;

        if let Some(grant) = self.grant_mut(grantee) {
            grant.metadata.expires_at = expires_at;
        }
        Ok(())
    }

    /// Allow or forbid a grantee to share the entity onward.
    pub fn set_can_reshare(&mut self, grantee: &GranteeRef, can_reshare: bool) -> Result<()> {
        self.authorize()?;
        self.check_mutable(grantee)?;

        if let Some(grant) = self.grant_mut(grantee) {
            grant.can_reshare = can_reshare;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Every grant, owner first, then in insertion order. Clone the iterator
    /// to walk the sequence again.
    pub fn list_grants(&self) -> impl Iterator<Item = &Grant> + Clone + '_ {
        iter::once(&self.owner).chain(self.grants.values())
    }

    /// Implicit tenant-member grants.
    pub fn members(&self) -> impl Iterator<Item = &Grant> + '_ {
        self.list_grants().filter(|g| g.is_tenant_member())
    }

    /// Grants held by guests from outside the tenant.
    pub fn guests(&self) -> impl Iterator<Item = &Grant> + '_ {
        self.list_grants().filter(|g| g.is_external)
    }

    /// Party grants, excluding public links.
    pub fn people(&self) -> impl Iterator<Item = &Grant> + '_ {
        self.list_grants()
            .filter(|g| matches!(g.grantee, GranteeRef::Party(_)) && !g.is_public_link())
    }

    pub fn role_grants(&self) -> impl Iterator<Item = &Grant> + '_ {
        self.list_grants()
            .filter(|g| matches!(g.grantee, GranteeRef::Role(_)))
    }

    pub fn public_links(&self) -> impl Iterator<Item = &Grant> + '_ {
        self.list_grants().filter(|g| g.is_public_link())
    }

    /// Grants still in force at `now`.
    pub fn active_grants(&self, now: i64) -> impl Iterator<Item = &Grant> + '_ {
        self.list_grants().filter(move |g| !g.is_expired(now))
    }

    pub fn get(&self, grantee: &GranteeRef) -> Option<&Grant> {
        if grantee == &self.owner.grantee {
            return Some(&self.owner);
        }
        self.index.get(grantee).and_then(|seq| self.grants.get(seq))
    }

    pub fn level_of(&self, grantee: &GranteeRef) -> Option<AccessLevel> {
        self.get(grantee).map(|g| g.access_level)
    }

    pub fn contains(&self, grantee: &GranteeRef) -> bool {
        self.get(grantee).is_some()
    }

    pub fn owner(&self) -> &Grant {
        &self.owner
    }

    pub fn len(&self) -> usize {
        1 + self.grants.len()
    }

    /// References of every grantee, for excluding them from searches.
    pub fn granted_refs(&self) -> Vec<GranteeRef> {
        self.list_grants().map(|g| g.grantee.clone()).collect()
    }

    /// Whether `party` holds enough access to manage grants.
    pub fn can_manage(&self, party: &PartyId) -> bool {
        self.level_of(&GranteeRef::Party(party.clone()))
            .is_some_and(|level| level.includes(self.rules.manage_level))
    }

    pub fn entity(&self) -> &ShareableEntity {
        &self.entity
    }

    pub fn shareable(&self) -> &ShareableRef {
        &self.shareable
    }

    pub fn pattern(&self) -> SharingPattern {
        self.pattern
    }

    pub fn rules(&self) -> &PatternRules {
        &self.rules
    }

    pub fn actor(&self) -> &GrantedBy {
        &self.actor
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn insert(&mut self, grant: Grant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(grant.grantee.clone(), seq);
        self.grants.insert(seq, grant);
    }

    fn grant_mut(&mut self, grantee: &GranteeRef) -> Option<&mut Grant> {
        let seq = self.index.get(grantee)?;
        self.grants.get_mut(seq)
    }

    fn authorize(&self) -> Result<()> {
        if self.can_manage(&self.actor.id) {
            Ok(())
        } else {
            Err(PermsError::NotAuthorized(self.actor.id.clone()))
        }
    }

    fn check_level(&self, level: AccessLevel) -> Result<()> {
        if self.rules.allows_level(level) {
            Ok(())
        } else {
            Err(PermsError::InvalidAccessLevel {
                level,
                pattern: self.pattern,
            })
        }
    }

    /// The grant for `grantee`, provided it exists and is not the owner's.
    fn check_mutable(&self, grantee: &GranteeRef) -> Result<&Grant> {
        let grant = self
            .get(grantee)
            .ok_or_else(|| PermsError::GrantNotFound(grantee.clone()))?;
        if grant.is_owner() {
            return Err(PermsError::OwnerImmutable(grantee.clone()));
        }
        Ok(grant)
    }

    fn not_permitted(&self, operation: &'static str) -> PermsError {
        PermsError::NotPermitted {
            pattern: self.pattern,
            operation,
        }
    }
}

fn check_belongs(grant: &Grant, shareable: &ShareableRef) -> Result<()> {
    if &grant.shareable() != shareable {
        return Err(PermsError::InvalidGrant(format!(
            "grant for {} belongs to {}",
            grant.grantee,
            grant.shareable()
        )));
    }
    if grant.id != ShareId::derive(shareable, &grant.grantee) {
        return Err(PermsError::InvalidGrant(format!(
            "grant id {} does not match {}",
            grant.id, grant.grantee
        )));
    }
    Ok(())
}
