//! Error types for the permissions module.

use thiserror::Error;

use entityshare_core::{AccessLevel, GranteeRef, PartyId};

use crate::policy::SharingPattern;

/// Errors returned by registry operations.
///
/// All of them are recoverable: the registry is left unchanged.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The grantee already holds a grant.
    #[error("grantee already has access: {0}")]
    DuplicateGrantee(GranteeRef),

    /// No grant exists for the grantee.
    #[error("grant not found: {0}")]
    GrantNotFound(GranteeRef),

    /// The owner grant cannot be changed or removed.
    #[error("the owner grant cannot be modified: {0}")]
    OwnerImmutable(GranteeRef),

    /// Tenant members cannot be evicted individually.
    #[error("tenant member cannot be removed, only re-leveled: {0}")]
    MembershipImmutable(GranteeRef),

    /// The level is `owner` or is not offered by the sharing pattern.
    #[error("access level {level} is not allowed for {pattern} sharing")]
    InvalidAccessLevel {
        level: AccessLevel,
        pattern: SharingPattern,
    },

    /// The sharing pattern does not permit this kind of operation.
    #[error("{operation} is not permitted for {pattern} sharing")]
    NotPermitted {
        pattern: SharingPattern,
        operation: &'static str,
    },

    /// The acting party may not manage grants on this entity.
    #[error("party {0} is not allowed to manage sharing")]
    NotAuthorized(PartyId),

    /// Persisted grants violate registry invariants.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// The policy table could not be loaded.
    #[error("policy error: {0}")]
    Policy(String),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
