//! # EntityShare Core
//!
//! Pure data model for unified sharing: who can be granted access, at which
//! level, on which entity.
//!
//! This crate contains no I/O, no storage, no policy. It is the vocabulary the
//! registry, the store and the session layers share.
//!
//! ## Key Types
//!
//! - [`ShareableEntity`] - The object being shared
//! - [`Party`] / [`SecurityRole`] - Identities that can receive a grant
//! - [`GranteeRef`] - Tagged reference to a grantee (`Party(id) | Role(id)`)
//! - [`AccessLevel`] - Ordered access levels, plus the `owner` sentinel
//! - [`Grant`] - One EntityShare record: a grantee bound to a level
//! - [`Directory`] - Lookup collaborator resolving search queries to grantees

pub mod access;
pub mod directory;
pub mod entity;
pub mod error;
pub mod party;
pub mod share;
pub mod types;

pub use access::AccessLevel;
pub use directory::{partition_parties, Directory, InMemoryDirectory};
pub use entity::{ShareableEntity, ShareableRef};
pub use error::CoreError;
pub use party::{Grantee, GranteeRef, GranteeType, Party, PartyKind, SecurityRole};
pub use share::{
    Grant, GrantMetadata, GrantedBy, GranteeScope, LinkToken, ShareId, ShareScope,
};
pub use types::{EntityId, PartyId, RoleId, TenantId};
