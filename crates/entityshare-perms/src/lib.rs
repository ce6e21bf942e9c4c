//! # EntityShare Permissions
//!
//! The grant registry and the sharing-pattern policy that constrains it.
//!
//! ## Overview
//!
//! A [`GrantRegistry`] holds every grant on one entity. It starts with the
//! owner grant (and, for open collaboration, an implicit grant per tenant
//! member) and is then mutated through add, change and remove operations.
//! Each operation either succeeds completely or fails with a [`PermsError`]
//! and leaves the registry as it was.
//!
//! What an operation may do is decided by the entity's [`SharingPattern`],
//! looked up in a [`SharingPolicy`] table by entity type.
//!
//! ## Usage
//!
//! ```rust
//! use entityshare_core::{AccessLevel, GranteeRef, Party, ShareableEntity};
//! use entityshare_perms::{GrantRegistry, SharingPolicy};
//!
//! let project = ShareableEntity::new("proj-1", "Project", "Roadmap", "1", "tenant-1");
//! let mut registry = GrantRegistry::builder(project, &SharingPolicy::default()).build();
//!
//! registry
//!     .add_grant(Party::individual("2", "Jonathan Bailey"), AccessLevel::Viewer)
//!     .unwrap();
//! registry
//!     .change_access_level(&GranteeRef::party("2"), AccessLevel::Editor)
//!     .unwrap();
//! assert_eq!(registry.len(), 2);
//! ```

pub mod error;
pub mod policy;
pub mod registry;

pub use error::{PermsError, Result};
pub use policy::{PatternRules, SharingPattern, SharingPolicy};
pub use registry::{now_millis, GrantRegistry, RegistryBuilder};
