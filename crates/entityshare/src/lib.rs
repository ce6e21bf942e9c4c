//! # EntityShare
//!
//! The unified sharing API: one place to decide who can reach an entity and
//! at which level.
//!
//! ## Overview
//!
//! - **Grants**: a grantee (person, team, security role or public link) bound
//!   to an access level on one entity
//! - **Patterns**: each entity type is either *confidential* (explicit grants
//!   only) or *open collaboration* (every tenant member is in, guests are
//!   invited explicitly)
//! - **Sessions**: a [`ShareSession`] loads an entity's grants from a store,
//!   applies add/change/remove operations and writes them back
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use entityshare::{SessionConfig, ShareSession};
//! use entityshare::core::{
//!     AccessLevel, GrantedBy, GranteeRef, InMemoryDirectory, Party, ShareableEntity,
//! };
//! use entityshare::store::SqliteShareStore;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteShareStore::open("shares.db").unwrap());
//!     let directory = InMemoryDirectory::default()
//!         .with_party(Party::individual("2", "Jonathan Bailey"));
//!
//!     let project = ShareableEntity::new("proj-1", "Project", "Roadmap", "1", "tenant-1");
//!     let mut session = ShareSession::open(
//!         project,
//!         GrantedBy::new("1", "Russell Holmes"),
//!         Vec::new(),
//!         store,
//!         directory,
//!         SessionConfig::default(),
//!     )
//!     .await
//!     .unwrap();
//!
//!     let found = session.search("jon");
//!     session.share(found[0].clone()).await.unwrap();
//!     session
//!         .change_access_level(&GranteeRef::party("2"), AccessLevel::Editor)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `entityshare::core` - Data model (parties, roles, grants, levels)
//! - `entityshare::perms` - Grant registry and sharing policy
//! - `entityshare::store` - Store trait, SQLite and in-memory backends

pub mod error;
pub mod session;

// Re-export component crates
pub use entityshare_core as core;
pub use entityshare_perms as perms;
pub use entityshare_store as store;

// Re-export main types for convenience
pub use error::{Result, ShareError};
pub use session::{SessionConfig, ShareSession};

// Re-export commonly used types
pub use entityshare_core::{AccessLevel, Grant, Grantee, GranteeRef, Party, SecurityRole, ShareableEntity};
pub use entityshare_perms::{GrantRegistry, SharingPattern, SharingPolicy};
