//! # EntityShare Store
//!
//! Persistence for grant sets. Provides a trait-based interface with SQLite
//! and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`ShareStore`] - The async trait for all storage operations
//! - [`SqliteShareStore`] - SQLite-based persistent storage
//! - [`MemoryShareStore`] - In-memory storage for tests
//! - [`SaveResult`] - Whether a save inserted or overwrote a row
//!
//! ## Usage
//!
//! ```rust,no_run
//! use entityshare_core::{AccessLevel, Grant, GrantedBy, GranteeRef, ShareableRef};
//! use entityshare_store::{ShareStore, SqliteShareStore};
//!
//! async fn example() {
//!     let store = SqliteShareStore::open("shares.db").unwrap();
//!
//!     let project = ShareableRef::new("Project", "proj-1");
//!     let owner = Grant::new(
//!         &project,
//!         GranteeRef::party("1"),
//!         AccessLevel::Owner,
//!         GrantedBy::new("1", "Russell Holmes"),
//!         0,
//!     );
//!     store.save(&owner).await.unwrap();
//!     assert_eq!(store.count(&project).await.unwrap(), 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent writes**: saves are upserts keyed by `ShareId`; deleting a
//!   missing row returns `false`
//! - **Insertion order**: `load` returns grants in the order first saved
//! - **Owner guard**: the owner row can be neither deleted, duplicated nor
//!   downgraded

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryShareStore;
pub use sqlite::SqliteShareStore;
pub use traits::{SaveResult, ShareStore, ShareStoreExt};
