//! # EntityShare Testkit
//!
//! Testing utilities for EntityShare.
//!
//! ## Overview
//!
//! - **Fixtures**: the people, teams, roles and entities shared by the
//!   workspace's tests, and a store that fails on demand
//! - **Generators**: Proptest strategies for grantees, levels and registry
//!   operations
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use entityshare_testkit::generators::{apply_op, fixture_registry, registry_op};
//!
//! proptest! {
//!     #[test]
//!     fn owner_survives(ops in prop::collection::vec(registry_op(), 0..20)) {
//!         let mut registry = fixture_registry("Project");
//!         for op in &ops {
//!             apply_op(&mut registry, op);
//!         }
//!         prop_assert!(registry.owner().is_owner());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use entityshare_testkit::fixtures;
//!
//! let directory = fixtures::directory();
//! let project = fixtures::project();
//! assert_eq!(project.owner_party_id.as_str(), fixtures::OWNER_ID);
//! # let _ = directory;
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::FailingStore;
pub use generators::{apply_op, fixture_registry, registry_op, RegistryOp};
