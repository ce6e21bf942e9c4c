//! Proptest generators for property-based testing.

use proptest::prelude::*;

use entityshare_core::{AccessLevel, Grant, Grantee, GranteeRef, Party, SecurityRole};
use entityshare_perms::{GrantRegistry, SharingPolicy};

use crate::fixtures;

/// A level that can be handed out.
pub fn assignable_level() -> impl Strategy<Value = AccessLevel> {
    prop::sample::select(AccessLevel::ASSIGNABLE.to_vec())
}

/// Any level, `owner` included.
pub fn access_level() -> impl Strategy<Value = AccessLevel> {
    prop_oneof![
        4 => assignable_level(),
        1 => Just(AccessLevel::Owner),
    ]
}

/// Party ids from a small pool, so operations collide often. `1` is the
/// fixture owner, `2`/`3` are tenant members.
pub fn party_id() -> impl Strategy<Value = String> {
    "[1-9]".prop_map(String::from)
}

pub fn role_id() -> impl Strategy<Value = String> {
    "role-[1-5]".prop_map(String::from)
}

pub fn party() -> impl Strategy<Value = Party> {
    (party_id(), any::<bool>(), any::<bool>()).prop_map(|(id, team, external)| {
        let name = format!("Party {id}");
        let party = if team {
            Party::organization(id, name)
        } else {
            Party::individual(id, name)
        };
        if external {
            party.external()
        } else {
            party
        }
    })
}

pub fn role() -> impl Strategy<Value = SecurityRole> {
    role_id().prop_map(|id| {
        let name = format!("Role {id}");
        SecurityRole::new(id, name)
    })
}

pub fn grantee() -> impl Strategy<Value = Grantee> {
    prop_oneof![
        3 => party().prop_map(Grantee::Party),
        1 => role().prop_map(Grantee::Role),
    ]
}

pub fn grantee_ref() -> impl Strategy<Value = GranteeRef> {
    prop_oneof![
        3 => party_id().prop_map(GranteeRef::party),
        1 => role_id().prop_map(GranteeRef::role),
    ]
}

/// One of the fixture entity types.
pub fn entity_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("Project"), Just("Conversation")]
}

/// A registry operation.
#[derive(Debug, Clone)]
pub enum RegistryOp {
    Add(Grantee, AccessLevel),
    Change(GranteeRef, AccessLevel),
    Remove(GranteeRef),
    SetCanReshare(GranteeRef, bool),
}

pub fn registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        3 => (grantee(), access_level()).prop_map(|(g, l)| RegistryOp::Add(g, l)),
        2 => (grantee_ref(), access_level()).prop_map(|(g, l)| RegistryOp::Change(g, l)),
        2 => grantee_ref().prop_map(RegistryOp::Remove),
        1 => (grantee_ref(), any::<bool>()).prop_map(|(g, b)| RegistryOp::SetCanReshare(g, b)),
    ]
}

/// Apply `op`, returning whether it succeeded.
pub fn apply_op(registry: &mut GrantRegistry, op: &RegistryOp) -> bool {
    match op {
        RegistryOp::Add(grantee, level) => registry.add_grant(grantee.clone(), *level).is_ok(),
        RegistryOp::Change(grantee, level) => registry.change_access_level(grantee, *level).is_ok(),
        RegistryOp::Remove(grantee) => registry.remove_grant(grantee).is_ok(),
        RegistryOp::SetCanReshare(grantee, flag) => registry.set_can_reshare(grantee, *flag).is_ok(),
    }
}

/// A fresh registry over a fixture entity of `entity_type`, owned by the
/// fixture owner and seeded with the fixture tenant members.
pub fn fixture_registry(entity_type: &str) -> GrantRegistry {
    let entity = match entity_type {
        "Conversation" => fixtures::conversation(),
        _ => fixtures::project(),
    };
    GrantRegistry::builder(entity, &SharingPolicy::default())
        .owner_name("Russell Holmes")
        .tenant_members(fixtures::tenant_members())
        .build()
}

/// Snapshot of the grant list for equality checks.
pub fn snapshot(registry: &GrantRegistry) -> Vec<Grant> {
    registry.list_grants().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use entityshare_core::GranteeScope;
    use entityshare_perms::PermsError;

    fn assert_invariants(registry: &GrantRegistry) -> Result<(), TestCaseError> {
        let owners: Vec<&Grant> = registry.list_grants().filter(|g| g.is_owner()).collect();
        prop_assert_eq!(owners.len(), 1);
        prop_assert_eq!(&owners[0].grantee, &registry.entity().owner_ref());
        prop_assert!(registry.list_grants().next().is_some_and(Grant::is_owner));

        let refs: HashSet<GranteeRef> = registry.granted_refs().into_iter().collect();
        prop_assert_eq!(refs.len(), registry.len());
        Ok(())
    }

    proptest! {
        #[test]
        fn test_owner_and_uniqueness_hold(
            entity_type in entity_type(),
            ops in prop::collection::vec(registry_op(), 0..40),
        ) {
            let mut registry = fixture_registry(entity_type);
            for op in &ops {
                apply_op(&mut registry, op);
                assert_invariants(&registry)?;
            }
        }

        #[test]
        fn test_failed_op_leaves_registry_unchanged(
            entity_type in entity_type(),
            setup in prop::collection::vec(registry_op(), 0..20),
            op in registry_op(),
        ) {
            let mut registry = fixture_registry(entity_type);
            for step in &setup {
                apply_op(&mut registry, step);
            }
            let before = snapshot(&registry);
            if !apply_op(&mut registry, &op) {
                prop_assert_eq!(snapshot(&registry), before);
            }
        }

        #[test]
        fn test_add_then_remove_round_trips(
            entity_type in entity_type(),
            grantee in grantee(),
            level in assignable_level(),
        ) {
            let mut registry = fixture_registry(entity_type);
            prop_assume!(!registry.contains(&grantee.reference()));

            let before = snapshot(&registry);
            let reference = grantee.reference();
            if registry.add_grant(grantee, level).is_ok() {
                registry.remove_grant(&reference).unwrap();
                prop_assert_eq!(snapshot(&registry), before);
            }
        }

        #[test]
        fn test_change_is_idempotent(
            entity_type in entity_type(),
            grantee in grantee(),
            level in assignable_level(),
            new_level in assignable_level(),
        ) {
            let mut registry = fixture_registry(entity_type);
            let reference = grantee.reference();
            let _ = registry.add_grant(grantee, level);
            prop_assume!(registry.contains(&reference) && !registry.get(&reference).is_some_and(Grant::is_owner));

            registry.change_access_level(&reference, new_level).unwrap();
            let once = snapshot(&registry);
            registry.change_access_level(&reference, new_level).unwrap();
            prop_assert_eq!(snapshot(&registry), once);
        }

        #[test]
        fn test_duplicate_add_is_rejected(
            entity_type in entity_type(),
            grantee in grantee(),
            level in assignable_level(),
            again in assignable_level(),
        ) {
            let mut registry = fixture_registry(entity_type);
            let _ = registry.add_grant(grantee.clone(), level);
            prop_assume!(registry.contains(&grantee.reference()));

            let before = snapshot(&registry);
            let result = registry.add_grant(grantee, again);
            prop_assert!(matches!(result, Err(PermsError::DuplicateGrantee(_))));
            prop_assert_eq!(snapshot(&registry), before);
        }

        #[test]
        fn test_owner_level_never_granted(
            entity_type in entity_type(),
            grantee in grantee(),
        ) {
            let mut registry = fixture_registry(entity_type);
            let result = registry.add_grant(grantee, AccessLevel::Owner);
            let is_invalid_level = matches!(result, Err(PermsError::InvalidAccessLevel { .. }));
            prop_assert!(is_invalid_level);
        }

        #[test]
        fn test_member_removal_depends_on_pattern(member in "[23]") {
            let reference = GranteeRef::party(member.as_str());

            let mut open = fixture_registry("Conversation");
            let is_immutable = matches!(
                open.remove_grant(&reference),
                Err(PermsError::MembershipImmutable(_))
            );
            prop_assert!(is_immutable);

            let project = fixtures::project();
            let owner = fixture_registry("Project").owner().clone();
            let grant = Grant::new(
                &project.reference(),
                reference.clone(),
                AccessLevel::Editor,
                fixtures::owner(),
                0,
            )
            .with_grantee_scope(GranteeScope::TenantMembers);
            let mut confidential = GrantRegistry::restore(
                project,
                &SharingPolicy::default(),
                fixtures::owner(),
                vec![owner, grant],
            )
            .unwrap();
            prop_assert!(confidential.remove_grant(&reference).is_ok());
            prop_assert!(!confidential.contains(&reference));
        }
    }
}
