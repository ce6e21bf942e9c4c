//! Directory lookup: resolving search text to candidate grantees.
//!
//! The registry never searches on its own; pickers ask a [`Directory`] for
//! candidates and pass the already-granted references as the exclusion list.

use crate::party::{Grantee, GranteeRef, Party, SecurityRole};

/// People, teams and roles that can be offered as grantees.
pub trait Directory {
    /// Parties whose name or email contains `query`, case-insensitively.
    fn search_parties(&self, query: &str, exclude: &[GranteeRef]) -> Vec<Party>;

    /// Roles whose name or description contains `query`, case-insensitively.
    fn search_roles(&self, query: &str, exclude: &[GranteeRef]) -> Vec<SecurityRole>;

    /// Look up a single grantee.
    fn resolve(&self, grantee: &GranteeRef) -> Option<Grantee>;

    /// Parties first, then roles.
    fn search(&self, query: &str, exclude: &[GranteeRef]) -> Vec<Grantee> {
        let mut found: Vec<Grantee> = self
            .search_parties(query, exclude)
            .into_iter()
            .map(Grantee::Party)
            .collect();
        found.extend(
            self.search_roles(query, exclude)
                .into_iter()
                .map(Grantee::Role),
        );
        found
    }
}

/// Split parties into `(individuals, teams)`, preserving order.
pub fn partition_parties(parties: Vec<Party>) -> (Vec<Party>, Vec<Party>) {
    parties.into_iter().partition(Party::is_individual)
}

/// A fixed, in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    parties: Vec<Party>,
    roles: Vec<SecurityRole>,
}

impl InMemoryDirectory {
    pub fn new(parties: Vec<Party>, roles: Vec<SecurityRole>) -> Self {
        Self { parties, roles }
    }

    pub fn with_party(mut self, party: Party) -> Self {
        self.parties.push(party);
        self
    }

    pub fn with_role(mut self, role: SecurityRole) -> Self {
        self.roles.push(role);
        self
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn roles(&self) -> &[SecurityRole] {
        &self.roles
    }
}

impl Directory for InMemoryDirectory {
    fn search_parties(&self, query: &str, exclude: &[GranteeRef]) -> Vec<Party> {
        let Some(needle) = normalize(query) else {
            return Vec::new();
        };

        self.parties
            .iter()
            .filter(|p| !exclude.contains(&p.reference()))
            .filter(|p| {
                contains(&p.name, &needle)
                    || p.email.as_deref().is_some_and(|e| contains(e, &needle))
            })
            .cloned()
            .collect()
    }

    fn search_roles(&self, query: &str, exclude: &[GranteeRef]) -> Vec<SecurityRole> {
        let Some(needle) = normalize(query) else {
            return Vec::new();
        };

        self.roles
            .iter()
            .filter(|r| !exclude.contains(&r.reference()))
            .filter(|r| {
                contains(&r.name, &needle)
                    || r.description.as_deref().is_some_and(|d| contains(d, &needle))
            })
            .cloned()
            .collect()
    }

    fn resolve(&self, grantee: &GranteeRef) -> Option<Grantee> {
        match grantee {
            GranteeRef::Party(id) => self
                .parties
                .iter()
                .find(|p| &p.id == id)
                .cloned()
                .map(Grantee::Party),
            GranteeRef::Role(id) => self
                .roles
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .map(Grantee::Role),
        }
    }
}

/// Lowercased query, or `None` when there is nothing to search for.
fn normalize(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
