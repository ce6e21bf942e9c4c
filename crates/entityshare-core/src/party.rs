//! Grantees: parties (individuals and teams) and security roles.
//!
//! A grant targets exactly one grantee. [`GranteeRef`] is the tagged key the
//! registry indexes by; a party and a role with the same raw id are distinct
//! grantees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{PartyId, RoleId};

/// Whether a party is a single person or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyKind {
    /// A user.
    Individual,
    /// A team.
    Organization,
}

/// A grantable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: PartyId,

    #[serde(rename = "type")]
    pub kind: PartyKind,

    pub name: String,

    /// Only meaningful for individuals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Outside the tenant (a guest).
    #[serde(default)]
    pub is_external: bool,
}

impl Party {
    /// Create an individual.
    pub fn individual(id: impl Into<PartyId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: PartyKind::Individual,
            name: name.into(),
            email: None,
            avatar_url: None,
            is_external: false,
        }
    }

    /// Create a team.
    pub fn organization(id: impl Into<PartyId>, name: impl Into<String>) -> Self {
        Self {
            kind: PartyKind::Organization,
            ..Self::individual(id, name)
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Mark this party as external to the tenant.
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    pub fn is_individual(&self) -> bool {
        self.kind == PartyKind::Individual
    }

    pub fn is_team(&self) -> bool {
        self.kind == PartyKind::Organization
    }

    /// The tagged reference to this party.
    pub fn reference(&self) -> GranteeRef {
        GranteeRef::Party(self.id.clone())
    }
}

/// A functional-authority grantee, distinct from any party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRole {
    pub id: RoleId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityRole {
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The tagged reference to this role.
    pub fn reference(&self) -> GranteeRef {
        GranteeRef::Role(self.id.clone())
    }
}

/// Discriminant of a grantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GranteeType {
    Party,
    SecurityRole,
}

impl GranteeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            GranteeType::Party => "Party",
            GranteeType::SecurityRole => "SecurityRole",
        }
    }
}

impl fmt::Display for GranteeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GranteeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Party" => Ok(GranteeType::Party),
            "SecurityRole" => Ok(GranteeType::SecurityRole),
            other => Err(CoreError::UnknownGranteeType(other.to_string())),
        }
    }
}

/// Tagged reference to a grantee: `(granteeType, granteeId)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "granteeType", content = "granteeId")]
pub enum GranteeRef {
    #[serde(rename = "Party")]
    Party(PartyId),
    #[serde(rename = "SecurityRole")]
    Role(RoleId),
}

impl GranteeRef {
    /// Build a reference from its discriminant and raw id.
    pub fn new(grantee_type: GranteeType, id: impl Into<String>) -> Self {
        match grantee_type {
            GranteeType::Party => GranteeRef::Party(PartyId::new(id)),
            GranteeType::SecurityRole => GranteeRef::Role(RoleId::new(id)),
        }
    }

    pub fn party(id: impl Into<PartyId>) -> Self {
        GranteeRef::Party(id.into())
    }

    pub fn role(id: impl Into<RoleId>) -> Self {
        GranteeRef::Role(id.into())
    }

    pub fn grantee_type(&self) -> GranteeType {
        match self {
            GranteeRef::Party(_) => GranteeType::Party,
            GranteeRef::Role(_) => GranteeType::SecurityRole,
        }
    }

    /// The raw id, without its discriminant.
    pub fn id(&self) -> &str {
        match self {
            GranteeRef::Party(id) => id.as_str(),
            GranteeRef::Role(id) => id.as_str(),
        }
    }

    pub fn is_party(&self, id: &PartyId) -> bool {
        matches!(self, GranteeRef::Party(p) if p == id)
    }
}

impl fmt::Display for GranteeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.grantee_type(), self.id())
    }
}

/// A resolved grantee, as returned by directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "granteeType")]
pub enum Grantee {
    Party(Party),
    #[serde(rename = "SecurityRole")]
    Role(SecurityRole),
}

impl Grantee {
    pub fn reference(&self) -> GranteeRef {
        match self {
            Grantee::Party(party) => party.reference(),
            Grantee::Role(role) => role.reference(),
        }
    }

    pub fn grantee_type(&self) -> GranteeType {
        match self {
            Grantee::Party(_) => GranteeType::Party,
            Grantee::Role(_) => GranteeType::SecurityRole,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Grantee::Party(party) => &party.name,
            Grantee::Role(role) => &role.name,
        }
    }

    /// Roles are never external.
    pub fn is_external(&self) -> bool {
        matches!(self, Grantee::Party(party) if party.is_external)
    }
}

impl From<Party> for Grantee {
    fn from(party: Party) -> Self {
        Grantee::Party(party)
    }
}

impl From<SecurityRole> for Grantee {
    fn from(role: SecurityRole) -> Self {
        Grantee::Role(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_and_role_with_same_id_are_distinct() {
        let party = GranteeRef::party("7");
        let role = GranteeRef::role("7");
        assert_ne!(party, role);
        assert_eq!(party.id(), role.id());
    }

    #[test]
    fn test_grantee_ref_json_shape() {
        let json = serde_json::to_value(GranteeRef::role("role-1")).unwrap();
        assert_eq!(json["granteeType"], "SecurityRole");
        assert_eq!(json["granteeId"], "role-1");
    }

    #[test]
    fn test_grantee_ref_from_type() {
        let r = GranteeRef::new(GranteeType::Party, "2");
        assert_eq!(r, GranteeRef::party("2"));
        assert_eq!(r.to_string(), "Party:2");
        assert_eq!("SecurityRole".parse::<GranteeType>().unwrap(), GranteeType::SecurityRole);
    }

    #[test]
    fn test_party_json_uses_type_field() {
        let team = Party::organization("5", "Engineering Team");
        let json = serde_json::to_value(&team).unwrap();
        assert_eq!(json["type"], "Organization");
        assert!(json.get("email").is_none());
        assert!(team.is_team());
    }

    #[test]
    fn test_grantee_external() {
        let guest: Grantee = Party::individual("9", "Guest").external().into();
        let role: Grantee = SecurityRole::new("role-1", "Finance Admin").into();
        assert!(guest.is_external());
        assert!(!role.is_external());
        assert_eq!(role.grantee_type(), GranteeType::SecurityRole);
    }
}
