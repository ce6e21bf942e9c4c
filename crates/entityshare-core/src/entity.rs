//! The object being shared.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::party::GranteeRef;
use crate::types::{EntityId, PartyId, TenantId};

/// A shareable entity. Immutable for the lifetime of a sharing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableEntity {
    pub id: EntityId,

    /// Entity type name, e.g. `Project` or `Conversation`. Selects the
    /// sharing pattern.
    #[serde(rename = "type")]
    pub entity_type: String,

    pub name: String,

    /// The creator; holds the single owner grant.
    pub owner_party_id: PartyId,

    pub tenant_id: TenantId,
}

impl ShareableEntity {
    pub fn new(
        id: impl Into<EntityId>,
        entity_type: impl Into<String>,
        name: impl Into<String>,
        owner_party_id: impl Into<PartyId>,
        tenant_id: impl Into<TenantId>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            name: name.into(),
            owner_party_id: owner_party_id.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// The storage key projection of this entity.
    pub fn reference(&self) -> ShareableRef {
        ShareableRef::new(self.entity_type.clone(), self.id.clone())
    }

    /// The grantee reference of the owner.
    pub fn owner_ref(&self) -> GranteeRef {
        GranteeRef::Party(self.owner_party_id.clone())
    }
}

/// `(shareableType, shareableId)`: identifies an entity across types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableRef {
    pub shareable_type: String,
    pub shareable_id: EntityId,
}

impl ShareableRef {
    pub fn new(shareable_type: impl Into<String>, shareable_id: impl Into<EntityId>) -> Self {
        Self {
            shareable_type: shareable_type.into(),
            shareable_id: shareable_id.into(),
        }
    }
}

impl fmt::Display for ShareableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shareable_type, self.shareable_id)
    }
}
