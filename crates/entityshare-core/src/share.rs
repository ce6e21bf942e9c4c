//! The grant record (EntityShare).
//!
//! A [`Grant`] binds one grantee to one access level on one entity. Its
//! [`ShareId`] is derived from `(shareableType, shareableId, granteeType,
//! granteeId)`, so repeated writes of the same grant land on the same key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::access::AccessLevel;
use crate::entity::ShareableRef;
use crate::error::CoreError;
use crate::party::GranteeRef;
use crate::types::{EntityId, PartyId};

/// Domain separator for share id derivation.
const SHARE_ID_DOMAIN: &[u8] = b"entityshare-grant-v0:";

/// Prefix of the pseudo-party id carried by public-link grants.
const PUBLIC_LINK_PREFIX: &str = "public-link:";

/// A 32-byte grant identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShareId(pub [u8; 32]);

impl ShareId {
    /// Derive the id of the grant for `grantee` on `shareable`.
    pub fn derive(shareable: &ShareableRef, grantee: &GranteeRef) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(SHARE_ID_DOMAIN);
        hasher.update(shareable.shareable_type.as_bytes());
        hasher.update(b":");
        hasher.update(shareable.shareable_id.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(grantee.grantee_type().as_str().as_bytes());
        hasher.update(b":");
        hasher.update(grantee.id().as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for ShareId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Random token behind a public link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkToken(String);

impl LinkToken {
    /// Generate a fresh 128-bit token.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The pseudo-party a public-link grant is keyed by. Party ids starting
    /// with `public-link:` are reserved for these.
    pub fn grantee_ref(&self) -> GranteeRef {
        GranteeRef::Party(PartyId::new(format!("{PUBLIC_LINK_PREFIX}{}", self.0)))
    }

    /// Whether `grantee` lies in the reserved public-link namespace.
    pub fn is_link_ref(grantee: &GranteeRef) -> bool {
        matches!(grantee, GranteeRef::Party(id) if id.as_str().starts_with(PUBLIC_LINK_PREFIX))
    }
}

impl fmt::Display for LinkToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the grantee came to hold the grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranteeScope {
    /// Explicitly granted to this grantee.
    Specific,
    /// Implicit grant to a member of the tenant.
    TenantMembers,
    /// Inherited from a parent entity.
    FromParent,
    /// Anyone holding the link.
    PublicLink,
    /// Computed membership.
    Dynamic,
}

impl GranteeScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            GranteeScope::Specific => "specific",
            GranteeScope::TenantMembers => "tenant_members",
            GranteeScope::FromParent => "from_parent",
            GranteeScope::PublicLink => "public_link",
            GranteeScope::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for GranteeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GranteeScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specific" => Ok(GranteeScope::Specific),
            "tenant_members" => Ok(GranteeScope::TenantMembers),
            "from_parent" => Ok(GranteeScope::FromParent),
            "public_link" => Ok(GranteeScope::PublicLink),
            "dynamic" => Ok(GranteeScope::Dynamic),
            other => Err(CoreError::UnknownGranteeScope(other.to_string())),
        }
    }
}

/// What the grant covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareScope {
    /// One entity instance.
    Instance,
    /// Every entity of a type.
    Class,
    Dynamic,
}

/// Provenance: who created the grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedBy {
    pub id: PartyId,
    pub name: String,
}

impl GrantedBy {
    pub fn new(id: impl Into<PartyId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Optional grant metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantMetadata {
    /// Unix milliseconds after which the grant no longer applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Note sent along with the invitation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_link_token: Option<LinkToken>,
}

/// One EntityShare record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: ShareId,

    pub shareable_type: String,

    pub shareable_id: EntityId,

    pub share_scope: ShareScope,

    /// `(granteeType, granteeId)`.
    pub grantee: GranteeRef,

    pub grantee_scope: GranteeScope,

    pub access_level: AccessLevel,

    pub can_reshare: bool,

    /// The grantee is a guest from outside the tenant.
    #[serde(default)]
    pub is_external: bool,

    pub granted_by: GrantedBy,

    /// Unix milliseconds.
    pub created_at: i64,

    #[serde(default)]
    pub metadata: GrantMetadata,
}

impl Grant {
    /// Create a specific, instance-scoped grant.
    pub fn new(
        shareable: &ShareableRef,
        grantee: GranteeRef,
        access_level: AccessLevel,
        granted_by: GrantedBy,
        created_at: i64,
    ) -> Self {
        Self {
            id: ShareId::derive(shareable, &grantee),
            shareable_type: shareable.shareable_type.clone(),
            shareable_id: shareable.shareable_id.clone(),
            share_scope: ShareScope::Instance,
            grantee,
            grantee_scope: GranteeScope::Specific,
            access_level,
            can_reshare: false,
            is_external: false,
            granted_by,
            created_at,
            metadata: GrantMetadata::default(),
        }
    }

    pub fn with_grantee_scope(mut self, scope: GranteeScope) -> Self {
        self.grantee_scope = scope;
        self
    }

    pub fn with_can_reshare(mut self, can_reshare: bool) -> Self {
        self.can_reshare = can_reshare;
        self
    }

    pub fn with_external(mut self, is_external: bool) -> Self {
        self.is_external = is_external;
        self
    }

    pub fn with_metadata(mut self, metadata: GrantMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The entity this grant applies to.
    pub fn shareable(&self) -> ShareableRef {
        ShareableRef::new(self.shareable_type.clone(), self.shareable_id.clone())
    }

    pub fn is_owner(&self) -> bool {
        self.access_level == AccessLevel::Owner
    }

    pub fn is_tenant_member(&self) -> bool {
        self.grantee_scope == GranteeScope::TenantMembers
    }

    pub fn is_public_link(&self) -> bool {
        self.grantee_scope == GranteeScope::PublicLink
    }

    /// Whether the grant has passed its expiration at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.metadata.expires_at, Some(expires) if now > expires)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ShareableRef {
        ShareableRef::new("Project", "proj-1")
    }

    #[test]
    fn test_share_id_is_deterministic() {
        let a = ShareId::derive(&project(), &GranteeRef::party("2"));
        let b = ShareId::derive(&project(), &GranteeRef::party("2"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_share_id_separates_grantee_types() {
        let party = ShareId::derive(&project(), &GranteeRef::party("2"));
        let role = ShareId::derive(&project(), &GranteeRef::role("2"));
        let other_entity =
            ShareId::derive(&ShareableRef::new("File", "proj-1"), &GranteeRef::party("2"));
        assert_ne!(party, role);
        assert_ne!(party, other_entity);
    }

    #[test]
    fn test_share_id_hex() {
        let id = ShareId::derive(&project(), &GranteeRef::party("2"));
        assert_eq!(ShareId::from_hex(&id.to_hex()).unwrap(), id);
        assert!(ShareId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_grant_cbor_roundtrip_preserves_metadata() {
        let token = LinkToken::generate();
        let grant = Grant::new(
            &project(),
            token.grantee_ref(),
            AccessLevel::Viewer,
            GrantedBy::new("1", "Russell Holmes"),
            1_700_000_000_000,
        )
        .with_grantee_scope(GranteeScope::PublicLink)
        .with_metadata(GrantMetadata {
            expires_at: Some(1_800_000_000_000),
            message: None,
            public_link_token: Some(token),
        });

        let recovered = Grant::from_bytes(&grant.to_bytes().unwrap()).unwrap();
        assert_eq!(grant, recovered);
        assert!(recovered.is_public_link());
    }

    #[test]
    fn test_grant_json_shape() {
        let grant = Grant::new(
            &project(),
            GranteeRef::role("role-1"),
            AccessLevel::Editor,
            GrantedBy::new("1", "Russell Holmes"),
            0,
        );
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["grantee"]["granteeType"], "SecurityRole");
        assert_eq!(json["grantee"]["granteeId"], "role-1");
        assert_eq!(json["accessLevel"], "editor");
        assert_eq!(json["granteeScope"], "specific");
    }

    #[test]
    fn test_expiration() {
        let grant = Grant::new(
            &project(),
            GranteeRef::party("2"),
            AccessLevel::Viewer,
            GrantedBy::new("1", "Owner"),
            0,
        )
        .with_metadata(GrantMetadata {
            expires_at: Some(1000),
            ..GrantMetadata::default()
        });

        assert!(!grant.is_expired(500));
        assert!(!grant.is_expired(1000));
        assert!(grant.is_expired(1001));
    }

    #[test]
    fn test_link_tokens_are_unique() {
        let a = LinkToken::generate();
        let b = LinkToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.grantee_ref().id().starts_with("public-link:"));
    }

    #[test]
    fn test_link_namespace() {
        let token = LinkToken::generate();
        assert!(LinkToken::is_link_ref(&token.grantee_ref()));
        assert!(LinkToken::is_link_ref(&GranteeRef::party("public-link:abc")));
        assert!(!LinkToken::is_link_ref(&GranteeRef::role("public-link:abc")));
        assert!(!LinkToken::is_link_ref(&GranteeRef::party("2")));
    }
}
