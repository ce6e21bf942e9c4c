//! Sharing-pattern policy.
//!
//! Every entity type maps to one of two patterns, and each pattern is a row
//! of [`PatternRules`]. The registry consults the row for every mutation;
//! there is no per-entity-type code path.
//!
//! | Rule | Confidential | Open collaboration |
//! |------|--------------|--------------------|
//! | Implicit tenant members | none | `editor` |
//! | Members removable | n/a | no |
//! | Explicit party additions | anyone | external guests only |
//! | Role grants | yes | no |
//! | Public links | yes | no |
//! | Expiring grants | yes | no |
//! | Level needed to manage | `full_access` | `editor` |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use entityshare_core::AccessLevel;

use crate::error::{PermsError, Result};

/// The two sharing patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingPattern {
    /// Private by default; explicit grants required.
    Confidential,
    /// Visible to all tenant members; explicit grants only for guests.
    OpenCollaboration,
}

impl fmt::Display for SharingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharingPattern::Confidential => f.write_str("confidential"),
            SharingPattern::OpenCollaboration => f.write_str("open collaboration"),
        }
    }
}

/// What a sharing pattern permits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRules {
    /// Levels that may be granted or assigned. Never contains `owner`.
    pub assignable_levels: Vec<AccessLevel>,

    /// Minimum level the acting party needs to mutate grants.
    pub manage_level: AccessLevel,

    /// Baseline level every tenant member receives implicitly, if any.
    #[serde(default)]
    pub implicit_member_level: Option<AccessLevel>,

    /// Whether tenant-member grants may be removed individually.
    pub members_removable: bool,

    /// Whether explicitly added parties must be external guests.
    pub external_only: bool,

    pub allow_role_grants: bool,

    pub allow_public_links: bool,

    pub allow_expiration: bool,

    /// Level given to invited guests.
    pub guest_level: AccessLevel,
}

impl PatternRules {
    /// Rules for private-by-default entities (projects, files).
    pub fn confidential() -> Self {
        Self {
            assignable_levels: AccessLevel::ASSIGNABLE.to_vec(),
            manage_level: AccessLevel::FullAccess,
            implicit_member_level: None,
            members_removable: true,
            external_only: false,
            allow_role_grants: true,
            allow_public_links: true,
            allow_expiration: true,
            guest_level: AccessLevel::Viewer,
        }
    }

    /// Rules for tenant-visible entities (conversations).
    pub fn open_collaboration() -> Self {
        Self {
            assignable_levels: AccessLevel::ASSIGNABLE.to_vec(),
            manage_level: AccessLevel::Editor,
            implicit_member_level: Some(AccessLevel::Editor),
            members_removable: false,
            external_only: true,
            allow_role_grants: false,
            allow_public_links: false,
            allow_expiration: false,
            guest_level: AccessLevel::Viewer,
        }
    }

    /// Whether `level` may be handed out under these rules.
    pub fn allows_level(&self, level: AccessLevel) -> bool {
        level.is_assignable() && self.assignable_levels.contains(&level)
    }

    fn validate(&self, pattern: SharingPattern) -> Result<()> {
        if self.assignable_levels.is_empty() {
            return Err(PermsError::Policy(format!(
                "{pattern}: no assignable levels"
            )));
        }
        if self.assignable_levels.contains(&AccessLevel::Owner) {
            return Err(PermsError::Policy(format!(
                "{pattern}: owner cannot be assignable"
            )));
        }
        if let Some(level) = self.implicit_member_level {
            if !self.allows_level(level) {
                return Err(PermsError::Policy(format!(
                    "{pattern}: member level {level} is not assignable"
                )));
            }
        }
        if !self.allows_level(self.guest_level) {
            return Err(PermsError::Policy(format!(
                "{pattern}: guest level {} is not assignable",
                self.guest_level
            )));
        }
        Ok(())
    }
}

/// The policy table: pattern rules plus the entity-type mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingPolicy {
    pub confidential: PatternRules,

    pub open_collaboration: PatternRules,

    /// Entity type name to pattern.
    #[serde(default)]
    pub entity_types: BTreeMap<String, SharingPattern>,

    /// Pattern for entity types missing from `entity_types`.
    pub default_pattern: SharingPattern,
}

impl Default for SharingPolicy {
    fn default() -> Self {
        let entity_types = [
            ("Project", SharingPattern::Confidential),
            ("File", SharingPattern::Confidential),
            ("Conversation", SharingPattern::OpenCollaboration),
            ("LlmConversation", SharingPattern::OpenCollaboration),
        ]
        .into_iter()
        .map(|(name, pattern)| (name.to_string(), pattern))
        .collect();

        Self {
            confidential: PatternRules::confidential(),
            open_collaboration: PatternRules::open_collaboration(),
            entity_types,
            default_pattern: SharingPattern::Confidential,
        }
    }
}

impl SharingPolicy {
    /// Map an entity type to a pattern.
    pub fn with_entity_type(mut self, entity_type: impl Into<String>, pattern: SharingPattern) -> Self {
        self.entity_types.insert(entity_type.into(), pattern);
        self
    }

    pub fn pattern_for(&self, entity_type: &str) -> SharingPattern {
        self.entity_types
            .get(entity_type)
            .copied()
            .unwrap_or(self.default_pattern)
    }

    pub fn rules(&self, pattern: SharingPattern) -> &PatternRules {
        match pattern {
            SharingPattern::Confidential => &self.confidential,
            SharingPattern::OpenCollaboration => &self.open_collaboration,
        }
    }

    pub fn rules_for(&self, entity_type: &str) -> &PatternRules {
        self.rules(self.pattern_for(entity_type))
    }

    /// Check every row for internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.confidential.validate(SharingPattern::Confidential)?;
        self.open_collaboration
            .validate(SharingPattern::OpenCollaboration)
    }

    /// Load and validate a policy table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self =
            serde_json::from_str(json).map_err(|e| PermsError::Policy(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PermsError::Policy(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let policy = SharingPolicy::default();
        assert_eq!(policy.pattern_for("Project"), SharingPattern::Confidential);
        assert_eq!(policy.pattern_for("File"), SharingPattern::Confidential);
        assert_eq!(
            policy.pattern_for("Conversation"),
            SharingPattern::OpenCollaboration
        );
        assert_eq!(policy.pattern_for("Spreadsheet"), SharingPattern::Confidential);
    }

    #[test]
    fn test_owner_never_allowed() {
        let policy = SharingPolicy::default();
        assert!(!policy.confidential.allows_level(AccessLevel::Owner));
        assert!(!policy.open_collaboration.allows_level(AccessLevel::Owner));
    }

    #[test]
    fn test_json_roundtrip_keeps_table() {
        let policy = SharingPolicy::default().with_entity_type("Board", SharingPattern::OpenCollaboration);
        let json = policy.to_json().unwrap();
        let loaded = SharingPolicy::from_json(&json).unwrap();
        assert_eq!(loaded, policy);
        assert_eq!(loaded.pattern_for("Board"), SharingPattern::OpenCollaboration);
    }

    #[test]
    fn test_json_rejects_assignable_owner() {
        let mut policy = SharingPolicy::default();
        policy.confidential.assignable_levels.push(AccessLevel::Owner);
        let json = serde_json::to_string(&policy).unwrap();
        assert!(matches!(
            SharingPolicy::from_json(&json),
            Err(PermsError::Policy(_))
        ));
    }

    #[test]
    fn test_json_rejects_unassignable_member_level() {
        let mut policy = SharingPolicy::default();
        policy.open_collaboration.assignable_levels = vec![AccessLevel::Viewer];
        let json = serde_json::to_string(&policy).unwrap();
        assert!(SharingPolicy::from_json(&json).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SharingPolicy::from_json("{not json"),
            Err(PermsError::Policy(_))
        ));
    }
}
