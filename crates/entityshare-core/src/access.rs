//! Access levels.
//!
//! Levels are totally ordered: `viewer < commenter < editor < full_access`.
//! `owner` sits above them all and is never assignable; it belongs to the
//! entity's creator alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The level of access a grant confers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Can view content.
    Viewer,
    /// Can view and comment.
    Commenter,
    /// Can view, comment, and edit.
    Editor,
    /// Can edit and share with others.
    FullAccess,
    /// The entity's creator. Not assignable.
    Owner,
}

impl AccessLevel {
    /// Every level a user may hand out, lowest first.
    pub const ASSIGNABLE: [AccessLevel; 4] = [
        AccessLevel::Viewer,
        AccessLevel::Commenter,
        AccessLevel::Editor,
        AccessLevel::FullAccess,
    ];

    /// Whether this level may be granted through normal operations.
    pub const fn is_assignable(self) -> bool {
        !matches!(self, AccessLevel::Owner)
    }

    /// Whether this level includes everything `other` allows.
    pub fn includes(self, other: AccessLevel) -> bool {
        self >= other
    }

    /// Wire name, as used in EntityShare records.
    pub const fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Viewer => "viewer",
            AccessLevel::Commenter => "commenter",
            AccessLevel::Editor => "editor",
            AccessLevel::FullAccess => "full_access",
            AccessLevel::Owner => "owner",
        }
    }

    /// Human-readable label for access pickers.
    pub const fn label(self) -> &'static str {
        match self {
            AccessLevel::Viewer => "Viewer",
            AccessLevel::Commenter => "Commenter",
            AccessLevel::Editor => "Editor",
            AccessLevel::FullAccess => "Full Access",
            AccessLevel::Owner => "Owner",
        }
    }

    /// One-line description of what the level allows.
    pub const fn description(self) -> &'static str {
        match self {
            AccessLevel::Viewer => "Can view content",
            AccessLevel::Commenter => "Can view and comment",
            AccessLevel::Editor => "Can view, comment, and edit",
            AccessLevel::FullAccess => "Can edit and share with others",
            AccessLevel::Owner => "Owns this item",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(AccessLevel::Viewer),
            "commenter" => Ok(AccessLevel::Commenter),
            "editor" => Ok(AccessLevel::Editor),
            "full_access" => Ok(AccessLevel::FullAccess),
            "owner" => Ok(AccessLevel::Owner),
            other => Err(CoreError::UnknownAccessLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(AccessLevel::Viewer < AccessLevel::Commenter);
        assert!(AccessLevel::Commenter < AccessLevel::Editor);
        assert!(AccessLevel::Editor < AccessLevel::FullAccess);
        assert!(AccessLevel::FullAccess < AccessLevel::Owner);
    }

    #[test]
    fn test_owner_not_assignable() {
        assert!(!AccessLevel::Owner.is_assignable());
        assert!(AccessLevel::ASSIGNABLE.iter().all(|l| l.is_assignable()));
        assert!(!AccessLevel::ASSIGNABLE.contains(&AccessLevel::Owner));
    }

    #[test]
    fn test_includes() {
        assert!(AccessLevel::Owner.includes(AccessLevel::FullAccess));
        assert!(AccessLevel::Editor.includes(AccessLevel::Editor));
        assert!(!AccessLevel::Viewer.includes(AccessLevel::Commenter));
    }

    #[test]
    fn test_wire_names_match_serde() {
        let json = serde_json::to_string(&AccessLevel::FullAccess).unwrap();
        assert_eq!(json, "\"full_access\"");
        assert_eq!("full_access".parse::<AccessLevel>().unwrap(), AccessLevel::FullAccess);
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(matches!(
            "admin".parse::<AccessLevel>(),
            Err(CoreError::UnknownAccessLevel(s)) if s == "admin"
        ));
    }
}
