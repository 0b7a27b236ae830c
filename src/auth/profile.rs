//! User profile snapshot and platform roles.
//!
//! The profile is cached next to the credential pair so route guards
//! and the forced-logout redirect can read the role without a network
//! round trip. The cached role is not cryptographically tied to the
//! token; the server re-authorizes every request.

use serde::{Deserialize, Serialize};

/// Platform role. Determines which dashboard surface a user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Creator,
    Business,
    Admin,
}

impl Role {
    /// Parse a role string as the API or an older store entry wrote it.
    /// Tolerates case differences and a couple of legacy spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" | "learner" => Some(Role::Student),
            "creator" | "instructor" => Some(Role::Creator),
            "business" | "tenant" => Some(Role::Business),
            "admin" | "administrator" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Creator => "creator",
            Role::Business => "business",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached snapshot of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Secondary roles, for accounts that hold more than one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Whether the account carries the given role, primary or secondary.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
            || self
                .roles
                .as_ref()
                .map(|rs| rs.contains(&role))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("creator"), Some(Role::Creator));
        assert_eq!(Role::parse("Creator"), Some(Role::Creator));
        assert_eq!(Role::parse("instructor"), Some(Role::Creator));
        assert_eq!(Role::parse(" admin "), Some(Role::Admin));
        assert_eq!(Role::parse("learner"), Some(Role::Student));
        assert_eq!(Role::parse("tenant"), Some(Role::Business));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_profile_parses_wire_format() {
        let json = r#"{
            "id": "u_42",
            "name": "Ada Example",
            "email": "ada@example.com",
            "role": "business",
            "roles": ["business", "creator"],
            "avatarUrl": "https://cdn.skillbridge.io/a/42.png"
        }"#;

        let profile: UserProfile = serde_json::from_str(json).expect("profile should parse");
        assert_eq!(profile.role, Role::Business);
        assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn.skillbridge.io/a/42.png"));
        assert!(profile.has_role(Role::Creator));
        assert!(!profile.has_role(Role::Admin));
    }

    #[test]
    fn test_profile_optional_fields_absent() {
        let json = r#"{"id": "u_1", "name": "B", "email": "b@x.io", "role": "student"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("profile should parse");
        assert!(profile.roles.is_none());
        assert!(profile.avatar_url.is_none());
        assert!(profile.has_role(Role::Student));
    }

    #[test]
    fn test_role_round_trips_through_serde() {
        let json = serde_json::to_string(&Role::Admin).expect("serialize");
        assert_eq!(json, "\"admin\"");
        let back: Role = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Role::Admin);
    }
}
