//! Session Types
//!
//! The authenticated identity held by the console for the current login.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Role granted to a user by the fleet API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Rider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile returned on sign-in
///
/// Fields the console does not use are kept in `extra` so the profile
/// survives a save/restore cycle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role,
            extra: Map::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Credential token and profile, always held together
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub profile: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_role_to_rider() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id": "u7", "username": "bob"}"#).unwrap();
        assert_eq!(profile.role, Role::Rider);
        assert!(!profile.is_admin());
    }

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let json = r#"{"id":"u1","username":"alice","role":"admin","email":"a@example.com"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert!(profile.is_admin());
        assert_eq!(profile.extra["email"], "a@example.com");

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["email"], "a@example.com");
        assert_eq!(back["role"], "admin");
    }
}
