use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Family roles. Stored and serialized as the upper-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleName {
    Parent,
    Child,
}

impl RoleName {
    pub const ALL: [RoleName; 2] = [RoleName::Parent, RoleName::Child];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Parent => "PARENT",
            RoleName::Child => "CHILD",
        }
    }

    /// Description written when the role is seeded.
    pub fn description(&self) -> &'static str {
        match self {
            RoleName::Parent => "Parent/Guardian - manages the family, creates tasks and rewards",
            RoleName::Child => "Child - completes missions, earns points and redeems rewards",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for RoleName {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARENT" => Ok(RoleName::Parent),
            "CHILD" => Ok(RoleName::Child),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// API Request/Response types for authentication

/// Body of `POST /auth/google-login`.
///
/// `token` is optional at the serde level so a missing field can be reported
/// as a validation error instead of a generic JSON rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub picture_url: Option<String>,
    pub role: RoleName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Session lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
