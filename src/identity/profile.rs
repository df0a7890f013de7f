use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Parent,
    Admin,
    Registrar,
    Finance,
}

impl Role {
    pub const ALL: [Role; 6] = [Role::Student, Role::Teacher, Role::Parent, Role::Admin, Role::Registrar, Role::Finance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Admin => "admin",
            Role::Registrar => "registrar",
            Role::Finance => "finance",
        }
    }

    /// Human label used in headers and listings.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
            Role::Parent => "Parent",
            Role::Admin => "Administrator",
            Role::Registrar => "Registrar",
            Role::Finance => "Finance Officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientError::decode(format!("unknown role '{}'", s)))
    }
}

/// Read-only snapshot of the signed-in user, taken once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

/// Profile as the backend sends it; names are split and may be blank.
#[derive(Debug, Deserialize)]
struct ProfileWire {
    id: i64,
    username: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    role: Role,
}

impl UserProfile {
    /// Build a profile from a backend payload. `display_name` falls back to
    /// "first last", then to the username.
    pub fn from_wire(v: Value) -> ClientResult<Self> {
        let w: ProfileWire = serde_json::from_value(v).map_err(|e| ClientError::decode(format!("user profile: {}", e)))?;
        let explicit = w.display_name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let joined = [w.first_name.as_deref(), w.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let display_name = explicit.unwrap_or_else(|| if joined.is_empty() { w.username.clone() } else { joined });
        Ok(Self { id: w.id, username: w.username, display_name, role: w.role })
    }
}
