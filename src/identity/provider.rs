use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::profile::{Role, UserProfile};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Result of the token endpoint. Some backends embed the user next to the token,
/// which saves the profile round-trip.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access: String,
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    pub fn from_wire(v: Value) -> ClientResult<Self> {
        let access = v
            .get("access")
            .and_then(|a| a.as_str())
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ClientError::auth("Login failed: no access token in response"))?
            .to_string();
        let user = match v.get("user") {
            Some(u) if u.is_object() => Some(UserProfile::from_wire(u.clone()).map_err(|e| ClientError::auth(format!("Login failed: {}", e.message())))?),
            _ => None,
        };
        Ok(Self { access, user })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl RegistrationRequest {
    /// Self-service sign-up is limited to the roles the public form offers.
    pub const SELF_SERVICE_ROLES: [Role; 2] = [Role::Student, Role::Parent];

    pub fn validate(&self) -> ClientResult<()> {
        if self.username.trim().is_empty() || self.password.is_empty() || self.email.trim().is_empty() {
            return Err(ClientError::auth("Registration failed: username, email and password are required"));
        }
        if !Self::SELF_SERVICE_ROLES.contains(&self.role) {
            return Err(ClientError::auth(format!("Registration failed: role '{}' cannot self-register", self.role)));
        }
        Ok(())
    }
}

/// Confirmation returned by the registration endpoint. No credentials are issued.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredAccount {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// The credential round-trips the session store needs from the backend.
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    async fn obtain_token(&self, req: &LoginRequest) -> ClientResult<TokenGrant>;
    async fn fetch_profile(&self, token: &str) -> ClientResult<UserProfile>;
    async fn register_account(&self, req: &RegistrationRequest) -> ClientResult<RegisteredAccount>;
}
