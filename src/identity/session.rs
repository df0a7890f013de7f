use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::profile::UserProfile;
use super::provider::{AuthProvider, LoginRequest, RegisteredAccount, RegistrationRequest};
use super::storage::{SessionStorage, TOKEN_KEY, USER_KEY};
use crate::error::{ClientError, ClientResult};

/// Token and profile travel together; there is no way to hold one without the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    inner: Option<(String, UserProfile)>,
}

impl Session {
    pub fn empty() -> Self { Self { inner: None } }

    /// `None` when the token is blank.
    pub fn new(token: impl Into<String>, user: UserProfile) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() { return None; }
        Some(Self { inner: Some((token, user)) })
    }

    pub fn token(&self) -> Option<&str> { self.inner.as_ref().map(|(t, _)| t.as_str()) }
    pub fn user(&self) -> Option<&UserProfile> { self.inner.as_ref().map(|(_, u)| u) }
    pub fn is_empty(&self) -> bool { self.inner.is_none() }
}

/// Owner of the current session. Shared as `Arc<SessionStore>` by the API client and router;
/// the session is only ever replaced wholesale.
pub struct SessionStore {
    state: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Start without reading persisted state.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { state: RwLock::new(Session::empty()), storage }
    }

    /// Rebuild the session persisted by a previous run. Anything missing, blank or
    /// unparseable yields an empty session; this never fails.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let session = read_persisted(storage.as_ref());
        match session.user() {
            Some(u) => info!(target: "sims::session", "restored session user={} role={}", u.username, u.role),
            None => debug!(target: "sims::session", "no persisted session"),
        }
        Self { state: RwLock::new(session), storage }
    }

    pub fn snapshot(&self) -> Session { self.state.read().clone() }
    pub fn token(&self) -> Option<String> { self.state.read().token().map(str::to_string) }
    pub fn user(&self) -> Option<UserProfile> { self.state.read().user().cloned() }

    /// Presence check only; the token is not validated against the server.
    pub fn is_authenticated(&self) -> bool { self.state.read().token().is_some() }

    /// Exchange credentials for a token and profile. The session is adopted only once both
    /// have been obtained; on any failure it is left as it was.
    pub async fn login<P: AuthProvider>(&self, provider: &P, username: &str, password: &str) -> ClientResult<UserProfile> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::auth("username and password are required"));
        }
        let req = LoginRequest { username: username.trim().to_string(), password: password.to_string() };
        let grant = provider.obtain_token(&req).await.map_err(as_login_failure)?;
        let user = match grant.user {
            Some(u) => u,
            None => provider.fetch_profile(&grant.access).await.map_err(as_login_failure)?,
        };
        let session = Session::new(grant.access, user.clone()).ok_or_else(|| ClientError::auth("Login failed"))?;
        self.replace(session);
        info!(target: "sims::session", "login ok user={} role={}", user.username, user.role);
        Ok(user)
    }

    /// Create an account. Credentials are not adopted: the caller routes to the login view.
    pub async fn register<P: AuthProvider>(&self, provider: &P, req: &RegistrationRequest) -> ClientResult<RegisteredAccount> {
        req.validate()?;
        let account = provider.register_account(req).await.map_err(|e| match e {
            ClientError::Network { .. } | ClientError::Auth { .. } => e,
            other => ClientError::auth(format!("Registration failed: {}", other.message())),
        })?;
        info!(target: "sims::session", "registered account id={} role={}", account.id, req.role);
        Ok(account)
    }

    /// Clear the session in memory and on disk. Returns whether there was anything to clear.
    pub fn logout(&self) -> bool {
        let had = !self.state.read().is_empty();
        self.replace(Session::empty());
        if had { info!(target: "sims::session", "logged out"); }
        had
    }

    fn replace(&self, next: Session) {
        *self.state.write() = next.clone();
        self.persist(&next);
    }

    /// Token and user are written in one storage call so a reload never pairs one account's
    /// token with another's profile. If the write fails, whatever was stored is dropped.
    fn persist(&self, snapshot: &Session) {
        let res = match (snapshot.token(), snapshot.user()) {
            (Some(token), Some(user)) => serde_json::to_string(user)
                .map_err(std::io::Error::other)
                .and_then(|json| self.storage.set_all(&[(USER_KEY, &json), (TOKEN_KEY, token)])),
            _ => self.storage.remove_all(&[TOKEN_KEY, USER_KEY]),
        };
        if let Err(e) = res {
            warn!(target: "sims::session", "failed to persist session snapshot: {}", e);
            if !snapshot.is_empty() {
                if let Err(e) = self.storage.remove_all(&[TOKEN_KEY, USER_KEY]) {
                    warn!(target: "sims::session", "failed to clear stale session snapshot: {}", e);
                }
            }
        }
    }
}

fn read_persisted(storage: &dyn SessionStorage) -> Session {
    let Some(token) = storage.get(TOKEN_KEY) else { return Session::empty() };
    let Some(raw_user) = storage.get(USER_KEY) else { return Session::empty() };
    match serde_json::from_str::<UserProfile>(&raw_user) {
        Ok(user) => Session::new(token, user).unwrap_or_default(),
        Err(e) => {
            debug!(target: "sims::session", "discarding persisted user: {}", e);
            Session::empty()
        }
    }
}

fn as_login_failure(e: ClientError) -> ClientError {
    match e {
        ClientError::Network { .. } | ClientError::Auth { .. } => e,
        other => ClientError::auth(format!("Login failed: {}", other.message())),
    }
}
