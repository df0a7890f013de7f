//!
//! REST API client
//! ---------------
//! Thin wrapper over `reqwest` for the school backend. It attaches the bearer token held by
//! the session store and folds every failure into `ClientError`:
//! - 401/403 clears the session and yields `AuthExpired`
//! - other non-2xx yields `Api { status, message }`
//! - no response at all yields `Network`
//!
//! Nothing is retried and nothing is cached; concurrent callers issue independent requests.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PortalConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::{AuthProvider, LoginRequest, RegisteredAccount, RegistrationRequest, SessionStore, TokenGrant, UserProfile};

pub mod advisor;
pub mod envelope;

pub use advisor::{AdvisorExchange, Conversation, ConversationMessage};
pub use envelope::Page;

pub const TOKEN_PATH: &str = "/auth/token/";
pub const REGISTER_PATH: &str = "/users/register/";
pub const PROFILE_PATH: &str = "/users/profile/";

/// Where views get their data from. `ApiClient` is the real implementation.
#[allow(async_fn_in_trait)]
pub trait ResourceSource {
    async fn fetch(&self, path: &str) -> ClientResult<Value>;
}

#[derive(Clone)]
pub struct ApiClient {
    config: PortalConfig,
    client: reqwest::Client,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: &PortalConfig, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config: config.clone(), client, session })
    }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    pub fn base(&self) -> &Url { &self.config.api_base }

    /// Issue an authenticated JSON request and return the parsed 2xx body.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let token = self.session.token();
        let result = match self.send(method.clone(), path, body, token.as_deref()).await {
            Ok((status, bytes)) => classify_response(status, &bytes),
            Err(e) => Err(e),
        };
        if let Err(ClientError::AuthExpired) = &result {
            warn!(target: "sims::api", "{} {} rejected our credentials; clearing session", method, path);
            self.session.logout();
        }
        result
    }

    pub async fn get(&self, path: &str) -> ClientResult<Value> { self.request(Method::GET, path, None).await }
    pub async fn post(&self, path: &str, body: &Value) -> ClientResult<Value> { self.request(Method::POST, path, Some(body)).await }
    pub async fn put(&self, path: &str, body: &Value) -> ClientResult<Value> { self.request(Method::PUT, path, Some(body)).await }
    pub async fn delete(&self, path: &str) -> ClientResult<Value> { self.request(Method::DELETE, path, None).await }

    /// GET a list endpoint and normalise it into a `Page`.
    pub async fn get_page(&self, path: &str) -> ClientResult<Page> { Page::from_value(self.get(path).await?) }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.config.endpoint(path).map_err(|e| ClientError::invalid(format!("{:#}", e)))
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>, bearer: Option<&str>) -> ClientResult<(u16, Vec<u8>)> {
        let url = self.endpoint(path)?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(tok) = bearer {
            headers.insert(AUTHORIZATION, bearer_header(tok)?);
        }
        debug!(target: "sims::api", "{} {} auth={}", method, url, bearer.is_some());
        let mut req = self.client.request(method, url).headers(headers);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(|e| ClientError::network(e.to_string()))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| ClientError::network(e.to_string()))?;
        debug!(target: "sims::api", "{} <- {} ({} bytes)", path, status, bytes.len());
        Ok((status, bytes.to_vec()))
    }
}

/// A token that cannot be carried in a header is as good as revoked.
fn bearer_header(token: &str) -> ClientResult<HeaderValue> {
    let mut hv = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| ClientError::AuthExpired)?;
    // keeps the token out of Debug output and lets HTTP/2 skip header compression for it
    hv.set_sensitive(true);
    Ok(hv)
}

impl ResourceSource for ApiClient {
    async fn fetch(&self, path: &str) -> ClientResult<Value> { self.get(path).await }
}

impl AuthProvider for ApiClient {
    async fn obtain_token(&self, req: &LoginRequest) -> ClientResult<TokenGrant> {
        let body = serde_json::to_value(req).map_err(|e| ClientError::auth(e.to_string()))?;
        let (status, bytes) = self.send(Method::POST, TOKEN_PATH, Some(&body), None).await?;
        if !is_success(status) {
            return Err(ClientError::auth(extract_message(&bytes).unwrap_or_else(|| "Login failed".to_string())));
        }
        let v: Value = serde_json::from_slice(&bytes).map_err(|_| ClientError::auth("Login failed: malformed response"))?;
        TokenGrant::from_wire(v)
    }

    async fn fetch_profile(&self, token: &str) -> ClientResult<UserProfile> {
        // a fresh token is not yet the session's, so a 401 here must not log anyone out
        let (status, bytes) = self.send(Method::GET, PROFILE_PATH, None, Some(token)).await?;
        if !is_success(status) {
            return Err(ClientError::api(status, extract_message(&bytes).unwrap_or_else(|| fallback_message(status))));
        }
        let v: Value = serde_json::from_slice(&bytes).map_err(|e| ClientError::decode(format!("user profile: {}", e)))?;
        UserProfile::from_wire(v)
    }

    async fn register_account(&self, req: &RegistrationRequest) -> ClientResult<RegisteredAccount> {
        let body = serde_json::to_value(req).map_err(|e| ClientError::auth(e.to_string()))?;
        let (status, bytes) = self.send(Method::POST, REGISTER_PATH, Some(&body), None).await?;
        if !is_success(status) {
            return Err(ClientError::auth(extract_message(&bytes).unwrap_or_else(|| "Registration failed".to_string())));
        }
        serde_json::from_slice(&bytes).map_err(|_| ClientError::auth("Registration failed: malformed response"))
    }
}

fn is_success(status: u16) -> bool { (200..300).contains(&status) }

fn fallback_message(status: u16) -> String { format!("Request failed with status {}", status) }

/// Map a raw HTTP answer onto the client's error taxonomy.
/// An empty 2xx body (e.g. 204 after DELETE) decodes as JSON `null`.
pub fn classify_response(status: u16, body: &[u8]) -> ClientResult<Value> {
    if is_success(status) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(body).map_err(|e| ClientError::decode(format!("invalid JSON body: {}", e)));
    }
    if status == 401 || status == 403 {
        return Err(ClientError::AuthExpired);
    }
    Err(ClientError::api(status, extract_message(body).unwrap_or_else(|| fallback_message(status))))
}

/// Pull a human message out of a conventional error body: `detail`, `error`, `message`,
/// `non_field_errors[0]`, then the first field error as `field: msg`.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let v: Value = serde_json::from_slice(body).ok()?;
    let obj = v.as_object()?;
    for key in ["detail", "error", "message"] {
        if let Some(s) = obj.get(key).and_then(first_text) {
            return Some(s);
        }
    }
    if let Some(s) = obj.get("non_field_errors").and_then(first_text) {
        return Some(s);
    }
    obj.iter().find_map(|(field, val)| first_text(val).map(|msg| format!("{}: {}", field, msg)))
}

fn first_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
