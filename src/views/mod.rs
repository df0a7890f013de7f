//!
//! View renderers
//! --------------
//! A view is a pair of pure functions: which collection paths it needs for the current
//! params, and how to project the fetched pages into a `Display`. Nothing here touches the
//! network or a terminal, so every view can be exercised with canned JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::api::Page;
use crate::error::ClientError;
use crate::identity::UserProfile;

mod academic;
mod advisor;
mod portals;

pub type ViewParams = BTreeMap<String, Value>;

pub const HOME_VIEW: &str = "dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self { columns: columns.iter().map(|c| c.to_string()).collect(), rows: Vec::new() }
    }

    pub fn push(&mut self, row: Vec<String>) { self.rows.push(row); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub from_user: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Text(String),
    Table(Table),
    Cards(Vec<Card>),
    Alert { level: AlertLevel, text: String },
    Chat(Vec<ChatTurn>),
}

/// What a view hands back to the front-end: a title and an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub view: String,
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Display {
    pub fn new(view: &str, title: impl Into<String>) -> Self {
        Self { view: view.to_string(), title: title.into(), blocks: Vec::new() }
    }

    pub fn push(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn alerts(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Alert { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

pub struct ViewContext<'a> {
    pub user: &'a UserProfile,
    pub params: &'a ViewParams,
}

impl ViewContext<'_> {
    /// String form of a param; numbers are accepted too, since ids arrive either way.
    pub fn param(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

pub struct ViewSpec {
    pub key: &'static str,
    pub title: &'static str,
    pub sources: fn(&ViewContext) -> Vec<String>,
    pub project: fn(&ViewContext, &[Page]) -> Display,
}

const VIEWS: &[&ViewSpec] = &[
    &portals::DASHBOARD,
    &academic::STUDENTS,
    &academic::COURSES,
    &academic::GRADES,
    &academic::PAYMENTS,
    &academic::NOTIFICATIONS,
    &portals::CHILDREN,
    &portals::TEACHING,
    &academic::ENROLLMENTS,
    &academic::ATTENDANCE,
    &portals::ADMIN,
    &portals::REPORTS,
    &portals::USERS,
    &advisor::AI_ADVISOR,
];

pub fn lookup(key: &str) -> Option<&'static ViewSpec> {
    VIEWS.iter().copied().find(|v| v.key == key)
}

/// Renderer for `key`, or the home view when the key is unknown.
pub fn resolve(key: &str) -> &'static ViewSpec {
    lookup(key).unwrap_or(&portals::DASHBOARD)
}

pub fn keys() -> impl Iterator<Item = &'static str> { VIEWS.iter().map(|v| v.key) }

/// Inline presentation of a failed fetch; the view stays on screen with a message.
pub fn error_display(spec: &ViewSpec, err: &ClientError) -> Display {
    let text = match err {
        ClientError::Network { .. } => format!("Could not reach the server: {}", err.message()),
        ClientError::Api { status, message } => format!("The server refused this request ({}): {}", status, message),
        other => other.to_string(),
    };
    Display::new(spec.key, spec.title).push(Block::Alert { level: AlertLevel::Error, text })
}

// ---- shared projection helpers ----

pub(crate) fn field(rec: &Value, key: &str) -> String {
    match rec.get(key) {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric value of `key`; decimal strings such as `"5000.00"` count as numbers.
pub(crate) fn number(rec: &Value, key: &str) -> Option<f64> {
    match rec.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Mean of the numeric `key` over `records`, skipping those without one.
pub(crate) fn mean(records: &[Value], key: &str) -> Option<f64> {
    let vals: Vec<f64> = records.iter().filter_map(|r| number(r, key)).collect();
    (!vals.is_empty()).then(|| vals.iter().sum::<f64>() / vals.len() as f64)
}

pub(crate) fn field_or(rec: &Value, key: &str, fallback: &str) -> String {
    let v = field(rec, key);
    if v == "N/A" { fallback.to_string() } else { v }
}

/// `2024-12-15T08:30:00Z` or `2024-12-15` as `Dec 15, 2024`; anything else is passed through.
pub(crate) fn date(rec: &Value, key: &str) -> String {
    let raw = field(rec, key);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return dt.format("%b %d, %Y").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return d.format("%b %d, %Y").to_string();
    }
    raw
}

pub(crate) fn with_query(path: &str, pairs: &[(&str, Option<String>)]) -> String {
    let qs: Vec<String> = pairs
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={}", k, urlencoding::encode(v))))
        .collect();
    if qs.is_empty() { path.to_string() } else { format!("{}?{}", path, qs.join("&")) }
}

pub(crate) fn page_footer(page: &Page) -> Option<Block> {
    page.is_partial().then(|| Block::Text(format!("Showing {} of {}", page.len(), page.count)))
}

pub(crate) fn table_or_empty(table: Table, empty: &str) -> Block {
    if table.rows.is_empty() {
        Block::Alert { level: AlertLevel::Info, text: empty.to_string() }
    } else {
        Block::Table(table)
    }
}
