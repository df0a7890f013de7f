use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// One page of a server-owned collection. Every list endpoint is normalised into this
/// shape whether it answered with a `{count, results}` envelope or a bare array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub count: u64,
    pub results: Vec<Value>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl Page {
    pub fn from_value(v: Value) -> ClientResult<Self> {
        match v {
            Value::Array(items) => Ok(Self { count: items.len() as u64, results: items, next: None, previous: None }),
            Value::Object(mut map) => {
                let results = match map.remove("results") {
                    Some(Value::Array(items)) => items,
                    Some(other) => return Err(ClientError::decode(format!("'results' is not a list: {}", short(&other)))),
                    None => return Err(ClientError::decode("expected a list or a paginated envelope")),
                };
                let count = map.get("count").and_then(Value::as_u64).unwrap_or(results.len() as u64);
                let link = |k: &str| map.get(k).and_then(Value::as_str).map(str::to_string);
                Ok(Self { count, next: link("next"), previous: link("previous"), results })
            }
            other => Err(ClientError::decode(format!("expected a list, got {}", short(&other)))),
        }
    }

    pub fn len(&self) -> usize { self.results.len() }
    pub fn is_empty(&self) -> bool { self.results.is_empty() }

    /// True when the server holds more records than this page carries.
    pub fn is_partial(&self) -> bool { (self.results.len() as u64) < self.count || self.next.is_some() }
}

fn short(v: &Value) -> String {
    let s = v.to_string();
    if s.chars().count() <= 40 { s } else { s.chars().take(39).collect::<String>() + "…" }
}
