//! Request and response shapes shared by the gateway.
//!
//! Business entities stay opaque JSON; the only field the layer reads is the
//! identifier (`_id`, falling back to `id`).

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

/// Identifier fields, in lookup order.
const IDENTIFIER_FIELDS: [&str; 2] = ["_id", "id"];

/// Symbol used when the currency settings cannot be fetched.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

/// Options for [`ApiClient::custom_call`](super::client::ApiClient::custom_call).
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    /// JSON body; never sent with GET.
    pub data: Option<Value>,
    /// Query string parameters.
    pub params: Vec<(String, String)>,
    /// Extra headers, merged under the standard auth and content-type headers.
    pub headers: Vec<(String, String)>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            data: None,
            params: Vec::new(),
            headers: Vec::new(),
        }
    }
}

impl CallOptions {
    /// Options for `method` with no body, parameters or extra headers.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Set the JSON body.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Append a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Append an extra header; `Authorization` and `Content-Type` are overridden.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response from GET /settings/currency.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencySettings {
    pub symbol: String,
}

/// Read an entity's identifier as a string.
///
/// Strings and integers are accepted; an empty string counts as missing.
pub fn identifier_of(entity: &Value) -> Option<String> {
    IDENTIFIER_FIELDS.iter().find_map(|field| match entity.get(field)? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}
