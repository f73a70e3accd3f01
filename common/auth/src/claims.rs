use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AuthError, AuthResult};

/// Verified JWT claims.
///
/// `raw` is the decoded payload exactly as signed; the typed fields are
/// read-only views over it for the claims the authorizer cares about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    pub subject: Option<String>,
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub raw: Map<String, Value>,
}

impl Claims {
    /// Looks up any claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    /// `None` when the token carries no `permissions` claim at all.
    ///
    /// A claim that is present but not an array reads as an empty set;
    /// non-string entries are skipped.
    pub fn permissions(&self) -> Option<Vec<&str>> {
        match self.raw.get("permissions")? {
            Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
            _ => Some(Vec::new()),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions()
            .map(|granted| granted.iter().any(|value| *value == permission))
            .unwrap_or(false)
    }

    pub fn into_raw(self) -> Map<String, Value> {
        self.raw
    }
}

impl TryFrom<Value> for Claims {
    type Error = AuthError;

    fn try_from(value: Value) -> AuthResult<Self> {
        let raw = match value {
            Value::Object(map) => map,
            _ => return Err(AuthError::InvalidHeader),
        };

        let issuer = raw
            .get("iss")
            .and_then(Value::as_str)
            .ok_or(AuthError::InvalidClaims)?
            .to_owned();

        let audience = match raw.get("aud") {
            Some(Value::String(item)) => vec![item.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => return Err(AuthError::InvalidClaims),
        };

        let expires_at = raw
            .get("exp")
            .and_then(timestamp)
            .ok_or(AuthError::InvalidClaims)?;

        // Informational only; an unreadable `iat` is left in `raw`.
        let issued_at = raw.get("iat").and_then(timestamp);

        let subject = raw.get("sub").and_then(Value::as_str).map(str::to_owned);

        Ok(Self {
            subject,
            issuer,
            audience,
            expires_at,
            issued_at,
            raw,
        })
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let seconds = value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))?;
    Utc.timestamp_opt(seconds, 0).single()
}
