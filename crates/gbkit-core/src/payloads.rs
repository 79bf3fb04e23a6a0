// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data-transfer shapes the host hands back through callbacks.
//
// The bridge never validates or persists these; they are parsed on demand
// for callers that want typed access and otherwise passed through as JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Failure payload passed to error callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GbError {
    pub code: i64,
    pub message: String,
}

impl GbError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "code": self.code, "message": self.message })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Consent state for tracking and notifications (`0`, `1`, `2` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum GbConsentStatus {
    Unknown,
    Accepted,
    Refused,
}

impl From<u8> for GbConsentStatus {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::Accepted,
            2 => Self::Refused,
            _ => Self::Unknown,
        }
    }
}

impl From<GbConsentStatus> for u8 {
    fn from(status: GbConsentStatus) -> Self {
        match status {
            GbConsentStatus::Unknown => 0,
            GbConsentStatus::Accepted => 1,
            GbConsentStatus::Refused => 2,
        }
    }
}

/// Postal address attached to a user profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GbUserAddress {
    pub id: Value,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub city: Option<String>,
    pub company: Option<String>,
    pub country: Option<String>,
    pub extra: Option<String>,
    pub state: Option<String>,
    pub vat_number: Option<String>,
    pub zipcode: Option<String>,
    pub localized_address: Option<String>,
}

/// A membership access level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GbAccessLevel {
    pub id: Value,
    pub name: Option<String>,
    /// Fields this crate does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The connected user, as reported by `gbgetcurrentuser`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GbUser {
    pub id: Value,
    pub api_version: Value,
    pub login: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture_url: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<GbCoordinate>,
    pub groups: Option<Vec<Value>>,
    pub social_accounts: Option<Vec<Value>>,
    pub custom_attribs: Option<Map<String, Value>>,
    pub access_levels: Option<Vec<GbAccessLevel>>,
    pub addresses: Option<Vec<GbUserAddress>>,
    pub default_billing_address_id: Value,
    pub default_shipping_address_id: Value,
}

/// Parse a host payload as `T`. `null` and the empty string mean absent.
///
/// Hosts send payloads either as JSON objects or as JSON-encoded strings;
/// both are accepted.
pub fn parse_payload<T: DeserializeOwned>(payload: &Value) -> Result<Option<T>> {
    let parsed = match payload {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(serde_json::from_str(text)?),
        other => Some(serde_json::from_value(other.clone())?),
    };
    Ok(parsed)
}

impl GbUser {
    /// Typed view of a `gbgetcurrentuser` answer. `None` when nobody is signed in.
    pub fn parse(payload: &Value) -> Result<Option<Self>> {
        parse_payload(payload)
    }
}

impl GbAccessLevel {
    /// Typed view of a `gbgetaccesslevels` answer.
    pub fn parse_list(payload: &Value) -> Result<Vec<Self>> {
        Ok(parse_payload(payload)?.unwrap_or_default())
    }
}
