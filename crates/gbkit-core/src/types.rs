// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the gbkit webview bridge.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::wire;

/// Ordered string parameters, as carried in query strings and form bodies.
///
/// Insertion order is preserved because hosts match the query string verbatim.
pub type Params = IndexMap<String, String>;

/// Device platform reported by the embedding host (`gbUserInfo.platform`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    /// Interpret the host-supplied device info. Absent or unknown means `Web`.
    pub fn from_device_info(platform: Option<&str>) -> Self {
        match platform {
            Some("ios") => Self::Ios,
            Some("android") => Self::Android,
            _ => Self::Web,
        }
    }

    /// Wire name returned by `platform()`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime context the page is executing in. Computed once per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// Native iOS webview with the `gbObserver` message handler.
    NativeIOS,
    /// Native Android webview with the `Android` bridge object.
    NativeAndroid,
    /// Iframe inside the hosted website; talks to the parent frame.
    HostedWeb,
    /// Plain desktop browser with no host attached.
    StandaloneDev,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NativeIOS => "ios",
            Self::NativeAndroid => "android",
            Self::HostedWeb => "hosted-web",
            Self::StandaloneDev => "standalone-dev",
        })
    }
}

/// Whether an outbound action is a navigation-style read or a form-post-style write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchKind {
    Read,
    Write,
}

/// One host-directed action, fully built before it is handed to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    kind: DispatchKind,
    destination: String,
    query: Params,
    body: Option<Params>,
}

impl OutboundMessage {
    /// A read action. Query values must already be escaped where the wire contract requires it.
    pub fn read(destination: impl Into<String>, query: Params) -> Self {
        Self {
            kind: DispatchKind::Read,
            destination: destination.into(),
            query,
            body: None,
        }
    }

    /// A write action carrying an optional body.
    pub fn write(destination: impl Into<String>, query: Params, body: Option<Params>) -> Self {
        Self {
            kind: DispatchKind::Write,
            destination: destination.into(),
            query,
            body,
        }
    }

    pub fn kind(&self) -> DispatchKind {
        self.kind
    }

    /// Destination scheme (`goodbarber`, `mailto`, `https`), or `None` for relative paths.
    pub fn scheme(&self) -> Option<&str> {
        wire::split_scheme(&self.destination).0
    }

    /// Destination without its scheme and `//` separator.
    pub fn path(&self) -> &str {
        wire::split_scheme(&self.destination).1
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    pub fn body(&self) -> Option<&Params> {
        self.body.as_ref()
    }

    /// Full URL handed to the host: destination plus `?query` when there is one.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.destination.clone()
        } else {
            format!("{}?{}", self.destination, wire::query_string(&self.query))
        }
    }

    /// Whether this message targets the host app's own URL scheme.
    pub fn targets_host_scheme(&self) -> bool {
        self.scheme() == Some(wire::HOST_SCHEME)
    }
}

/// A message delivered by the hosting frame: `{ method, params }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl InboundEvent {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Extract an event from a `MessageEvent.data` payload.
    ///
    /// Returns `None` when the payload is not an object or carries no string
    /// `method`. A missing or non-array `params` is treated as no arguments.
    pub fn from_message_data(data: &Value) -> Option<Self> {
        let object = data.as_object()?;
        let method = object.get("method")?.as_str()?.to_string();
        let params = match object.get("params") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Some(Self { method, params })
    }

    /// Argument at `index`, or `Value::Null` when the host sent fewer.
    pub fn arg(&self, index: usize) -> &Value {
        self.params.get(index).unwrap_or(&Value::Null)
    }
}

/// Prefix of every callback token.
pub const CALLBACK_TOKEN_PREFIX: &str = "gbcb_";

/// Opaque string naming a registered callback.
///
/// Tokens cross the host boundary in form bodies and come back verbatim, so
/// they only use `[a-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackToken(String);

impl CallbackToken {
    /// Token for a freshly generated callback id.
    pub fn generate() -> (Uuid, Self) {
        let id = Uuid::new_v4();
        (id, Self::from_id(id))
    }

    pub fn from_id(id: Uuid) -> Self {
        Self(format!("{CALLBACK_TOKEN_PREFIX}{}", id.simple()))
    }

    /// Recover the callback id from a token string.
    pub fn parse(token: &str) -> Result<Uuid> {
        let hex = token
            .strip_prefix(CALLBACK_TOKEN_PREFIX)
            .ok_or_else(|| BridgeError::Decode(format!("`{token}` is not a callback token")))?;
        if hex.len() != 32 || !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(BridgeError::Decode(format!("`{token}` has a malformed id")));
        }
        Uuid::parse_str(hex).map_err(|e| BridgeError::Decode(format!("`{token}`: {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media kind requested from the host picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }
}

/// Where the host picker takes media from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    #[default]
    All,
    Camera,
    Library,
}

impl MediaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Camera => "camera",
            Self::Library => "library",
        }
    }

    /// Lenient parse used by the legacy entry points; unknown values mean `All`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "camera" => Self::Camera,
            "library" => Self::Library,
            _ => Self::All,
        }
    }
}

/// HTTP verbs the host proxy accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A request the page performs itself (dev channel, file fetch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Form-encoded body, if any.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
        }
    }
}

/// Response to an [`HttpRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status counts as success. Status 0 comes from `file:` and opaque loads.
    pub fn is_success(&self) -> bool {
        self.status == 200 || self.status == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn platform_defaults_to_web() {
        assert_eq!(Platform::from_device_info(None), Platform::Web);
        assert_eq!(Platform::from_device_info(Some("windows")), Platform::Web);
        assert_eq!(Platform::from_device_info(Some("ios")), Platform::Ios);
        assert_eq!(Platform::from_device_info(Some("android")), Platform::Android);
    }

    #[test]
    fn url_appends_query_only_when_present() {
        let bare = OutboundMessage::read("goodbarber://navigate.back", Params::new());
        assert_eq!(bare.url(), "goodbarber://navigate.back");

        let mut query = Params::new();
        query.insert("type".into(), "photo".into());
        query.insert("source".into(), "all".into());
        let media = OutboundMessage::read("goodbarber://getmedia", query);
        assert_eq!(media.url(), "goodbarber://getmedia?type=photo&source=all");
        assert_eq!(media.scheme(), Some("goodbarber"));
        assert_eq!(media.path(), "getmedia");
        assert!(media.targets_host_scheme());
    }

    #[test]
    fn relative_destination_has_no_scheme() {
        let login = OutboundMessage::read("/login", Params::new());
        assert_eq!(login.scheme(), None);
        assert_eq!(login.path(), "/login");
        assert!(!login.targets_host_scheme());
    }

    #[test]
    fn inbound_event_from_message_data() {
        let event = InboundEvent::from_message_data(&json!({
            "method": "gbWebsiteSetData",
            "params": ["name", 42]
        }))
        .expect("event");
        assert_eq!(event.method, "gbWebsiteSetData");
        assert_eq!(event.arg(1), &json!(42));
        assert_eq!(event.arg(5), &Value::Null);

        assert!(InboundEvent::from_message_data(&json!("text")).is_none());
        assert!(InboundEvent::from_message_data(&json!({"params": []})).is_none());
        let no_params = InboundEvent::from_message_data(&json!({"method": "x"})).expect("event");
        assert!(no_params.params.is_empty());
    }

    #[test]
    fn callback_tokens_parse_back_to_their_id() {
        let (id, token) = CallbackToken::generate();
        assert!(token.as_str().starts_with(CALLBACK_TOKEN_PREFIX));
        assert_eq!(CallbackToken::parse(token.as_str()).expect("parse"), id);
    }

    #[test]
    fn malformed_tokens_fail_to_parse() {
        for bad in [
            "",
            "gbcb_",
            "ZnVuY3Rpb24oKXt9",
            "gbcb_xyz",
            "gbcb_0123456789ABCDEF0123456789ABCDEF",
        ] {
            assert!(
                matches!(CallbackToken::parse(bad), Err(BridgeError::Decode(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn http_status_zero_counts_as_success() {
        let ok = HttpResponse { status: 0, body: String::new() };
        let missing = HttpResponse { status: 404, body: String::new() };
        assert!(ok.is_success());
        assert!(!missing.is_success());
    }
}
