// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Manual protocol-inspection levels. Never enable outside development.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugMode {
    /// Send everything, show nothing.
    #[default]
    Production,
    /// Alert every read destination before sending it.
    AlertBeforeRequest,
    /// Alert every read destination and do not send it.
    AlertAndSuppress,
}

impl DebugMode {
    /// Numeric level used by page scripts (`0`, `1`, `2`). Anything above 2 suppresses.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Production,
            1 => Self::AlertBeforeRequest,
            _ => Self::AlertAndSuppress,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Production" => Some(Self::Production),
            "AlertBeforeRequest" => Some(Self::AlertBeforeRequest),
            "AlertAndSuppress" => Some(Self::AlertAndSuppress),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Self::Production => 0,
            Self::AlertBeforeRequest => 1,
            Self::AlertAndSuppress => 2,
        }
    }

    pub fn alerts(&self) -> bool {
        *self >= Self::AlertBeforeRequest
    }

    pub fn suppresses(&self) -> bool {
        *self >= Self::AlertAndSuppress
    }
}

impl Serialize for DebugMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

/// Accepted spellings: the variant name or its numeric level.
#[derive(Deserialize)]
#[serde(untagged)]
enum DebugModeRepr {
    Level(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for DebugMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match DebugModeRepr::deserialize(deserializer)? {
            DebugModeRepr::Level(level) => Ok(Self::from_level(level)),
            DebugModeRepr::Name(name) => Self::from_name(&name).ok_or_else(|| {
                serde::de::Error::unknown_variant(&name, DEBUG_MODE_NAMES)
            }),
        }
    }
}

const DEBUG_MODE_NAMES: &[&str] = &["Production", "AlertBeforeRequest", "AlertAndSuppress"];

/// Settings for one bridge context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Hosted-website mode requested by the embedder. OR-ed with the page's own flag.
    pub hosted_mode: bool,
    /// Manual inspection level for read dispatches.
    pub debugging_mode: DebugMode,
    /// Session token; when `None` it is read from the page URL's `gbToken`.
    pub session_token: Option<String>,
    /// Timeout for browser geolocation in standalone development.
    pub geolocation_timeout_ms: u64,
    /// Base URL used for `maps()` when no native maps app is reachable.
    pub maps_fallback_url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            hosted_mode: false,
            debugging_mode: DebugMode::Production,
            session_token: None,
            geolocation_timeout_ms: 15_000,
            maps_fallback_url: "https://maps.google.com/maps?".into(),
        }
    }
}

impl BridgeConfig {
    /// Fill in the session token from the page URL unless one was supplied.
    pub fn with_page_href(mut self, href: &str) -> Self {
        if self.session_token.is_none() {
            self.session_token = Some(crate::wire::url_param(href, crate::wire::SESSION_TOKEN_PARAM));
        }
        self
    }

    /// Session token, empty when none is known.
    pub fn session_token(&self) -> &str {
        self.session_token.as_deref().unwrap_or_default()
    }
}
