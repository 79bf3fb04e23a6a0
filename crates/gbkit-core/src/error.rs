// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for gbkit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Environment;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Callback codec --
    #[error("cannot encode callback: {0}")]
    Encode(String),

    #[error("cannot decode callback token: {0}")]
    Decode(String),

    #[error("completion already delivered for callback `{0}`")]
    CompletionAlreadyDelivered(String),

    /// Raised by a user callback; propagated unchanged to whoever invoked it.
    #[error("callback failed: {0}")]
    Callback(String),

    // -- Transport --
    #[error("transport unavailable in {environment} environment: {detail}")]
    TransportUnavailable {
        environment: Environment,
        detail: String,
    },

    #[error("geolocation failed: {0}")]
    Geolocation(#[from] GeolocationError),

    // -- Context lifecycle --
    #[error("bridge context has been disposed")]
    ContextDisposed,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Shorthand for a [`BridgeError::TransportUnavailable`].
    pub fn unavailable(environment: Environment, detail: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            environment,
            detail: detail.into(),
        }
    }
}

/// Why a geolocation request failed.
///
/// The `Display` strings are the reasons handed to `gbDidFailGetLocation`,
/// so they are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GeolocationError {
    #[error("Timeout")]
    Timeout,
    #[error("Position unavailable")]
    PositionUnavailable,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Unknown error")]
    Unknown,
}

impl GeolocationError {
    /// Map a W3C `GeolocationPositionError.code` onto a named reason.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
