// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gbkit: Core types, wire helpers, and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod payloads;
pub mod types;
pub mod wire;

pub use config::{BridgeConfig, DebugMode};
pub use error::{BridgeError, GeolocationError, Result};
pub use types::*;
