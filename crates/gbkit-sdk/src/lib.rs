// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gbkit: Capability facade.
//
// `Gb` is the page's handle on the host app. Every capability is a thin
// mapping onto a read or write dispatch, optionally carrying callback tokens
// for the host's answer:
//
//   let gb = Gb::attach(BridgeConfig::default())?;
//   gb.share("hello", "http://x")?;
//   gb.storage().get_item("k", |value| { ... })?;

pub mod files;
pub mod gb;
pub mod legacy;
pub mod location;
pub mod request;
pub mod storage;
pub mod telemetry;
pub mod user;

#[cfg(target_arch = "wasm32")]
pub mod bindings;

pub use gb::{Device, Gb, LOCATION_FAILURE, LOCATION_SUCCESS, PROTOCOL_VERSION};
pub use gbkit_bridge::{BridgeContext, HostPage, Lifecycle};
pub use gbkit_core::{BridgeConfig, BridgeError, DebugMode, Environment, MediaSource, Params, Platform, Result};
pub use request::RequestSettings;
