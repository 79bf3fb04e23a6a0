// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gbkit: Host channels, callback registry, and inbound routing.
//
// The page is reached only through the `HostPage` traits. In the browser the
// `web` module implements them over web-sys; everywhere else the `stub`
// module records calls so the whole bridge can be exercised natively.

pub mod callbacks;
pub mod channel;
pub mod context;
pub mod dispatcher;
pub mod environment;
pub mod router;
pub mod traits;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(not(target_arch = "wasm32"))]
pub mod stub;

use std::rc::Rc;

pub use callbacks::{CallbackFn, CallbackRegistry};
pub use context::{BridgeContext, Lifecycle};
pub use environment::{DetectedEnvironment, EnvironmentSignals};
pub use traits::HostPage;

/// The page implementation for the compile target.
pub fn host_page() -> Rc<dyn HostPage> {
    #[cfg(target_arch = "wasm32")]
    {
        Rc::new(web::WebPage::new())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        // Native builds have no webview: record instead.
        Rc::new(stub::RecordingPage::desktop())
    }
}
