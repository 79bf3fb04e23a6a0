// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Navigation: the current host URL, back, external links, mail, and maps.

use gbkit_bridge::BridgeContext;
use gbkit_core::wire::{self, dest};
use gbkit_core::{Params, Result};
use serde_json::{Map, Value};

#[derive(Debug)]
pub struct Location<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> Location<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// URL the host considers current, empty until it sent one.
    pub fn href(&self) -> String {
        self.ctx.href().unwrap_or_default()
    }

    /// Parameters the host opened this page with.
    pub fn params(&self) -> Value {
        self.ctx
            .params()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Ask the host to navigate to `url`.
    pub fn navigate_to(&self, url: &str) -> Result<()> {
        self.ctx.dispatch_read(url, Params::new())
    }

    pub fn back(&self) -> Result<()> {
        self.ctx.dispatch_read(dest::NAVIGATE_BACK, Params::new())
    }

    /// Open `url` outside the app.
    pub fn open(&self, url: &str) -> Result<()> {
        let mut query = Params::new();
        query.insert("url".into(), wire::encode_uri_component(url));
        self.ctx.dispatch_read(dest::OPEN_EXTERNAL, query)
    }

    pub fn mail(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let mut query = Params::new();
        query.insert("subject".into(), wire::encode_uri_component(subject));
        query.insert("body".into(), wire::encode_uri_component(body));
        self.ctx.dispatch_read(&format!("mailto:{to}"), query)
    }

    /// Open the maps app with `params` (e.g. `q`, `ll`) passed through verbatim.
    ///
    /// Without a native maps app the query goes to the web fallback through
    /// [`open`](Self::open).
    pub fn maps(&self, params: Params) -> Result<()> {
        let detected = self.ctx.detected();
        if detected.is_standalone_dev() || detected.is_hosted_web() {
            let url = format!(
                "{}{}",
                self.ctx.config().maps_fallback_url,
                wire::query_string(&params)
            );
            return self.open(&url);
        }
        if params.is_empty() {
            return self
                .ctx
                .dispatch_read(&format!("{}?q=", dest::MAPS), Params::new());
        }
        self.ctx.dispatch_read(dest::MAPS, params)
    }
}
