// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android channel.
//
// Writes go through the injected `Android.post(url, json)` interface. Reads
// are URL loads the WebViewClient intercepts, so they replace the current
// location on the next tick.

use gbkit_core::{DispatchKind, Environment, OutboundMessage, Result};
use tracing::debug;

use super::Channel;
use crate::traits::HostPage;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeAndroidChannel;

impl Channel for NativeAndroidChannel {
    fn environment(&self) -> Environment {
        Environment::NativeAndroid
    }

    fn send(&self, page: &dyn HostPage, message: &OutboundMessage) -> Result<()> {
        let url = message.url();
        match message.kind() {
            DispatchKind::Read => {
                debug!(%url, "scheduling location replace");
                page.replace_location_next_tick(&url)
            }
            DispatchKind::Write => {
                let body = message.body().map(serde_json::to_string).transpose()?;
                debug!(%url, has_body = body.is_some(), "calling Android.post");
                page.android_post(&url, body.as_deref())
            }
        }
    }
}
