// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS channel: every action, read or write, is one JSON string posted to the
// `gbObserver` WKScriptMessageHandler.

use gbkit_core::{Environment, OutboundMessage, Result};
use tracing::debug;

use super::{Channel, Envelope};
use crate::traits::HostPage;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeIosChannel;

impl Channel for NativeIosChannel {
    fn environment(&self) -> Environment {
        Environment::NativeIOS
    }

    fn send(&self, page: &dyn HostPage, message: &OutboundMessage) -> Result<()> {
        let json = serde_json::to_string(&Envelope::for_message(message))?;
        debug!(%json, "posting to webkit message handler");
        page.post_webkit_message(&json)
    }
}
