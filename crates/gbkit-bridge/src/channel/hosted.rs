// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hosted-website channel: the page lives in an iframe of the web app and
// forwards `{ url, params }` to the parent frame.

use gbkit_core::{Environment, OutboundMessage, Result};
use tracing::debug;

use super::{Channel, Envelope};
use crate::traits::HostPage;

#[derive(Debug, Clone, Copy, Default)]
pub struct HostedWebChannel;

impl Channel for HostedWebChannel {
    fn environment(&self) -> Environment {
        Environment::HostedWeb
    }

    fn send(&self, page: &dyn HostPage, message: &OutboundMessage) -> Result<()> {
        let envelope = serde_json::to_value(Envelope::for_message(message))?;
        debug!(url = %message.url(), "posting to parent frame");
        page.post_to_parent(&envelope)
    }
}
