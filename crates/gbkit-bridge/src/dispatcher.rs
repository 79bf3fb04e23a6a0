// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outbound dispatcher.
//
// Builds the complete message for an action and hands it to the selected
// channel. No queue, no retries, no acknowledgement: once `send` returns the
// message is gone. Read dispatches honour the debugging mode (alert the
// destination first, optionally suppress the send).

use gbkit_core::{DebugMode, Environment, OutboundMessage, Params, Result};
use tracing::{debug, info, instrument};

use crate::channel::Channel;
use crate::traits::HostPage;

pub struct Dispatcher {
    channel: Box<dyn Channel>,
    debugging: DebugMode,
}

impl Dispatcher {
    pub fn new(channel: Box<dyn Channel>, debugging: DebugMode) -> Self {
        Self { channel, debugging }
    }

    pub fn environment(&self) -> Environment {
        self.channel.environment()
    }

    /// Navigation-style dispatch for idempotent actions.
    pub fn dispatch_read(&self, page: &dyn HostPage, destination: &str, query: Params) -> Result<()> {
        self.dispatch(page, OutboundMessage::read(destination, query))
    }

    /// Form-post-style dispatch for actions carrying a payload.
    pub fn dispatch_write(
        &self,
        page: &dyn HostPage,
        destination: &str,
        query: Params,
        body: Option<Params>,
    ) -> Result<()> {
        self.dispatch(page, OutboundMessage::write(destination, query, body))
    }

    #[instrument(
        skip(self, page, message),
        fields(environment = %self.channel.environment(), kind = ?message.kind(), destination = message.destination())
    )]
    pub fn dispatch(&self, page: &dyn HostPage, message: OutboundMessage) -> Result<()> {
        if message.kind() == gbkit_core::DispatchKind::Read {
            if self.debugging.alerts() {
                page.alert(&message.url());
            }
            if self.debugging.suppresses() {
                info!(url = %message.url(), "read dispatch suppressed by debugging mode");
                return Ok(());
            }
        }
        self.channel.send(page, &message)?;
        debug!("dispatched");
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("environment", &self.channel.environment())
            .field("debugging", &self.debugging)
            .finish()
    }
}
