// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standalone development channel.
//
// There is no host app behind a desktop browser, so `goodbarber://` actions
// cannot be delivered and fail with `TransportUnavailable`. HTTP(S) and
// relative destinations are requested directly from the page with the session
// token appended; other schemes (`mailto:`) are handed to the browser as a
// navigation.

use gbkit_core::wire::{self, HOST_SCHEME};
use gbkit_core::{
    BridgeError, DispatchKind, Environment, HttpMethod, HttpRequest, HttpResponse, OutboundMessage,
    Result,
};
use tracing::{debug, warn};

use super::Channel;
use crate::traits::HostPage;

#[derive(Debug, Clone, Default)]
pub struct DevChannel {
    session_token: String,
}

impl DevChannel {
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
        }
    }

    fn authorised_url(&self, url: &str) -> String {
        if self.session_token.is_empty() {
            warn!(%url, "no session token; requesting without one");
            url.to_string()
        } else {
            wire::append_session_token(url, &self.session_token)
        }
    }
}

impl Channel for DevChannel {
    fn environment(&self) -> Environment {
        Environment::StandaloneDev
    }

    fn send(&self, page: &dyn HostPage, message: &OutboundMessage) -> Result<()> {
        match message.scheme() {
            Some(HOST_SCHEME) => Err(BridgeError::unavailable(
                Environment::StandaloneDev,
                format!("no host app to receive `{}`", message.destination()),
            )),
            None | Some("http") | Some("https") => {
                let request = HttpRequest {
                    method: match message.kind() {
                        DispatchKind::Read => HttpMethod::Get,
                        DispatchKind::Write => HttpMethod::Post,
                    },
                    url: self.authorised_url(&message.url()),
                    body: message.body().map(wire::form_encode),
                };
                debug!(method = request.method.as_str(), url = %request.url, "requesting directly");
                let url = request.url.clone();
                page.http_request(
                    request,
                    Box::new(move |outcome: std::result::Result<HttpResponse, String>| match outcome {
                        Ok(response) => debug!(%url, status = response.status, "dev request finished"),
                        Err(e) => warn!(%url, error = %e, "dev request failed"),
                    }),
                )
            }
            Some(_) => page.replace_location_next_tick(&message.url()),
        }
    }
}
