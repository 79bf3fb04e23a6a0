// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Files bundled with the page, fetched by the page itself.

use gbkit_bridge::BridgeContext;
use gbkit_core::payloads::GbError;
use gbkit_core::{HttpRequest, HttpResponse, Result};
use tracing::{debug, warn};

/// Reported for any non-200 answer.
pub const FETCH_FAILED_CODE: i64 = 0;
/// Reported when the request could not be made at all.
pub const FETCH_ERROR_CODE: i64 = 1;

#[derive(Debug)]
pub struct Files<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> Files<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Load `filename` and hand its text to `success`, or a [`GbError`] to `error`.
    pub fn fetch<S, E>(&self, filename: &str, success: S, error: E) -> Result<()>
    where
        S: FnOnce(String) + 'static,
        E: FnOnce(GbError) + 'static,
    {
        let name = filename.to_string();
        self.ctx.page().http_request(
            HttpRequest::get(filename),
            Box::new(move |outcome: std::result::Result<HttpResponse, String>| {
                match fetch_outcome(outcome) {
                    Ok(text) => {
                        debug!(file = %name, bytes = text.len(), "file fetched");
                        success(text);
                    }
                    Err(failure) => {
                        warn!(file = %name, message = %failure.message, "file fetch failed");
                        error(failure);
                    }
                }
            }),
        )
    }
}

fn fetch_outcome(outcome: std::result::Result<HttpResponse, String>) -> std::result::Result<String, GbError> {
    match outcome {
        Ok(response) if response.status == 200 => Ok(response.body),
        Ok(_) => Err(GbError::new(FETCH_FAILED_CODE, "Error unknown")),
        Err(detail) => Err(GbError::new(FETCH_ERROR_CODE, format!("Error loading file: {detail}"))),
    }
}
