// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP requests proxied through the host app.
//
// The host performs the request and answers on exactly one of the two
// completion tokens. Outside a host there is no proxy and the call fails with
// `TransportUnavailable`.

use gbkit_bridge::{BridgeContext, CallbackFn};
use gbkit_core::wire::dest;
use gbkit_core::{CallbackToken, HttpMethod, Params, Result};
use serde_json::{Map, Value};
use tracing::instrument;

/// Optional parts of a proxied request.
#[derive(Default)]
pub struct RequestSettings {
    pub params: Option<Map<String, Value>>,
    pub headers: Option<Map<String, Value>>,
    pub success: Option<CallbackFn>,
    pub error: Option<CallbackFn>,
}

impl RequestSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.error = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for RequestSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSettings")
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct Request<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> Request<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// GET never sends parameters; any in `settings` are ignored.
    pub fn get(&self, url: &str, settings: RequestSettings) -> Result<()> {
        self.send(url, HttpMethod::Get, settings)
    }

    pub fn post(&self, url: &str, settings: RequestSettings) -> Result<()> {
        self.send(url, HttpMethod::Post, settings)
    }

    pub fn patch(&self, url: &str, settings: RequestSettings) -> Result<()> {
        self.send(url, HttpMethod::Patch, settings)
    }

    pub fn put(&self, url: &str, settings: RequestSettings) -> Result<()> {
        self.send(url, HttpMethod::Put, settings)
    }

    pub fn delete(&self, url: &str, settings: RequestSettings) -> Result<()> {
        self.send(url, HttpMethod::Delete, settings)
    }

    #[instrument(skip(self, settings), fields(method = method.as_str()))]
    pub fn send(&self, url: &str, method: HttpMethod, settings: RequestSettings) -> Result<()> {
        let RequestSettings {
            params,
            headers,
            success,
            error,
        } = settings;

        let params = match method {
            HttpMethod::Get => "null".to_string(),
            _ => serde_json::to_string(&params.unwrap_or_default())?,
        };
        let headers = serde_json::to_string(&headers.unwrap_or_default())?;
        let (success, error) = encode_completions(self.ctx, success, error)?;

        let mut body = Params::new();
        body.insert("url".into(), url.to_string());
        body.insert("method".into(), method.as_str().into());
        body.insert("headers".into(), headers);
        body.insert("params".into(), params);
        body.insert("successCallback".into(), success);
        body.insert("errorCallback".into(), error);
        self.ctx.dispatch_write(dest::REQUEST, Params::new(), Some(body))
    }
}

/// Register an exactly-once pair for whichever completions were given.
/// A missing completion is sent as the empty token.
pub(crate) fn encode_completions(
    ctx: &BridgeContext,
    success: Option<CallbackFn>,
    error: Option<CallbackFn>,
) -> Result<(String, String)> {
    if success.is_none() && error.is_none() {
        return Ok((String::new(), String::new()));
    }
    let wanted = (success.is_some(), error.is_some());
    let success: CallbackFn = match success {
        Some(callback) => callback,
        None => Box::new(ignore),
    };
    let error: CallbackFn = match error {
        Some(callback) => callback,
        None => Box::new(ignore),
    };
    let (success_token, error_token) = ctx.encode_completion(success, error)?;
    let keep = |token: CallbackToken, wanted: bool| if wanted { token.to_string() } else { String::new() };
    Ok((keep(success_token, wanted.0), keep(error_token, wanted.1)))
}

fn ignore(_: &[Value]) -> Result<()> {
    Ok(())
}
