// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signed-in user, session screens, and membership access levels.

use gbkit_bridge::{BridgeContext, Lifecycle};
use gbkit_core::wire::dest;
use gbkit_core::{Params, Result};
use serde_json::Value;

use crate::request::encode_completions;

#[derive(Debug)]
pub struct User<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> User<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Fetch the signed-in user. Both completions receive the host's payload
    /// as sent; [`GbUser::parse`](gbkit_core::payloads::GbUser::parse) gives typed access when wanted.
    pub fn get_current<S, E>(&self, mut success: S, mut error: E) -> Result<()>
    where
        S: FnMut(Value) -> Result<()> + 'static,
        E: FnMut(Value) -> Result<()> + 'static,
    {
        let (success, error) = encode_completions(
            self.ctx,
            Some(Box::new(move |args: &[Value]| success(first(args)))),
            Some(Box::new(move |args: &[Value]| error(first(args)))),
        )?;
        self.ctx.dispatch_write(dest::GET_CURRENT_USER, Params::new(), Some(completion_body(success, error)))
    }

    pub fn open_login(&self) -> Result<()> {
        self.ctx.dispatch_read(dest::LOGIN, Params::new())
    }

    pub fn logout(&self) -> Result<()> {
        self.ctx.dispatch_read(dest::LOGOUT, Params::new())
    }

    pub fn on_login<F>(&self, hook: F)
    where
        F: FnMut() -> Result<()> + 'static,
    {
        self.ctx.set_hook(Lifecycle::Login, hook);
    }

    pub fn on_logout<F>(&self, hook: F)
    where
        F: FnMut() -> Result<()> + 'static,
    {
        self.ctx.set_hook(Lifecycle::Logout, hook);
    }

    pub fn on_update<F>(&self, hook: F)
    where
        F: FnMut() -> Result<()> + 'static,
    {
        self.ctx.set_hook(Lifecycle::UserUpdate, hook);
    }

    /// Called by the host when the signed-in user changed.
    pub fn updated(&self) -> Result<()> {
        self.ctx.fire(Lifecycle::UserUpdate)
    }
}

#[derive(Debug)]
pub struct Membership<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> Membership<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Access levels as the host sent them; see [`GbAccessLevel::parse_list`](gbkit_core::payloads::GbAccessLevel::parse_list).
    pub fn get_access_levels<S, E>(&self, mut success: S, mut error: E) -> Result<()>
    where
        S: FnMut(Value) -> Result<()> + 'static,
        E: FnMut(Value) -> Result<()> + 'static,
    {
        let (success, error) = encode_completions(
            self.ctx,
            Some(Box::new(move |args: &[Value]| success(first(args)))),
            Some(Box::new(move |args: &[Value]| error(first(args)))),
        )?;
        self.ctx.dispatch_write(dest::GET_ACCESS_LEVELS, Params::new(), Some(completion_body(success, error)))
    }
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}

fn completion_body(success: String, error: String) -> Params {
    let mut body = Params::new();
    body.insert("successCallback".into(), success);
    body.insert("errorCallback".into(), error);
    body
}
