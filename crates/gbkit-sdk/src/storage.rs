// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-side key/value storage.
//
// Items are stored wrapped as `{"value": item}` so that falsy values survive
// the host round trip. Reads answer through a callback token.

use gbkit_bridge::BridgeContext;
use gbkit_core::wire::dest;
use gbkit_core::{Params, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Serialize)]
struct StoredItem<'a> {
    value: &'a Value,
}

#[derive(Debug)]
pub struct Storage<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> Storage<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    pub fn set_item(&self, key: &str, item: &Value) -> Result<()> {
        let mut body = Params::new();
        body.insert("item".into(), serde_json::to_string(&StoredItem { value: item })?);
        body.insert("key".into(), key.to_string());
        self.ctx.dispatch_write(dest::SET_STORAGE_ITEM, Params::new(), Some(body))
    }

    /// Read `key`. The callback gets `None` when the host has nothing stored.
    pub fn get_item<F>(&self, key: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(Option<Value>) -> Result<()> + 'static,
    {
        let token = self
            .ctx
            .encode_once_callback(move |args| callback(unwrap_stored(args.first())?))?;
        let mut body = Params::new();
        body.insert("callback".into(), token.to_string());
        body.insert("key".into(), key.to_string());
        self.ctx.dispatch_write(dest::GET_STORAGE_ITEM, Params::new(), Some(body))
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        let mut body = Params::new();
        body.insert("key".into(), key.to_string());
        self.ctx.dispatch_write(dest::REMOVE_STORAGE_ITEM, Params::new(), Some(body))
    }

    pub fn clear(&self) -> Result<()> {
        self.ctx.dispatch_write(dest::CLEAR_STORAGE, Params::new(), None)
    }

    /// List stored keys. The callback receives whatever the host answered.
    pub fn keys<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(Value) -> Result<()> + 'static,
    {
        let token = self
            .ctx
            .encode_once_callback(move |args| callback(args.first().cloned().unwrap_or(Value::Null)))?;
        let mut body = Params::new();
        body.insert("callback".into(), token.to_string());
        self.ctx.dispatch_write(dest::GET_STORAGE_KEYS, Params::new(), Some(body))
    }
}

/// Undo the `{"value": item}` wrapping of a host answer.
///
/// Falsy answers and a stored JSON `null` both mean "nothing stored".
fn unwrap_stored(answer: Option<&Value>) -> Result<Option<Value>> {
    let wrapped = match answer {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
        Some(Value::String(text)) if text.is_empty() => return Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => return Ok(None),
        Some(Value::String(text)) => serde_json::from_str::<Value>(text)?,
        Some(other) => other.clone(),
    };
    debug!(answer = %wrapped, "storage answer");
    match wrapped {
        Value::Null => Ok(None),
        Value::Object(mut object) => Ok(Some(object.remove("value").unwrap_or(Value::Null))),
        _ => Ok(Some(Value::Null)),
    }
}
