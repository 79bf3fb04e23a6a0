// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JavaScript surface of the bridge.
//
// Page scripts construct a `GbBridge` and call its methods; native hosts call
// the global `gbCallback(token, values)`; old pages keep using the `gb*`
// globals. JS functions handed in as completions are stored in the callback
// registry of the live handle and only their token crosses to the host.
//
// This module is cfg-gated to `target_arch = "wasm32"`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;

use gbkit_bridge::{BridgeContext, Lifecycle};
use gbkit_core::{BridgeConfig, BridgeError, CallbackToken, MediaSource, Params, Result};
use js_sys::{Array, Function};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;

use crate::gb::{Gb, LOCATION_FAILURE, LOCATION_SUCCESS};
use crate::request::RequestSettings;
use crate::telemetry;

thread_local! {
    /// The handle the global entry points talk to.
    static ACTIVE: RefCell<Option<Gb>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() {
    telemetry::init_tracing();
    install_host_globals();
}

/// Put the entry points native hosts evaluate on the global object:
/// `gbCallback(token, values)` and the location answer handlers. A function
/// the page already defined under one of these names is left in place.
pub fn install_host_globals() {
    let callback = Closure::<dyn FnMut(JsValue, JsValue)>::new(|token: JsValue, values: JsValue| {
        let Some(token) = token.as_string() else {
            warn!("gbCallback called without a token");
            return;
        };
        if let Err(err) = deliver_from_host(&token, values) {
            warn!(%token, %err, "gbCallback delivery failed");
        }
    });
    install_global("gbCallback", callback.into_js_value());
    for name in [LOCATION_SUCCESS, LOCATION_FAILURE] {
        install_global(name, handler_trampoline(name));
    }
}

fn install_global(name: &str, function: JsValue) {
    let global = js_sys::global();
    let key = JsValue::from_str(name);
    let existing = js_sys::Reflect::get(&global, &key).unwrap_or(JsValue::UNDEFINED);
    if existing.is_function() {
        debug!(name, "page defines this global; not replacing it");
        return;
    }
    match js_sys::Reflect::set(&global, &key, &function) {
        Ok(true) => debug!(name, "host global installed"),
        Ok(false) | Err(_) => warn!(name, "could not install host global"),
    }
}

/// Global that forwards its arguments to the handler registered under `name`.
fn handler_trampoline(name: &'static str) -> JsValue {
    Closure::<dyn FnMut(JsValue, JsValue)>::new(move |first: JsValue, second: JsValue| {
        let outcome = host_args(&[first, second])
            .and_then(|args| active()?.context().invoke_handler(name, &args));
        match outcome {
            Ok(true) => {}
            Ok(false) => warn!(name, "host answered but no handler is registered"),
            Err(err) => warn!(name, %err, "host answer failed"),
        }
    })
    .into_js_value()
}

fn host_args(values: &[JsValue]) -> Result<Vec<Value>> {
    values
        .iter()
        .filter(|value| !value.is_undefined())
        .map(|value| from_js(value.clone()))
        .collect()
}

fn active() -> Result<Gb> {
    // Cloned out so callbacks may construct or dispose a handle.
    ACTIVE
        .with(|active| active.borrow().clone())
        .ok_or_else(|| BridgeError::Callback("gb is not initialised; construct a GbBridge first".into()))
}

fn deliver_from_host(token: &str, values: JsValue) -> Result<()> {
    let values: Vec<Value> = if values.is_undefined() || values.is_null() {
        Vec::new()
    } else {
        from_js(values)?
    };
    active()?.deliver_callback(token, &values)
}

fn js_err(err: BridgeError) -> JsError {
    JsError::new(&err.to_string())
}

fn to_js(value: &Value) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| BridgeError::Encode(e.to_string()))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| BridgeError::Decode(e.to_string()))
}

/// Wrap a JS function so it can be registered. Anything else is an `Encode` error.
fn js_function(value: JsValue) -> Result<Function> {
    value
        .dyn_into::<Function>()
        .map_err(|other| BridgeError::Encode(format!("expected a function, got {other:?}")))
}

fn call_js(function: &Function, args: &[Value]) -> Result<()> {
    let js_args = Array::new();
    for arg in args {
        js_args.push(&to_js(arg)?);
    }
    function
        .apply(&JsValue::NULL, &js_args)
        .map(|_| ())
        .map_err(|e| BridgeError::Callback(format!("{e:?}")))
}

/// Register a JS function as a persistent callback.
pub fn encode_js(ctx: &BridgeContext, value: JsValue) -> Result<CallbackToken> {
    let function = js_function(value)?;
    ctx.encode_callback(move |args| call_js(&function, args))
}

/// Optional JS completion as a boxed callback.
fn optional_js(value: JsValue) -> Result<Option<gbkit_bridge::CallbackFn>> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    let function = js_function(value)?;
    Ok(Some(Box::new(move |args: &[Value]| call_js(&function, args))))
}

fn with_active<T>(f: impl FnOnce(&Gb) -> Result<T>) -> std::result::Result<T, JsError> {
    active().and_then(|gb| f(&gb)).map_err(js_err)
}

/// `gbCallback(token, values)`: completion delivery from native hosts.
#[wasm_bindgen(js_name = gbCallback)]
pub fn gb_callback(token: &str, values: JsValue) -> std::result::Result<(), JsError> {
    deliver_from_host(token, values).map_err(js_err)
}

#[wasm_bindgen(js_name = GbBridge)]
pub struct GbBridge {
    gb: Gb,
}

#[wasm_bindgen(js_class = GbBridge)]
impl GbBridge {
    /// Attach to this page. `config` is an optional `BridgeConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<GbBridge, JsError> {
        let config: BridgeConfig = if config.is_undefined() || config.is_null() {
            BridgeConfig::default()
        } else {
            from_js(config).map_err(js_err)?
        };
        let gb = Gb::attach(config).map_err(js_err)?;
        gb.init().map_err(js_err)?;
        info!(environment = %gb.environment(), "GbBridge attached");
        ACTIVE.with(|active| *active.borrow_mut() = Some(gb.clone()));
        Ok(GbBridge { gb })
    }

    pub fn version(&self) -> String {
        self.gb.version().to_string()
    }

    pub fn platform(&self) -> String {
        self.gb.platform().as_str().to_string()
    }

    pub fn share(&self, text: Option<String>, link: Option<String>) -> std::result::Result<(), JsError> {
        self.gb
            .share(text.as_deref().unwrap_or_default(), link.as_deref().unwrap_or_default())
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = getPhoto)]
    pub fn get_photo(&self, source: Option<String>) -> std::result::Result<(), JsError> {
        let source = source.as_deref().map(MediaSource::from_name).unwrap_or_default();
        self.gb.get_photo(source).map_err(js_err)
    }

    #[wasm_bindgen(js_name = getVideo)]
    pub fn get_video(&self, source: Option<String>) -> std::result::Result<(), JsError> {
        let source = source.as_deref().map(MediaSource::from_name).unwrap_or_default();
        self.gb.get_video(source).map_err(js_err)
    }

    #[wasm_bindgen(js_name = getLocation)]
    pub fn get_location(&self) -> std::result::Result<(), JsError> {
        self.gb.get_location().map_err(js_err)
    }

    #[wasm_bindgen(js_name = getTimezoneOffset)]
    pub fn get_timezone_offset(&self) -> std::result::Result<(), JsError> {
        self.gb.get_timezone_offset().map_err(js_err)
    }

    pub fn log(&self, text: &str) -> std::result::Result<(), JsError> {
        self.gb.log(text).map_err(js_err)
    }

    pub fn alert(&self, title: &str, message: &str) -> std::result::Result<(), JsError> {
        self.gb.alert(title, message).map_err(js_err)
    }

    pub fn print(&self) -> std::result::Result<(), JsError> {
        self.gb.print().map_err(js_err)
    }

    /// Set `onload`, `onappear`, `onlogin`, `onlogout`, or `onupdate`.
    #[wasm_bindgen(js_name = setHook)]
    pub fn set_hook(&self, name: &str, hook: JsValue) -> std::result::Result<(), JsError> {
        let event = match name {
            "onload" => Lifecycle::Load,
            "onappear" => Lifecycle::Appear,
            "onlogin" => Lifecycle::Login,
            "onlogout" => Lifecycle::Logout,
            "onupdate" => Lifecycle::UserUpdate,
            other => return Err(JsError::new(&format!("unknown lifecycle hook `{other}`"))),
        };
        let function = js_function(hook).map_err(js_err)?;
        self.gb
            .context()
            .set_hook(event, move || call_js(&function, &[]));
        Ok(())
    }

    #[wasm_bindgen(js_name = userUpdated)]
    pub fn user_updated(&self) -> std::result::Result<(), JsError> {
        self.gb.user().updated().map_err(js_err)
    }

    // -- location ----------------------------------------------------------

    #[wasm_bindgen(js_name = locationHref)]
    pub fn location_href(&self) -> String {
        self.gb.location().href()
    }

    #[wasm_bindgen(js_name = locationParams)]
    pub fn location_params(&self) -> std::result::Result<JsValue, JsError> {
        to_js(&self.gb.location().params()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = navigateTo)]
    pub fn navigate_to(&self, url: &str) -> std::result::Result<(), JsError> {
        self.gb.location().navigate_to(url).map_err(js_err)
    }

    pub fn back(&self) -> std::result::Result<(), JsError> {
        self.gb.location().back().map_err(js_err)
    }

    pub fn open(&self, url: &str) -> std::result::Result<(), JsError> {
        self.gb.location().open(url).map_err(js_err)
    }

    pub fn mail(
        &self,
        to: Option<String>,
        subject: Option<String>,
        body: Option<String>,
    ) -> std::result::Result<(), JsError> {
        self.gb
            .location()
            .mail(
                to.as_deref().unwrap_or_default(),
                subject.as_deref().unwrap_or_default(),
                body.as_deref().unwrap_or_default(),
            )
            .map_err(js_err)
    }

    pub fn maps(&self, params: JsValue) -> std::result::Result<(), JsError> {
        let params: Params = if params.is_undefined() || params.is_null() {
            Params::new()
        } else {
            from_js(params).map_err(js_err)?
        };
        self.gb.location().maps(params).map_err(js_err)
    }

    // -- storage -----------------------------------------------------------

    #[wasm_bindgen(js_name = storageSetItem)]
    pub fn storage_set_item(&self, key: &str, item: JsValue) -> std::result::Result<(), JsError> {
        let item: Value = if item.is_undefined() {
            Value::Null
        } else {
            from_js(item).map_err(js_err)?
        };
        self.gb.storage().set_item(key, &item).map_err(js_err)
    }

    /// The callback is called with no argument when nothing is stored.
    #[wasm_bindgen(js_name = storageGetItem)]
    pub fn storage_get_item(&self, key: &str, callback: JsValue) -> std::result::Result<(), JsError> {
        let function = js_function(callback).map_err(js_err)?;
        self.gb
            .storage()
            .get_item(key, move |value| match value {
                Some(value) => call_js(&function, &[value]),
                None => call_js(&function, &[]),
            })
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = storageRemoveItem)]
    pub fn storage_remove_item(&self, key: &str) -> std::result::Result<(), JsError> {
        self.gb.storage().remove_item(key).map_err(js_err)
    }

    #[wasm_bindgen(js_name = storageClear)]
    pub fn storage_clear(&self) -> std::result::Result<(), JsError> {
        self.gb.storage().clear().map_err(js_err)
    }

    #[wasm_bindgen(js_name = storageKeys)]
    pub fn storage_keys(&self, callback: JsValue) -> std::result::Result<(), JsError> {
        let function = js_function(callback).map_err(js_err)?;
        self.gb
            .storage()
            .keys(move |keys| call_js(&function, &[keys]))
            .map_err(js_err)
    }

    // -- files -------------------------------------------------------------

    #[wasm_bindgen(js_name = filesFetch)]
    pub fn files_fetch(
        &self,
        filename: &str,
        success: JsValue,
        error: JsValue,
    ) -> std::result::Result<(), JsError> {
        let success = optional_js(success).map_err(js_err)?;
        let error = optional_js(error).map_err(js_err)?;
        self.gb
            .files()
            .fetch(
                filename,
                move |text| {
                    if let Some(mut success) = success {
                        if let Err(err) = success(&[Value::String(text)]) {
                            warn!(%err, "files.fetch success callback failed");
                        }
                    }
                },
                move |failure| {
                    if let Some(mut error) = error {
                        if let Err(err) = error(&[failure.to_value()]) {
                            warn!(%err, "files.fetch error callback failed");
                        }
                    }
                },
            )
            .map_err(js_err)
    }

    // -- request -----------------------------------------------------------

    /// `settings` may carry `params`, `headers`, `success`, and `error`.
    pub fn request(&self, method: &str, url: &str, settings: JsValue) -> std::result::Result<(), JsError> {
        let method = match method.to_ascii_uppercase().as_str() {
            "GET" => gbkit_core::HttpMethod::Get,
            "POST" => gbkit_core::HttpMethod::Post,
            "PATCH" => gbkit_core::HttpMethod::Patch,
            "PUT" => gbkit_core::HttpMethod::Put,
            "DELETE" => gbkit_core::HttpMethod::Delete,
            other => return Err(JsError::new(&format!("unsupported method `{other}`"))),
        };
        let settings = request_settings(settings).map_err(js_err)?;
        self.gb.request().send(url, method, settings).map_err(js_err)
    }

    // -- user and membership -------------------------------------------------

    #[wasm_bindgen(js_name = userGetCurrent)]
    pub fn user_get_current(&self, success: JsValue, error: JsValue) -> std::result::Result<(), JsError> {
        let success = js_function(success).map_err(js_err)?;
        let error = js_function(error).map_err(js_err)?;
        self.gb
            .user()
            .get_current(
                move |user| call_js(&success, &[user]),
                move |failure| call_js(&error, &[failure]),
            )
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = userOpenLogin)]
    pub fn user_open_login(&self) -> std::result::Result<(), JsError> {
        self.gb.user().open_login().map_err(js_err)
    }

    #[wasm_bindgen(js_name = userLogout)]
    pub fn user_logout(&self) -> std::result::Result<(), JsError> {
        self.gb.user().logout().map_err(js_err)
    }

    #[wasm_bindgen(js_name = getAccessLevels)]
    pub fn get_access_levels(&self, success: JsValue, error: JsValue) -> std::result::Result<(), JsError> {
        let success = js_function(success).map_err(js_err)?;
        let error = js_function(error).map_err(js_err)?;
        self.gb
            .membership()
            .get_access_levels(
                move |levels| call_js(&success, &[levels]),
                move |failure| call_js(&error, &[failure]),
            )
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = contextUUID)]
    pub fn context_uuid(&self) -> String {
        self.gb.device().context_uuid()
    }

    /// Register a page function and return the token the host hands back.
    #[wasm_bindgen(js_name = encodeCallback)]
    pub fn encode_callback(&self, function: JsValue) -> std::result::Result<String, JsError> {
        encode_js(self.gb.context(), function)
            .map(|token| token.to_string())
            .map_err(js_err)
    }

    pub fn dispose(&self) {
        self.gb.dispose();
        ACTIVE.with(|active| active.borrow_mut().take());
    }
}

fn request_settings(value: JsValue) -> Result<RequestSettings> {
    let mut settings = RequestSettings::new();
    if value.is_undefined() || value.is_null() {
        return Ok(settings);
    }
    let field = |name: &str| js_sys::Reflect::get(&value, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED);
    let object = |name: &str| -> Result<Option<Map<String, Value>>> {
        let raw = field(name);
        if raw.is_undefined() || raw.is_null() {
            Ok(None)
        } else {
            from_js(raw).map(Some)
        }
    };
    settings.params = object("params")?;
    settings.headers = object("headers")?;
    settings.success = optional_js(field("success"))?;
    settings.error = optional_js(field("error"))?;
    Ok(settings)
}

// -- legacy globals -------------------------------------------------------------

#[wasm_bindgen(js_name = gbRequest)]
pub fn gb_request(
    resource_url: &str,
    tag: Option<String>,
    cache: Option<bool>,
    request_method: Option<String>,
    post_params: JsValue,
) -> std::result::Result<(), JsError> {
    let post_params: Option<Map<String, Value>> = if post_params.is_undefined() || post_params.is_null() {
        None
    } else {
        Some(from_js(post_params).map_err(js_err)?)
    };
    with_active(|gb| {
        gb.gb_request(
            resource_url,
            tag.as_deref().unwrap_or_default(),
            cache.unwrap_or_default(),
            request_method.as_deref().unwrap_or("GET"),
            post_params,
        )
    })
}

#[wasm_bindgen(js_name = gbShare)]
pub fn gb_share(share_text: Option<String>, share_link: Option<String>) -> std::result::Result<(), JsError> {
    with_active(|gb| {
        gb.gb_share(
            share_text.as_deref().unwrap_or_default(),
            share_link.as_deref().unwrap_or_default(),
        )
    })
}

#[wasm_bindgen(js_name = gbGetMedia)]
pub fn gb_get_media(media_type: Option<String>, media_source: Option<String>) -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_get_media(media_type.as_deref(), media_source.as_deref()))
}

#[wasm_bindgen(js_name = gbGetLocation)]
pub fn gb_get_location() -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_get_location())
}

#[wasm_bindgen(js_name = gbGetTimezoneOffset)]
pub fn gb_get_timezone_offset() -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_get_timezone_offset())
}

#[wasm_bindgen(js_name = gbGetUser)]
pub fn gb_get_user() -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_get_user())
}

#[wasm_bindgen(js_name = gbLogs)]
pub fn gb_logs(log: &str) -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_logs(log))
}

#[wasm_bindgen(js_name = gbAlert)]
pub fn gb_alert(title: &str, message: &str) -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_alert(title, message))
}

#[wasm_bindgen(js_name = gbPrint)]
pub fn gb_print() -> std::result::Result<(), JsError> {
    with_active(|gb| gb.gb_print())
}
