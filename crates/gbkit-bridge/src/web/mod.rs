// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Browser page implementation over web-sys.
//
// Host-injected objects (`webkit.messageHandlers.gbObserver`, `Android`,
// `gbUserInfo`, `gbAngularMode`) are not part of any WebIDL, so they are
// reached with `js_sys::Reflect`. Event listeners live as long as the page:
// their closures are kept in the `WebPage` and never removed.
//
// This module is cfg-gated to `target_arch = "wasm32"`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gbkit_core::payloads::GbCoordinate;
use gbkit_core::{
    BridgeError, Environment, GeolocationError, HttpMethod, HttpRequest, HttpResponse, Result,
};
use js_sys::{Array, Function, Reflect};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::JsValue;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Element, Event, HtmlAnchorElement, MessageEvent, Window};

use crate::traits::*;

/// The page the bridge runs in, as seen from wasm.
#[derive(Default)]
pub struct WebPage {
    message_listeners: RefCell<Vec<Closure<dyn FnMut(MessageEvent)>>>,
    click_listeners: RefCell<Vec<Closure<dyn FnMut(Event)>>>,
}

impl WebPage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn window(environment: Environment) -> Result<Window> {
    web_sys::window().ok_or_else(|| BridgeError::unavailable(environment, "no global window"))
}

fn js_error_to_string(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Ok(message) = Reflect::get(&err, &JsValue::from_str("message")) {
        if let Some(text) = message.as_string() {
            return text;
        }
    }
    format!("{err:?}")
}

/// Walk `root.a.b.c`, yielding `None` at the first missing link.
fn lookup(root: &JsValue, path: &[&str]) -> Option<JsValue> {
    let mut current = root.clone();
    for key in path {
        let next = Reflect::get(&current, &JsValue::from_str(key)).ok()?;
        if next.is_undefined() || next.is_null() {
            return None;
        }
        current = next;
    }
    Some(current)
}

fn to_js(value: &Value) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| BridgeError::Encode(e.to_string()))
}

fn from_js(value: JsValue) -> Value {
    serde_wasm_bindgen::from_value(value).unwrap_or(Value::Null)
}

fn number(value: &JsValue, path: &[&str]) -> Option<f64> {
    lookup(value, path)?.as_f64()
}

impl HostPage for WebPage {
    fn page_name(&self) -> &str {
        "browser"
    }
}

impl PageSignals for WebPage {
    fn user_agent(&self) -> String {
        web_sys::window()
            .and_then(|w| w.navigator().user_agent().ok())
            .unwrap_or_default()
    }

    fn location_href(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default()
    }

    fn device_platform(&self) -> Option<String> {
        let window = web_sys::window()?;
        lookup(&window, &["gbUserInfo", "platform"])?.as_string()
    }

    fn hosted_mode_flag(&self) -> bool {
        web_sys::window()
            .and_then(|w| lookup(&w, &["gbAngularMode"]))
            .and_then(|flag| flag.as_bool())
            .unwrap_or(false)
    }

    fn is_nested_frame(&self) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        match window.top() {
            Ok(Some(top)) => JsValue::from(top) != JsValue::from(window),
            // Cross-origin access to `top` throws: we are framed.
            Err(_) => true,
            Ok(None) => false,
        }
    }

    fn has_parent_frame(&self) -> bool {
        web_sys::window()
            .and_then(|w| w.parent().ok().flatten())
            .is_some()
    }
}

impl NativeMessaging for WebPage {
    fn post_webkit_message(&self, message: &str) -> Result<()> {
        let window = window(Environment::NativeIOS)?;
        let handler = lookup(&window, &["webkit", "messageHandlers", "gbObserver"]).ok_or_else(|| {
            BridgeError::unavailable(
                Environment::NativeIOS,
                "window.webkit.messageHandlers.gbObserver is missing",
            )
        })?;
        let post = lookup(&handler, &["postMessage"])
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| {
                BridgeError::unavailable(Environment::NativeIOS, "gbObserver.postMessage is not a function")
            })?;
        post.call1(&handler, &JsValue::from_str(message))
            .map(|_| ())
            .map_err(|e| BridgeError::unavailable(Environment::NativeIOS, js_error_to_string(e)))
    }

    fn android_post(&self, url: &str, body: Option<&str>) -> Result<()> {
        let window = window(Environment::NativeAndroid)?;
        let android = lookup(&window, &["Android"]).ok_or_else(|| {
            BridgeError::unavailable(Environment::NativeAndroid, "window.Android is missing")
        })?;
        let post = lookup(&android, &["post"])
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| {
                BridgeError::unavailable(Environment::NativeAndroid, "Android.post is not a function")
            })?;
        let body = body.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
        post.call2(&android, &JsValue::from_str(url), &body)
            .map(|_| ())
            .map_err(|e| BridgeError::unavailable(Environment::NativeAndroid, js_error_to_string(e)))
    }
}

impl FrameMessaging for WebPage {
    fn post_to_parent(&self, message: &Value) -> Result<()> {
        let parent = window(Environment::HostedWeb)?
            .parent()
            .ok()
            .flatten()
            .ok_or_else(|| BridgeError::unavailable(Environment::HostedWeb, "page has no parent frame"))?;
        parent
            .post_message(&to_js(message)?, "*")
            .map_err(|e| BridgeError::unavailable(Environment::HostedWeb, js_error_to_string(e)))
    }

    fn listen_for_messages(&self, mut handler: MessageHandler) -> Result<()> {
        let window = window(Environment::HostedWeb)?;
        let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
            handler(from_js(event.data()));
        }) as Box<dyn FnMut(MessageEvent)>);
        window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            .map_err(|e| BridgeError::unavailable(Environment::HostedWeb, js_error_to_string(e)))?;
        self.message_listeners.borrow_mut().push(closure);
        debug!("message listener attached");
        Ok(())
    }

    fn intercept_links(&self, mut handler: LinkHandler) -> Result<()> {
        let window = window(Environment::HostedWeb)?;
        let closure = Closure::wrap(Box::new(move |event: Event| {
            let Some(anchor) = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|e| e.closest("a").ok().flatten())
            else {
                return;
            };
            let click = LinkClick {
                href: anchor.get_attribute("href").unwrap_or_default(),
                protocol: anchor
                    .dyn_ref::<HtmlAnchorElement>()
                    .map(|a| a.protocol())
                    .unwrap_or_default(),
            };
            if handler(&click) {
                event.prevent_default();
            }
        }) as Box<dyn FnMut(Event)>);
        window
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
            .map_err(|e| BridgeError::unavailable(Environment::HostedWeb, js_error_to_string(e)))?;
        self.click_listeners.borrow_mut().push(closure);
        Ok(())
    }
}

impl PageNavigation for WebPage {
    fn replace_location_next_tick(&self, url: &str) -> Result<()> {
        let window = window(Environment::NativeAndroid)?;
        let location = window.location();
        let target = url.to_string();
        let callback = Closure::once_into_js(move || {
            if let Err(e) = location.replace(&target) {
                warn!(url = %target, error = %js_error_to_string(e), "location.replace failed");
            }
        });
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
            .map(|_| ())
            .map_err(|e| BridgeError::unavailable(Environment::NativeAndroid, js_error_to_string(e)))
    }

    fn open_print_dialog(&self) -> Result<()> {
        window(Environment::HostedWeb)?
            .print()
            .map_err(|e| BridgeError::unavailable(Environment::HostedWeb, js_error_to_string(e)))
    }
}

impl PageConsole for WebPage {
    fn alert(&self, text: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(text);
        }
    }

    fn console_log(&self, text: &str) {
        web_sys::console::log_1(&JsValue::from_str(text));
    }
}

async fn fetch(request: HttpRequest) -> std::result::Result<HttpResponse, String> {
    let window = web_sys::window().ok_or("no global window")?;
    let init = web_sys::RequestInit::new();
    init.set_method(request.method.as_str());
    if let Some(body) = &request.body {
        init.set_body(&JsValue::from_str(body));
    }
    let js_request = web_sys::Request::new_with_str_and_init(&request.url, &init)
        .map_err(js_error_to_string)?;
    if request.body.is_some() && request.method != HttpMethod::Get {
        js_request
            .headers()
            .set("Content-Type", "application/x-www-form-urlencoded")
            .map_err(js_error_to_string)?;
    }

    let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&js_request))
        .await
        .map_err(js_error_to_string)?
        .dyn_into()
        .map_err(js_error_to_string)?;
    let text = JsFuture::from(response.text().map_err(js_error_to_string)?)
        .await
        .map_err(js_error_to_string)?;
    Ok(HttpResponse {
        status: response.status(),
        body: text.as_string().unwrap_or_default(),
    })
}

impl PageNetwork for WebPage {
    fn http_request(&self, request: HttpRequest, completion: HttpCompletion) -> Result<()> {
        spawn_local(async move {
            completion(fetch(request).await);
        });
        Ok(())
    }
}

impl PageGeolocation for WebPage {
    fn current_position(&self, timeout: Duration, completion: PositionCompletion) -> Result<()> {
        let geolocation = window(Environment::StandaloneDev)?
            .navigator()
            .geolocation()
            .map_err(|e| BridgeError::unavailable(Environment::StandaloneDev, js_error_to_string(e)))?;

        let slot = Rc::new(RefCell::new(Some(completion)));
        let on_error = slot.clone();
        let success = Closure::once_into_js(move |position: JsValue| {
            let coordinate = number(&position, &["coords", "latitude"])
                .zip(number(&position, &["coords", "longitude"]))
                .map(|(latitude, longitude)| GbCoordinate { latitude, longitude })
                .ok_or(GeolocationError::Unknown);
            if let Some(completion) = slot.borrow_mut().take() {
                completion(coordinate);
            }
        });
        let failure = Closure::once_into_js(move |error: JsValue| {
            let code = number(&error, &["code"]).unwrap_or(0.0) as u16;
            if let Some(completion) = on_error.borrow_mut().take() {
                completion(Err(GeolocationError::from_code(code)));
            }
        });

        let options = web_sys::PositionOptions::new();
        options.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        geolocation
            .get_current_position_with_error_callback_and_options(
                success.unchecked_ref(),
                Some(failure.unchecked_ref()),
                &options,
            )
            .map_err(|e| BridgeError::unavailable(Environment::StandaloneDev, js_error_to_string(e)))
    }
}

impl PageGlobals for WebPage {
    fn set_global(&self, name: &str, value: &Value) -> Result<()> {
        let window = window(Environment::HostedWeb)?;
        Reflect::set(&window, &JsValue::from_str(name), &to_js(value)?)
            .map(|_| ())
            .map_err(|e| BridgeError::Encode(js_error_to_string(e)))
    }

    fn call_global(&self, name: &str, args: &[Value]) -> Result<bool> {
        let window = window(Environment::HostedWeb)?;
        let Some(function) = lookup(&window, &[name]).and_then(|f| f.dyn_into::<Function>().ok()) else {
            return Ok(false);
        };
        let js_args = Array::new();
        for arg in args {
            js_args.push(&to_js(arg)?);
        }
        function
            .apply(&window, &js_args)
            .map(|_| true)
            .map_err(|e| BridgeError::Callback(js_error_to_string(e)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wasm_bindgen_test::*;

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn top_level_page_is_not_framed() {
        let page = WebPage::new();
        assert!(!page.is_nested_frame());
        assert!(!page.location_href().is_empty());
    }

    #[wasm_bindgen_test]
    fn globals_round_trip_through_the_window() {
        let page = WebPage::new();
        page.set_global("gbkitTestValue", &json!({"a": 1})).expect("set");
        let window = web_sys::window().expect("window");
        let stored = lookup(&window, &["gbkitTestValue", "a"]).expect("stored");
        assert_eq!(stored.as_f64(), Some(1.0));
        assert!(!page.call_global("gbkitNoSuchFunction", &[]).expect("call"));
    }

    #[wasm_bindgen_test]
    fn missing_native_objects_are_unavailable() {
        let page = WebPage::new();
        assert!(matches!(
            page.android_post("goodbarber://print", None),
            Err(BridgeError::TransportUnavailable { environment: Environment::NativeAndroid, .. })
        ));
        assert!(matches!(
            page.post_webkit_message("{}"),
            Err(BridgeError::TransportUnavailable { environment: Environment::NativeIOS, .. })
        ));
    }
}
