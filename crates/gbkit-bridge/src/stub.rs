// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording page for desktop builds and tests, where no webview exists.
//
// Every trait call is appended to an in-order log and traced. Asynchronous
// completions (HTTP, geolocation) are parked until a test resolves them, and
// inbound messages or link clicks can be injected as if the page produced them.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use gbkit_core::payloads::GbCoordinate;
use gbkit_core::{BridgeError, Environment, GeolocationError, HttpRequest, HttpResponse, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::traits::*;

/// One observed interaction with the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCall {
    WebkitMessage(String),
    AndroidPost { url: String, body: Option<String> },
    ParentMessage(Value),
    ReplaceLocation(String),
    PrintDialog,
    Alert(String),
    ConsoleLog(String),
    Http(HttpRequest),
    Geolocation { timeout: Duration },
    SetGlobal { name: String, value: Value },
    CallGlobal { name: String, args: Vec<Value> },
    ListenForMessages,
    InterceptLinks,
}

/// Ambient signals and available objects of the simulated page.
#[derive(Debug, Clone)]
pub struct PageProfile {
    pub user_agent: String,
    pub href: String,
    pub device_platform: Option<String>,
    pub hosted_mode: bool,
    pub nested_frame: bool,
    pub has_parent: bool,
    pub webkit_handler: bool,
    pub android_bridge: bool,
}

impl Default for PageProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0".into(),
            href: "http://localhost:8080/index.html".into(),
            device_platform: None,
            hosted_mode: false,
            nested_frame: false,
            has_parent: false,
            webkit_handler: false,
            android_bridge: false,
        }
    }
}

type GlobalFn = Box<dyn FnMut(&[Value]) -> Result<()>>;

/// Page double that records instead of acting.
#[derive(Default)]
pub struct RecordingPage {
    profile: PageProfile,
    calls: RefCell<Vec<PageCall>>,
    message_handlers: RefCell<Vec<MessageHandler>>,
    link_handlers: RefCell<Vec<LinkHandler>>,
    pending_http: RefCell<VecDeque<(HttpRequest, HttpCompletion)>>,
    pending_positions: RefCell<VecDeque<PositionCompletion>>,
    globals: RefCell<HashMap<String, Value>>,
    global_functions: RefCell<HashMap<String, GlobalFn>>,
}

impl RecordingPage {
    pub fn new(profile: PageProfile) -> Self {
        Self {
            profile,
            ..Default::default()
        }
    }

    /// Plain desktop browser: no host signals at all.
    pub fn desktop() -> Self {
        Self::new(PageProfile::default())
    }

    /// iOS webview with device info and the `gbObserver` handler.
    pub fn ios() -> Self {
        Self::new(PageProfile {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15".into(),
            href: "file:///app/customcode/index.html?gbToken=ios-token".into(),
            device_platform: Some("ios".into()),
            webkit_handler: true,
            ..Default::default()
        })
    }

    /// Android webview with device info and the `Android` object.
    pub fn android() -> Self {
        Self::new(PageProfile {
            user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36".into(),
            href: "file:///android_asset/customcode/index.html?gbToken=android-token".into(),
            device_platform: Some("android".into()),
            android_bridge: true,
            ..Default::default()
        })
    }

    /// Iframe inside the hosted website.
    pub fn hosted() -> Self {
        Self::new(PageProfile {
            href: "https://site.example/plugin/index.html?gbToken=web-token".into(),
            hosted_mode: true,
            nested_frame: true,
            has_parent: true,
            ..Default::default()
        })
    }

    /// Same page with the native bridge objects missing.
    pub fn without_native_bridges(mut self) -> Self {
        self.profile.webkit_handler = false;
        self.profile.android_bridge = false;
        self
    }

    pub fn profile(&self) -> &PageProfile {
        &self.profile
    }

    /// Everything recorded so far, in order.
    pub fn calls(&self) -> Vec<PageCall> {
        self.calls.borrow().clone()
    }

    /// Recorded calls, clearing the log.
    pub fn take_calls(&self) -> Vec<PageCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Deliver a `message` event to every registered listener.
    pub fn deliver_message(&self, data: Value) {
        // Handlers are taken out so they may call back into this page.
        let mut handlers = std::mem::take(&mut *self.message_handlers.borrow_mut());
        for handler in handlers.iter_mut() {
            handler(data.clone());
        }
        let mut slot = self.message_handlers.borrow_mut();
        handlers.append(&mut slot);
        *slot = handlers;
    }

    /// Simulate a click on a link. Returns whether a handler took it over.
    pub fn click_link(&self, href: &str, protocol: &str) -> bool {
        let click = LinkClick {
            href: href.into(),
            protocol: protocol.into(),
        };
        let mut handlers = std::mem::take(&mut *self.link_handlers.borrow_mut());
        let mut prevented = false;
        for handler in handlers.iter_mut() {
            prevented |= handler(&click);
        }
        let mut slot = self.link_handlers.borrow_mut();
        handlers.append(&mut slot);
        *slot = handlers;
        prevented
    }

    pub fn pending_http(&self) -> usize {
        self.pending_http.borrow().len()
    }

    /// Complete the oldest outstanding HTTP request.
    pub fn resolve_http(&self, outcome: std::result::Result<HttpResponse, String>) -> Option<HttpRequest> {
        let (request, completion) = self.pending_http.borrow_mut().pop_front()?;
        completion(outcome);
        Some(request)
    }

    /// Complete the oldest outstanding geolocation lookup.
    pub fn resolve_position(
        &self,
        outcome: std::result::Result<GbCoordinate, GeolocationError>,
    ) -> bool {
        let Some(completion) = self.pending_positions.borrow_mut().pop_front() else {
            return false;
        };
        completion(outcome);
        true
    }

    /// Define a function in the simulated global scope.
    pub fn define_global_function<F>(&self, name: &str, function: F)
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.global_functions
            .borrow_mut()
            .insert(name.to_string(), Box::new(function));
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    fn record(&self, call: PageCall) {
        debug!(?call, "recording page call");
        self.calls.borrow_mut().push(call);
    }
}

impl HostPage for RecordingPage {
    fn page_name(&self) -> &str {
        "recording stub"
    }
}

impl PageSignals for RecordingPage {
    fn user_agent(&self) -> String {
        self.profile.user_agent.clone()
    }

    fn location_href(&self) -> String {
        self.profile.href.clone()
    }

    fn device_platform(&self) -> Option<String> {
        self.profile.device_platform.clone()
    }

    fn hosted_mode_flag(&self) -> bool {
        self.profile.hosted_mode
    }

    fn is_nested_frame(&self) -> bool {
        self.profile.nested_frame
    }

    fn has_parent_frame(&self) -> bool {
        self.profile.has_parent
    }
}

impl NativeMessaging for RecordingPage {
    fn post_webkit_message(&self, message: &str) -> Result<()> {
        if !self.profile.webkit_handler {
            warn!("NativeMessaging::post_webkit_message called without a gbObserver handler");
            return Err(BridgeError::unavailable(
                Environment::NativeIOS,
                "window.webkit.messageHandlers.gbObserver is missing",
            ));
        }
        self.record(PageCall::WebkitMessage(message.to_string()));
        Ok(())
    }

    fn android_post(&self, url: &str, body: Option<&str>) -> Result<()> {
        if !self.profile.android_bridge {
            warn!("NativeMessaging::android_post called without an Android object");
            return Err(BridgeError::unavailable(
                Environment::NativeAndroid,
                "window.Android is missing",
            ));
        }
        self.record(PageCall::AndroidPost {
            url: url.to_string(),
            body: body.map(str::to_string),
        });
        Ok(())
    }
}

impl FrameMessaging for RecordingPage {
    fn post_to_parent(&self, message: &Value) -> Result<()> {
        if !self.profile.has_parent {
            return Err(BridgeError::unavailable(
                Environment::HostedWeb,
                "page has no parent frame",
            ));
        }
        self.record(PageCall::ParentMessage(message.clone()));
        Ok(())
    }

    fn listen_for_messages(&self, handler: MessageHandler) -> Result<()> {
        self.record(PageCall::ListenForMessages);
        self.message_handlers.borrow_mut().push(handler);
        Ok(())
    }

    fn intercept_links(&self, handler: LinkHandler) -> Result<()> {
        self.record(PageCall::InterceptLinks);
        self.link_handlers.borrow_mut().push(handler);
        Ok(())
    }
}

impl PageNavigation for RecordingPage {
    fn replace_location_next_tick(&self, url: &str) -> Result<()> {
        self.record(PageCall::ReplaceLocation(url.to_string()));
        Ok(())
    }

    fn open_print_dialog(&self) -> Result<()> {
        self.record(PageCall::PrintDialog);
        Ok(())
    }
}

impl PageConsole for RecordingPage {
    fn alert(&self, text: &str) {
        self.record(PageCall::Alert(text.to_string()));
    }

    fn console_log(&self, text: &str) {
        self.record(PageCall::ConsoleLog(text.to_string()));
    }
}

impl PageNetwork for RecordingPage {
    fn http_request(&self, request: HttpRequest, completion: HttpCompletion) -> Result<()> {
        self.record(PageCall::Http(request.clone()));
        self.pending_http.borrow_mut().push_back((request, completion));
        Ok(())
    }
}

impl PageGeolocation for RecordingPage {
    fn current_position(&self, timeout: Duration, completion: PositionCompletion) -> Result<()> {
        self.record(PageCall::Geolocation { timeout });
        self.pending_positions.borrow_mut().push_back(completion);
        Ok(())
    }
}

impl PageGlobals for RecordingPage {
    fn set_global(&self, name: &str, value: &Value) -> Result<()> {
        self.record(PageCall::SetGlobal {
            name: name.to_string(),
            value: value.clone(),
        });
        self.globals.borrow_mut().insert(name.to_string(), value.clone());
        Ok(())
    }

    fn call_global(&self, name: &str, args: &[Value]) -> Result<bool> {
        let taken = self.global_functions.borrow_mut().remove(name);
        let Some(mut function) = taken else {
            return Ok(false);
        };
        self.record(PageCall::CallGlobal {
            name: name.to_string(),
            args: args.to_vec(),
        });
        let result = function(args);
        self.global_functions
            .borrow_mut()
            .entry(name.to_string())
            .or_insert(function);
        result.map(|()| true)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    #[test]
    fn desktop_page_has_no_native_objects() {
        let page = RecordingPage::desktop();
        assert!(page.post_webkit_message("{}").is_err());
        assert!(page.android_post("goodbarber://x", None).is_err());
        assert!(page.post_to_parent(&json!({})).is_err());
        assert!(page.calls().is_empty());
    }

    #[test]
    fn injected_messages_reach_listeners() {
        let page = RecordingPage::hosted();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        page.listen_for_messages(Box::new(move |data: Value| sink.borrow_mut().push(data)))
            .expect("listen");
        page.deliver_message(json!({"method": "gbWebsiteOnLoad"}));
        page.deliver_message(json!({"method": "gbWebsiteOnAppear"}));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn global_functions_are_called_by_name() {
        let page = RecordingPage::hosted();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        page.define_global_function("onPhoto", move |args| {
            *sink.borrow_mut() = Some(args.to_vec());
            Ok(())
        });
        assert!(page.call_global("onPhoto", &[json!("data:image/png")]).expect("call"));
        assert!(!page.call_global("missing", &[]).expect("call"));
        assert_eq!(*seen.borrow(), Some(vec![json!("data:image/png")]));
    }

    #[test]
    fn http_completions_wait_for_resolution() {
        let page = RecordingPage::desktop();
        let status = Rc::new(RefCell::new(None));
        let sink = status.clone();
        page.http_request(
            HttpRequest::get("https://a/b"),
            Box::new(move |outcome: std::result::Result<HttpResponse, String>| *sink.borrow_mut() = Some(outcome.map(|r| r.status))),
        )
        .expect("request");
        assert_eq!(page.pending_http(), 1);
        assert!(status.borrow().is_none());

        page.resolve_http(Ok(HttpResponse { status: 200, body: "ok".into() }));
        assert_eq!(*status.borrow(), Some(Ok(200)));
    }
}
