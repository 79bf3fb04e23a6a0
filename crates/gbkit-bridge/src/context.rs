// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge context.
//
// The single owner of everything a page shares across calls: the detected
// environment, the dispatcher, the callback registry, named handlers, the
// stashed page data, and the lifecycle hooks. Created once per page with
// `BridgeContext::new` and torn down with `dispose`; after disposal every
// operation fails with `ContextDisposed`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gbkit_core::wire::{self, dest};
use gbkit_core::{BridgeConfig, BridgeError, CallbackToken, Environment, Params, Platform, Result};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use crate::callbacks::{CallbackFn, CallbackRegistry};
use crate::channel::channel_for;
use crate::dispatcher::Dispatcher;
use crate::environment::{DetectedEnvironment, EnvironmentSignals};
use crate::traits::{HostPage, LinkClick};

/// A lifecycle hook set by page code.
pub type HookFn = Box<dyn FnMut() -> Result<()>>;

/// Lifecycle notifications the host sends to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Load,
    Appear,
    Login,
    Logout,
    UserUpdate,
}

impl Lifecycle {
    /// Logged when the page never set a hook for this event.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Load => {
                "The custom code has been loaded. To handle this event you can use the gb.onload property."
            }
            Self::Appear => {
                "The custom code appared on the screen. To handle this event you can use the gb.onappear property."
            }
            Self::Login => {
                "An user has been logged in. To handle this event you can use the gb.user.onlogin property."
            }
            Self::Logout => {
                "An user has been logged out. To handle this event you can use the gb.user.onlogout property."
            }
            Self::UserUpdate => {
                "The logged in user has been updated. To handle this event you can use the gb.user.onupdate property."
            }
        }
    }
}

/// Page data written by the host.
#[derive(Debug, Default)]
struct PageState {
    /// Values assigned with `gbWebsiteSetData`.
    values: HashMap<String, Value>,
    /// The `_GB` namespace, merged key by key.
    global_data: Map<String, Value>,
    plugin_initialized: bool,
    links_intercepted: bool,
}

/// Name of the page global mirroring the merged host data.
pub const GLOBAL_DATA_NAME: &str = "_GB";

pub struct BridgeContext {
    config: BridgeConfig,
    detected: DetectedEnvironment,
    page: Rc<dyn HostPage>,
    dispatcher: Dispatcher,
    callbacks: RefCell<CallbackRegistry>,
    handlers: RefCell<HashMap<String, CallbackFn>>,
    hooks: RefCell<HashMap<Lifecycle, HookFn>>,
    state: RefCell<PageState>,
    disposed: Cell<bool>,
    this: Weak<BridgeContext>,
}

impl BridgeContext {
    /// Detect the environment once and build the matching channel.
    #[instrument(skip_all, fields(page = page.page_name()))]
    pub fn new(config: BridgeConfig, page: Rc<dyn HostPage>) -> Rc<Self> {
        let config = config.with_page_href(&page.location_href());
        let signals = EnvironmentSignals::from_page(page.as_ref(), &config);
        let detected = DetectedEnvironment::detect(&signals);
        let dispatcher = Dispatcher::new(
            channel_for(detected.environment(), &config),
            config.debugging_mode,
        );
        info!(
            environment = %detected.environment(),
            platform = detected.platform().as_str(),
            debugging = config.debugging_mode.level(),
            "bridge context created"
        );
        Rc::new_cyclic(|this| Self {
            config,
            detected,
            page,
            dispatcher,
            callbacks: RefCell::new(CallbackRegistry::new()),
            handlers: RefCell::new(HashMap::new()),
            hooks: RefCell::new(HashMap::new()),
            state: RefCell::new(PageState::default()),
            disposed: Cell::new(false),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn page(&self) -> &dyn HostPage {
        self.page.as_ref()
    }

    pub fn detected(&self) -> DetectedEnvironment {
        self.detected
    }

    pub fn environment(&self) -> Environment {
        self.detected.environment()
    }

    pub fn platform(&self) -> Platform {
        self.detected.platform()
    }

    /// Weak handle for closures the page keeps.
    pub fn downgrade(&self) -> Weak<BridgeContext> {
        self.this.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.get() {
            Err(BridgeError::ContextDisposed)
        } else {
            Ok(())
        }
    }

    // -- Outbound ----------------------------------------------------------

    pub fn dispatch_read(&self, destination: &str, query: Params) -> Result<()> {
        self.ensure_live()?;
        self.dispatcher
            .dispatch_read(self.page.as_ref(), destination, query)
    }

    pub fn dispatch_write(&self, destination: &str, query: Params, body: Option<Params>) -> Result<()> {
        self.ensure_live()?;
        self.dispatcher
            .dispatch_write(self.page.as_ref(), destination, query, body)
    }

    /// Log through the host on iOS, to the page console elsewhere.
    pub fn log(&self, text: &str) -> Result<()> {
        self.ensure_live()?;
        if self.environment() == Environment::NativeIOS {
            let mut body = Params::new();
            body.insert("log".into(), text.to_string());
            self.dispatch_write(dest::LOG, Params::new(), Some(body))
        } else {
            self.page.console_log(text);
            Ok(())
        }
    }

    // -- Callbacks ---------------------------------------------------------

    /// Register a persistent callback and return its token.
    pub fn encode_callback<F>(&self, callback: F) -> Result<CallbackToken>
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.ensure_live()?;
        Ok(self.callbacks.borrow_mut().encode(callback))
    }

    /// Register a callback retired after its first delivery.
    pub fn encode_once_callback<F>(&self, callback: F) -> Result<CallbackToken>
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.ensure_live()?;
        Ok(self.callbacks.borrow_mut().encode_once(callback))
    }

    /// Register an exactly-once success/error pair.
    pub fn encode_completion<S, E>(&self, success: S, error: E) -> Result<(CallbackToken, CallbackToken)>
    where
        S: FnMut(&[Value]) -> Result<()> + 'static,
        E: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.ensure_live()?;
        Ok(self.callbacks.borrow_mut().encode_pair(success, error))
    }

    /// Decode `token` and call it with `args`.
    ///
    /// The registry is not borrowed while the callback runs, so callbacks may
    /// dispatch or register further callbacks.
    #[instrument(skip(self, args), fields(args = args.len()))]
    pub fn invoke_callback(&self, token: &str, args: &[Value]) -> Result<()> {
        self.ensure_live()?;
        let mut checkout = self.callbacks.borrow_mut().check_out(token)?;
        let result = checkout.call(args);
        self.callbacks.borrow_mut().check_in(checkout);
        result
    }

    pub fn release_callback(&self, token: &str) -> bool {
        self.callbacks.borrow_mut().release(token)
    }

    pub fn has_callback(&self, token: &str) -> bool {
        self.callbacks.borrow().contains(token)
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Register a handler reachable by method name, e.g. `gbDidSuccessGetLocation`.
    pub fn register_handler<F>(&self, name: &str, handler: F)
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        debug!(name, "named handler registered");
        self.handlers
            .borrow_mut()
            .insert(name.to_string(), Box::new(handler));
    }

    pub fn remove_handler(&self, name: &str) -> bool {
        self.handlers.borrow_mut().remove(name).is_some()
    }

    /// Deliver `args` to whatever answers to `name`: a registry token, then a
    /// named handler, then a page global function. Returns `false` when
    /// nothing did.
    pub fn invoke_named(&self, name: &str, args: &[Value]) -> Result<bool> {
        if self.invoke_handler(name, args)? {
            return Ok(true);
        }
        self.page.call_global(name, args)
    }

    /// Like [`invoke_named`](Self::invoke_named) without the page-global
    /// fallback. Used by globals the bridge itself installs.
    pub fn invoke_handler(&self, name: &str, args: &[Value]) -> Result<bool> {
        self.ensure_live()?;
        if self.has_callback(name) {
            self.invoke_callback(name, args)?;
            return Ok(true);
        }

        let taken = self.handlers.borrow_mut().remove(name);
        let Some(mut handler) = taken else {
            return Ok(false);
        };
        let result = handler(args);
        self.handlers
            .borrow_mut()
            .entry(name.to_string())
            .or_insert(handler);
        result.map(|()| true)
    }

    // -- Lifecycle ---------------------------------------------------------

    pub fn set_hook<F>(&self, event: Lifecycle, hook: F)
    where
        F: FnMut() -> Result<()> + 'static,
    {
        self.hooks.borrow_mut().insert(event, Box::new(hook));
    }

    pub fn clear_hook(&self, event: Lifecycle) {
        self.hooks.borrow_mut().remove(&event);
    }

    /// Run the hook for `event`, or log its default message.
    pub fn fire(&self, event: Lifecycle) -> Result<()> {
        self.ensure_live()?;
        info!(?event, "lifecycle event");
        let taken = self.hooks.borrow_mut().remove(&event);
        match taken {
            Some(mut hook) => {
                let result = hook();
                self.hooks.borrow_mut().entry(event).or_insert(hook);
                result
            }
            None => self.log(event.default_message()),
        }
    }

    // -- Page state --------------------------------------------------------

    /// Assign a named value and mirror it into the page's global scope.
    pub fn set_data(&self, name: &str, value: Value) -> Result<()> {
        self.ensure_live()?;
        self.page.set_global(name, &value)?;
        self.state.borrow_mut().values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn data(&self, name: &str) -> Option<Value> {
        self.state.borrow().values.get(name).cloned()
    }

    /// Merge one key into `_GB`, keeping every other key.
    pub fn store_global_data(&self, key: &str, value: Value) -> Result<()> {
        self.ensure_live()?;
        let snapshot = {
            let mut state = self.state.borrow_mut();
            state.global_data.insert(key.to_string(), value);
            Value::Object(state.global_data.clone())
        };
        self.page.set_global(GLOBAL_DATA_NAME, &snapshot)
    }

    pub fn global_data(&self) -> Map<String, Value> {
        self.state.borrow().global_data.clone()
    }

    fn global_string(&self, key: &str) -> Option<String> {
        match self.state.borrow().global_data.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// `_GB.href`: the URL the host considers current for this page.
    pub fn href(&self) -> Option<String> {
        self.global_string("href")
    }

    /// `_GB.params`, as sent by the host.
    pub fn params(&self) -> Option<Value> {
        self.state.borrow().global_data.get("params").cloned()
    }

    /// `_GB.contextUUID`.
    pub fn context_uuid(&self) -> Option<String> {
        self.global_string("contextUUID")
    }

    pub fn plugin_initialized(&self) -> bool {
        self.state.borrow().plugin_initialized
    }

    /// Mark the plugin initialised and, inside a frame, take over link clicks
    /// so they reach the host instead of navigating the frame. Idempotent.
    pub fn init_plugin(&self) -> Result<()> {
        self.ensure_live()?;
        let install = {
            let mut state = self.state.borrow_mut();
            state.plugin_initialized = true;
            let install = !state.links_intercepted && self.page.is_nested_frame();
            state.links_intercepted |= install;
            install
        };
        if !install {
            return Ok(());
        }

        let weak = self.downgrade();
        self.page.intercept_links(Box::new(move |click: &LinkClick| {
            if !click.should_intercept() {
                return false;
            }
            let Some(ctx) = weak.upgrade() else {
                return false;
            };
            match ctx.forward_link(&click.href) {
                Ok(()) => true,
                Err(err) => {
                    warn!(href = %click.href, %err, "intercepted link not forwarded; browser navigates");
                    false
                }
            }
        }))?;
        info!("link interception installed");
        Ok(())
    }

    /// Hand a clicked link to the hosting frame as `{url: href}`, whatever the
    /// environment. Failure leaves the click to the browser.
    fn forward_link(&self, href: &str) -> Result<()> {
        self.ensure_live()?;
        debug!(%href, "forwarding link to parent frame");
        self.page.post_to_parent(&json!({ "url": href }))
    }

    /// The session token carried by dev-mode requests.
    pub fn session_token(&self) -> &str {
        self.config.session_token()
    }

    /// Append the session token to `url`.
    pub fn authorised_url(&self, url: &str) -> String {
        wire::append_session_token(url, self.session_token())
    }

    /// Drop every callback, handler, and hook. Further use fails.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let dropped = self.callbacks.borrow().len();
        self.callbacks.borrow_mut().clear();
        self.handlers.borrow_mut().clear();
        self.hooks.borrow_mut().clear();
        info!(dropped_callbacks = dropped, "bridge context disposed");
    }
}

impl std::fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("page", &self.page.page_name())
            .field("detected", &self.detected)
            .field("dispatcher", &self.dispatcher)
            .field("callbacks", &self.callbacks)
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stub::{PageCall, PageProfile, RecordingPage};

    fn context(page: RecordingPage) -> (Rc<RecordingPage>, Rc<BridgeContext>) {
        let page = Rc::new(page);
        let ctx = BridgeContext::new(BridgeConfig::default(), page.clone());
        (page, ctx)
    }

    #[test]
    fn environment_is_detected_once_from_the_page() {
        let (_, ios) = context(RecordingPage::ios());
        assert_eq!(ios.environment(), Environment::NativeIOS);
        assert_eq!(ios.platform(), Platform::Ios);
        assert_eq!(ios.session_token(), "ios-token");

        let (_, hosted) = context(RecordingPage::hosted());
        assert!(hosted.detected().is_hosted_web());

        let (_, dev) = context(RecordingPage::desktop());
        assert!(dev.detected().is_standalone_dev());
        assert_eq!(dev.session_token(), "");
    }

    #[test]
    fn callbacks_may_reenter_the_context() {
        let (page, ctx) = context(RecordingPage::ios());
        let weak = ctx.downgrade();
        let token = ctx
            .encode_callback(move |_| {
                let ctx = weak.upgrade().expect("alive");
                ctx.encode_callback(|_| Ok(()))?;
                ctx.dispatch_read(dest::PRINT, Params::new())
            })
            .expect("encode");

        ctx.invoke_callback(token.as_str(), &[]).expect("invoke");
        assert_eq!(ctx.pending_callbacks(), 2);
        assert_eq!(page.calls().len(), 1);
    }

    #[test]
    fn named_delivery_prefers_tokens_then_handlers_then_globals() {
        let (page, ctx) = context(RecordingPage::hosted());
        let hits = Rc::new(RefCell::new(Vec::new()));

        let sink = hits.clone();
        let token = ctx
            .encode_callback(move |_| {
                sink.borrow_mut().push("token");
                Ok(())
            })
            .expect("encode");
        let sink = hits.clone();
        ctx.register_handler("onShare", move |_| {
            sink.borrow_mut().push("handler");
            Ok(())
        });
        let sink = hits.clone();
        page.define_global_function("onGlobal", move |_| {
            sink.borrow_mut().push("global");
            Ok(())
        });

        assert!(ctx.invoke_named(token.as_str(), &[]).expect("token"));
        assert!(ctx.invoke_named("onShare", &[]).expect("handler"));
        assert!(ctx.invoke_named("onGlobal", &[]).expect("global"));
        assert!(!ctx.invoke_named("nobody", &[]).expect("nothing"));

        assert!(ctx.invoke_handler("onShare", &[]).expect("handler"));
        assert!(!ctx.invoke_handler("onGlobal", &[]).expect("globals are skipped"));
        assert_eq!(*hits.borrow(), vec!["token", "handler", "global", "handler"]);
    }

    #[test]
    fn global_data_merges_and_mirrors_to_the_page() {
        let (page, ctx) = context(RecordingPage::hosted());
        ctx.store_global_data("href", json!("https://site.example/a")).expect("store");
        ctx.store_global_data("contextUUID", json!("c-1")).expect("store");

        assert_eq!(ctx.href().as_deref(), Some("https://site.example/a"));
        assert_eq!(ctx.context_uuid().as_deref(), Some("c-1"));
        assert_eq!(ctx.params(), None);
        assert_eq!(
            page.global(GLOBAL_DATA_NAME),
            Some(json!({"href": "https://site.example/a", "contextUUID": "c-1"}))
        );
    }

    #[test]
    fn lifecycle_defaults_log_and_hooks_replace_them() {
        let (page, ctx) = context(RecordingPage::desktop());
        ctx.fire(Lifecycle::Load).expect("fire");
        assert_eq!(
            page.take_calls(),
            vec![PageCall::ConsoleLog(Lifecycle::Load.default_message().into())]
        );

        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        ctx.set_hook(Lifecycle::Load, move || {
            sink.set(sink.get() + 1);
            Ok(())
        });
        ctx.fire(Lifecycle::Load).expect("fire");
        ctx.fire(Lifecycle::Load).expect("fire again");
        assert_eq!(count.get(), 2);
        assert!(page.calls().is_empty());
    }

    #[test]
    fn ios_log_goes_through_the_host() {
        let (page, ctx) = context(RecordingPage::ios());
        ctx.log("hello").expect("log");
        assert_eq!(
            page.calls(),
            vec![PageCall::WebkitMessage(
                r#"{"url":"goodbarber://log","params":{"log":"hello"}}"#.into()
            )]
        );
    }

    #[test]
    fn init_plugin_intercepts_links_once_inside_frames() {
        let (page, ctx) = context(RecordingPage::hosted());
        ctx.init_plugin().expect("init");
        ctx.init_plugin().expect("init twice");
        assert!(ctx.plugin_initialized());
        assert_eq!(
            page.take_calls(),
            vec![PageCall::InterceptLinks],
            "the interceptor is installed once"
        );

        assert!(page.click_link("/articles/7", "https:"));
        assert!(!page.click_link("#top", "https:"));
        assert!(!page.click_link("javascript:void(0)", "javascript:"));
        assert_eq!(page.calls(), vec![PageCall::ParentMessage(json!({"url": "/articles/7"}))]);
    }

    #[test]
    fn framed_development_pages_post_links_to_the_parent() {
        let framed = RecordingPage::new(PageProfile {
            nested_frame: true,
            has_parent: true,
            ..Default::default()
        });
        let (page, ctx) = context(framed);
        ctx.init_plugin().expect("init");
        page.take_calls();

        assert!(page.click_link("https://other.example/page", "https:"));
        assert!(page.click_link("goodbarber://navigate.back", "goodbarber:"));
        assert_eq!(
            page.calls(),
            vec![
                PageCall::ParentMessage(json!({"url": "https://other.example/page"})),
                PageCall::ParentMessage(json!({"url": "goodbarber://navigate.back"})),
            ]
        );
    }

    #[test]
    fn failed_forward_lets_the_browser_navigate() {
        let orphaned = RecordingPage::new(PageProfile {
            nested_frame: true,
            has_parent: false,
            ..Default::default()
        });
        let (page, ctx) = context(orphaned);
        ctx.init_plugin().expect("init");
        page.take_calls();

        assert!(!page.click_link("https://other.example/page", "https:"));
        assert!(page.calls().is_empty());

        let (hosted, ctx) = context(RecordingPage::hosted());
        ctx.init_plugin().expect("init");
        ctx.dispose();
        hosted.take_calls();
        assert!(!hosted.click_link("/articles/7", "https:"));
    }

    #[test]
    fn top_level_pages_keep_their_links() {
        let (page, ctx) = context(RecordingPage::desktop());
        ctx.init_plugin().expect("init");
        assert!(ctx.plugin_initialized());
        assert!(page.calls().is_empty());
    }

    #[test]
    fn disposed_context_refuses_work() {
        let (page, ctx) = context(RecordingPage::ios());
        let token = ctx.encode_callback(|_| Ok(())).expect("encode");
        ctx.dispose();
        ctx.dispose();

        assert!(ctx.is_disposed());
        assert_eq!(ctx.pending_callbacks(), 0);
        assert!(matches!(
            ctx.invoke_callback(token.as_str(), &[]),
            Err(BridgeError::ContextDisposed)
        ));
        assert!(matches!(
            ctx.dispatch_read(dest::PRINT, Params::new()),
            Err(BridgeError::ContextDisposed)
        ));
        assert!(page.calls().is_empty());
    }
}
