// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound event router.
//
// Every `message` event from the hosting frame lands in `on_message`, which
// extracts `{ method, params }` and dispatches on the method name. Handling is
// synchronous and in delivery order.

use std::rc::Rc;

use gbkit_core::{Environment, InboundEvent, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::context::{BridgeContext, Lifecycle};

/// Method names reserved by the hosting website.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedMethod {
    InitPlugin,
    SetData,
    StoreGlobalData,
    OnLoad,
    OnAppear,
    OnLogin,
    OnLogout,
}

impl ReservedMethod {
    pub const ALL: [ReservedMethod; 7] = [
        Self::InitPlugin,
        Self::SetData,
        Self::StoreGlobalData,
        Self::OnLoad,
        Self::OnAppear,
        Self::OnLogin,
        Self::OnLogout,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::InitPlugin => "gbWebsiteInitPlugin",
            Self::SetData => "gbWebsiteSetData",
            Self::StoreGlobalData => "gbWebsiteStoreGBGlobalData",
            Self::OnLoad => "gbWebsiteOnLoad",
            Self::OnAppear => "gbWebsiteOnAppear",
            Self::OnLogin => "gbWebsiteOnLogin",
            Self::OnLogout => "gbWebsiteOnLogout",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.wire_name() == name)
    }
}

/// Subscribe the router to the page's `message` events.
pub fn listen(ctx: &Rc<BridgeContext>) -> Result<()> {
    let weak = Rc::downgrade(ctx);
    ctx.page().listen_for_messages(Box::new(move |data: Value| {
        let Some(ctx) = weak.upgrade() else {
            return;
        };
        if let Err(err) = on_message(&ctx, &data) {
            warn!(%err, "inbound message failed");
        }
    }))
}

/// Route one `MessageEvent.data` payload.
#[instrument(skip_all)]
pub fn on_message(ctx: &BridgeContext, data: &Value) -> Result<()> {
    let Some(event) = InboundEvent::from_message_data(data) else {
        debug!("message without a method name ignored");
        return Ok(());
    };
    route(ctx, &event)
}

#[instrument(skip_all, fields(method = %event.method))]
pub fn route(ctx: &BridgeContext, event: &InboundEvent) -> Result<()> {
    let hosted = ctx.environment() == Environment::HostedWeb;
    match ReservedMethod::from_wire(&event.method) {
        Some(ReservedMethod::InitPlugin) => ctx.init_plugin(),
        Some(ReservedMethod::SetData) if hosted => match event.arg(0).as_str() {
            Some(name) => ctx.set_data(name, event.arg(1).clone()),
            None => {
                warn!("gbWebsiteSetData without a variable name ignored");
                Ok(())
            }
        },
        Some(ReservedMethod::StoreGlobalData) => match event.arg(0).as_str() {
            Some(key) => ctx.store_global_data(key, event.arg(1).clone()),
            None => {
                warn!("gbWebsiteStoreGBGlobalData without a key ignored");
                Ok(())
            }
        },
        Some(ReservedMethod::OnLoad) => ctx.fire(Lifecycle::Load),
        Some(ReservedMethod::OnAppear) => ctx.fire(Lifecycle::Appear),
        Some(ReservedMethod::OnLogin) => ctx.fire(Lifecycle::Login),
        Some(ReservedMethod::OnLogout) => ctx.fire(Lifecycle::Logout),
        _ if hosted => {
            if !ctx.invoke_named(&event.method, &event.params)? {
                debug!("no handler for inbound method");
            }
            Ok(())
        }
        _ => {
            debug!("inbound method outside hosted mode ignored");
            Ok(())
        }
    }
}

/// Direct callback convention used by native hosts: `gbCallback(token, values)`.
pub fn deliver_callback(ctx: &BridgeContext, token: &str, args: &[Value]) -> Result<()> {
    ctx.invoke_callback(token, args)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::cell::RefCell;

    use gbkit_core::{BridgeConfig, BridgeError};
    use serde_json::json;

    use super::*;
    use crate::context::GLOBAL_DATA_NAME;
    use crate::stub::{PageCall, RecordingPage};

    fn context(page: RecordingPage) -> (Rc<RecordingPage>, Rc<BridgeContext>) {
        let page = Rc::new(page);
        let ctx = BridgeContext::new(BridgeConfig::default(), page.clone());
        listen(&ctx).expect("listen");
        page.take_calls();
        (page, ctx)
    }

    #[test]
    fn wire_names_round_trip() {
        for method in ReservedMethod::ALL {
            assert_eq!(ReservedMethod::from_wire(method.wire_name()), Some(method));
        }
        assert_eq!(ReservedMethod::from_wire("gbWebsiteOnload"), None);
    }

    #[test]
    fn global_data_store_merges() {
        let (page, ctx) = context(RecordingPage::hosted());
        page.deliver_message(json!({"method": "gbWebsiteStoreGBGlobalData", "params": ["a", 1]}));
        page.deliver_message(json!({"method": "gbWebsiteStoreGBGlobalData", "params": ["b", 2]}));

        assert_eq!(page.global(GLOBAL_DATA_NAME), Some(json!({"a": 1, "b": 2})));
        assert_eq!(ctx.global_data().len(), 2);
    }

    #[test]
    fn set_data_applies_only_when_hosted() {
        let (page, ctx) = context(RecordingPage::hosted());
        page.deliver_message(json!({"method": "gbWebsiteSetData", "params": ["gbUserInfo", {"id": 4}]}));
        assert_eq!(ctx.data("gbUserInfo"), Some(json!({"id": 4})));
        assert_eq!(page.global("gbUserInfo"), Some(json!({"id": 4})));

        let (native, ctx) = context(RecordingPage::ios());
        native.deliver_message(json!({"method": "gbWebsiteSetData", "params": ["gbUserInfo", 1]}));
        assert_eq!(ctx.data("gbUserInfo"), None);
        assert!(native.calls().is_empty());
    }

    #[test]
    fn unknown_methods_without_a_target_do_nothing() {
        let (page, ctx) = context(RecordingPage::hosted());
        on_message(&ctx, &json!({"method": "gbNobodyListens", "params": [1]})).expect("ignored");
        on_message(&ctx, &json!("not an object")).expect("ignored");
        on_message(&ctx, &json!({"params": []})).expect("ignored");
        assert!(page.calls().is_empty());
    }

    #[test]
    fn hosted_callbacks_resolve_by_name() {
        let (page, ctx) = context(RecordingPage::hosted());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let token = ctx
            .encode_callback(move |args| {
                sink.borrow_mut().extend_from_slice(args);
                Ok(())
            })
            .expect("encode");

        page.deliver_message(json!({"method": token.as_str(), "params": ["v", 2]}));
        assert_eq!(*seen.borrow(), vec![json!("v"), json!(2)]);
    }

    #[test]
    fn native_pages_ignore_unreserved_names() {
        let (page, ctx) = context(RecordingPage::android());
        let token = ctx
            .encode_callback(|_| Err(BridgeError::Callback("must not run".into())))
            .expect("encode");
        on_message(&ctx, &json!({"method": token.as_str()})).expect("ignored");
        assert!(page.calls().is_empty());
    }

    #[test]
    fn lifecycle_messages_fire_hooks() {
        let (page, ctx) = context(RecordingPage::hosted());
        let fired = Rc::new(RefCell::new(Vec::new()));
        for event in [Lifecycle::Load, Lifecycle::Appear, Lifecycle::Login, Lifecycle::Logout] {
            let sink = fired.clone();
            ctx.set_hook(event, move || {
                sink.borrow_mut().push(event);
                Ok(())
            });
        }
        for method in ["gbWebsiteOnLoad", "gbWebsiteOnAppear", "gbWebsiteOnLogin", "gbWebsiteOnLogout"] {
            page.deliver_message(json!({ "method": method }));
        }
        assert_eq!(
            *fired.borrow(),
            vec![Lifecycle::Load, Lifecycle::Appear, Lifecycle::Login, Lifecycle::Logout]
        );
    }

    #[test]
    fn init_plugin_message_installs_interception() {
        let (page, ctx) = context(RecordingPage::hosted());
        page.deliver_message(json!({"method": "gbWebsiteInitPlugin"}));
        assert!(ctx.plugin_initialized());
        assert_eq!(page.take_calls(), vec![PageCall::InterceptLinks]);

        assert!(page.click_link("https://other.example/", "https:"));
        assert_eq!(
            page.calls(),
            vec![PageCall::ParentMessage(json!({"url": "https://other.example/"}))]
        );
    }

    #[test]
    fn native_hosts_call_back_directly() {
        let (_, ctx) = context(RecordingPage::ios());
        let (ok, fail) = ctx
            .encode_completion(|_| Ok(()), |_| Ok(()))
            .expect("encode");
        deliver_callback(&ctx, ok.as_str(), &[json!({"id": 1})]).expect("deliver");
        assert!(matches!(
            deliver_callback(&ctx, fail.as_str(), &[]),
            Err(BridgeError::CompletionAlreadyDelivered(_))
        ));
    }

    #[test]
    fn dropped_context_stops_listening() {
        let page = Rc::new(RecordingPage::hosted());
        let ctx = BridgeContext::new(BridgeConfig::default(), page.clone());
        listen(&ctx).expect("listen");
        drop(ctx);
        page.take_calls();
        page.deliver_message(json!({"method": "gbWebsiteStoreGBGlobalData", "params": ["a", 1]}));
        assert!(page.calls().is_empty());
    }
}
