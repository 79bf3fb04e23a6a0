// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end checks of the top-level capabilities against a recording page.

#![cfg(not(target_arch = "wasm32"))]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gbkit_bridge::stub::{PageCall, PageProfile, RecordingPage};
use gbkit_core::payloads::GbCoordinate;
use gbkit_core::{BridgeError, GeolocationError};
use gbkit_sdk::{BridgeConfig, Environment, Gb, MediaSource, Params, Platform};
use serde_json::json;

fn attach(page: RecordingPage) -> (Rc<RecordingPage>, Gb) {
    gbkit_sdk::telemetry::init_tracing();
    let page = Rc::new(page);
    let gb = Gb::new(BridgeConfig::default(), page.clone()).expect("attach");
    assert_eq!(page.take_calls(), vec![PageCall::ListenForMessages]);
    (page, gb)
}

fn webkit(url: &str) -> PageCall {
    PageCall::WebkitMessage(json!({ "url": url }).to_string())
}

#[test]
fn share_on_ios_sends_one_structured_message() {
    let (page, gb) = attach(RecordingPage::ios());
    gb.share("hello", "http://x").expect("share");
    assert_eq!(
        page.calls(),
        vec![webkit("goodbarber://share?text=hello&link=http%3A%2F%2Fx")]
    );
}

#[test]
fn media_requests_name_type_and_source() {
    let (page, gb) = attach(RecordingPage::android());
    gb.get_photo(MediaSource::default()).expect("photo");
    gb.get_video(MediaSource::Camera).expect("video");
    assert_eq!(
        page.calls(),
        vec![
            PageCall::ReplaceLocation("goodbarber://getmedia?type=photo&source=all".into()),
            PageCall::ReplaceLocation("goodbarber://getmedia?type=video&source=camera".into()),
        ]
    );
}

#[test]
fn platform_and_environment_follow_the_page() {
    let (_, ios) = attach(RecordingPage::ios());
    assert_eq!(ios.platform(), Platform::Ios);
    assert_eq!(ios.version(), "2.3.1");

    let (_, hosted) = attach(RecordingPage::hosted());
    assert_eq!(hosted.platform(), Platform::Web);
    assert_eq!(hosted.environment(), Environment::HostedWeb);
}

#[test]
fn alert_is_native_on_ios_and_blocking_elsewhere() {
    let (ios, gb) = attach(RecordingPage::ios());
    gb.alert("Hi there", "ok?").expect("alert");
    assert_eq!(
        ios.calls(),
        vec![webkit("goodbarber://alert?title=Hi%20there&message=ok%3F")]
    );

    let (desktop, gb) = attach(RecordingPage::desktop());
    gb.alert("Hi there", "ok?").expect("alert");
    assert_eq!(desktop.calls(), vec![PageCall::Alert("Hi there\nok?".into())]);
}

#[test]
fn log_goes_to_the_host_only_on_ios() {
    let (ios, gb) = attach(RecordingPage::ios());
    gb.log("trace me").expect("log");
    assert_eq!(
        ios.calls(),
        vec![PageCall::WebkitMessage(
            r#"{"url":"goodbarber://log","params":{"log":"trace me"}}"#.into()
        )]
    );

    let (android, gb) = attach(RecordingPage::android());
    gb.log("trace me").expect("log");
    assert_eq!(android.calls(), vec![PageCall::ConsoleLog("trace me".into())]);
}

#[test]
fn print_uses_the_browser_dialog_when_hosted() {
    let (hosted, gb) = attach(RecordingPage::hosted());
    gb.print().expect("print");
    assert_eq!(hosted.calls(), vec![PageCall::PrintDialog]);

    let (ios, gb) = attach(RecordingPage::ios());
    gb.print().expect("print");
    assert_eq!(ios.calls(), vec![webkit("goodbarber://print")]);
}

#[test]
fn init_announces_framed_pages_outside_the_website() {
    let framed = RecordingPage::new(PageProfile {
        has_parent: true,
        ..Default::default()
    });
    let (page, gb) = attach(framed);
    gb.init().expect("init");
    assert_eq!(
        page.calls(),
        vec![PageCall::ParentMessage(json!({"url": "goodbarber://init"}))]
    );

    let (hosted, gb) = attach(RecordingPage::hosted());
    gb.init().expect("init");
    assert!(hosted.calls().is_empty());

    let (top, gb) = attach(RecordingPage::desktop());
    gb.init().expect("init");
    assert!(top.calls().is_empty());
}

#[test]
fn native_location_is_asked_of_the_host() {
    let (page, gb) = attach(RecordingPage::ios());
    gb.get_location().expect("location");
    gb.get_timezone_offset().expect("timezone");
    assert_eq!(
        page.calls(),
        vec![
            webkit("goodbarber://getlocation"),
            webkit("goodbarber://gettimezoneoffset"),
        ]
    );
}

#[test]
fn standalone_location_uses_the_browser() {
    let (page, gb) = attach(RecordingPage::desktop());
    let positions = Rc::new(RefCell::new(Vec::new()));
    let failures = Rc::new(RefCell::new(Vec::new()));
    let (p, f) = (positions.clone(), failures.clone());
    gb.on_location(
        move |coordinate| {
            p.borrow_mut().push(coordinate);
            Ok(())
        },
        move |reason| {
            f.borrow_mut().push(reason);
            Ok(())
        },
    );

    gb.get_location().expect("location");
    assert_eq!(
        page.calls(),
        vec![PageCall::Geolocation { timeout: Duration::from_millis(15_000) }]
    );
    assert!(page.resolve_position(Ok(GbCoordinate { latitude: 48.85, longitude: 2.35 })));

    gb.get_location().expect("location");
    assert!(page.resolve_position(Err(GeolocationError::PermissionDenied)));

    assert_eq!(
        *positions.borrow(),
        vec![GbCoordinate { latitude: 48.85, longitude: 2.35 }]
    );
    assert_eq!(*failures.borrow(), vec![GeolocationError::PermissionDenied]);
}

#[test]
fn standalone_location_falls_back_to_page_globals() {
    let (page, gb) = attach(RecordingPage::desktop());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    page.define_global_function("gbDidFailGetLocation", move |args| {
        sink.borrow_mut().extend_from_slice(args);
        Ok(())
    });
    gb.get_location().expect("location");
    page.resolve_position(Err(GeolocationError::Timeout));
    assert_eq!(*seen.borrow(), vec![json!("Timeout")]);
}

#[test]
fn host_scheme_is_unavailable_in_standalone_development() {
    let (page, gb) = attach(RecordingPage::desktop());
    let err = gb.share("a", "b").expect_err("no host");
    assert!(matches!(
        err,
        BridgeError::TransportUnavailable { environment: Environment::StandaloneDev, .. }
    ));
    assert!(page.calls().is_empty());
}

#[test]
fn location_navigation() {
    let (page, gb) = attach(RecordingPage::hosted());
    gb.location().back().expect("back");
    gb.location().open("https://example.org/a b").expect("open");
    gb.location().navigate_to("/articles/3").expect("navigate");
    assert_eq!(
        page.calls(),
        vec![
            PageCall::ParentMessage(json!({"url": "goodbarber://navigate.back"})),
            PageCall::ParentMessage(json!({
                "url": "goodbarber://openExternal?url=https%3A%2F%2Fexample.org%2Fa%20b"
            })),
            PageCall::ParentMessage(json!({"url": "/articles/3"})),
        ]
    );
}

#[test]
fn mail_outside_a_host_navigates_to_mailto() {
    let (page, gb) = attach(RecordingPage::desktop());
    gb.location().mail("a@b.c", "Hi you", "x&y").expect("mail");
    assert_eq!(
        page.calls(),
        vec![PageCall::ReplaceLocation("mailto:a@b.c?subject=Hi%20you&body=x%26y".into())]
    );
}

#[test]
fn maps_native_and_fallback() {
    let (ios, gb) = attach(RecordingPage::ios());
    gb.location().maps(Params::new()).expect("empty maps");
    let mut query = Params::new();
    query.insert("q".into(), "Paris".into());
    gb.location().maps(query.clone()).expect("maps");
    assert_eq!(
        ios.calls(),
        vec![webkit("goodbarber://maps?q="), webkit("goodbarber://maps?q=Paris")]
    );

    let (hosted, gb) = attach(RecordingPage::hosted());
    gb.location().maps(query).expect("fallback");
    assert_eq!(
        hosted.calls(),
        vec![PageCall::ParentMessage(json!({
            "url": "goodbarber://openExternal?url=https%3A%2F%2Fmaps.google.com%2Fmaps%3Fq%3DParis"
        }))]
    );
}

#[test]
fn stored_global_data_backs_href_params_and_context() {
    let (page, gb) = attach(RecordingPage::hosted());
    assert_eq!(gb.location().href(), "");
    assert_eq!(gb.location().params(), json!({}));
    assert_eq!(gb.device().context_uuid(), "");

    for (key, value) in [
        ("href", json!("https://site.example/p/1")),
        ("params", json!({"id": "1"})),
        ("contextUUID", json!("ctx-9")),
    ] {
        page.deliver_message(json!({
            "method": "gbWebsiteStoreGBGlobalData",
            "params": [key, value],
        }));
    }
    assert_eq!(gb.location().href(), "https://site.example/p/1");
    assert_eq!(gb.location().params(), json!({"id": "1"}));
    assert_eq!(gb.device().context_uuid(), "ctx-9");
}

#[test]
fn lifecycle_hooks_run_on_host_events() {
    let (page, gb) = attach(RecordingPage::hosted());
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    gb.on_appear(move || {
        sink.borrow_mut().push("appear");
        Ok(())
    });
    let sink = events.clone();
    gb.user().on_logout(move || {
        sink.borrow_mut().push("logout");
        Ok(())
    });

    page.deliver_message(json!({"method": "gbWebsiteOnAppear"}));
    page.deliver_message(json!({"method": "gbWebsiteOnLogout"}));
    page.deliver_message(json!({"method": "gbWebsiteOnLoad"}));

    assert_eq!(*events.borrow(), vec!["appear", "logout"]);
    assert_eq!(
        page.calls(),
        vec![PageCall::ConsoleLog(
            "The custom code has been loaded. To handle this event you can use the gb.onload property."
                .into()
        )]
    );
}

#[test]
fn disposed_handle_refuses_dispatch() {
    let (page, gb) = attach(RecordingPage::ios());
    gb.dispose();
    assert!(matches!(gb.share("a", "b"), Err(BridgeError::ContextDisposed)));
    assert!(page.calls().is_empty());
}
