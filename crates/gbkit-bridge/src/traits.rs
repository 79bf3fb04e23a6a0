// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the page hosting the bridge.
//
// Everything the bridge touches in its surroundings (native message handlers,
// the parent frame, navigation, dialogs, the network, geolocation, and the
// page's global scope) goes through these traits. The `web` module implements
// them over `web-sys`; the `stub` module records calls for desktop builds and
// tests.

use std::time::Duration;

use gbkit_core::payloads::GbCoordinate;
use gbkit_core::{GeolocationError, HttpRequest, HttpResponse, Result};
use serde_json::Value;

/// Handler for `message` events; receives the event's `data`.
pub type MessageHandler = Box<dyn FnMut(Value)>;

/// Handler for link clicks. Returns `true` when it took the navigation over,
/// in which case the page must prevent the default action.
pub type LinkHandler = Box<dyn FnMut(&LinkClick) -> bool>;

/// Completion for a page-issued HTTP request. `Err` carries a transport failure description.
pub type HttpCompletion = Box<dyn FnOnce(std::result::Result<HttpResponse, String>)>;

/// Completion for a browser geolocation lookup.
pub type PositionCompletion = Box<dyn FnOnce(std::result::Result<GbCoordinate, GeolocationError>)>;

/// A click on an `<a>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClick {
    /// Raw `href` attribute, empty when missing.
    pub href: String,
    /// Resolved `protocol` of the anchor, e.g. `https:` or `javascript:`.
    pub protocol: String,
}

impl LinkClick {
    /// Whether the bridge should take this click over: everything except
    /// same-page anchors and script pseudo-links.
    pub fn should_intercept(&self) -> bool {
        !self.href.starts_with('#') && !self.protocol.starts_with("javascript")
    }
}

/// Unified page surface grouping every capability the bridge needs.
pub trait HostPage:
    PageSignals
    + NativeMessaging
    + FrameMessaging
    + PageNavigation
    + PageConsole
    + PageNetwork
    + PageGeolocation
    + PageGlobals
{
    /// Human-readable name of the implementation (e.g. "browser", "recording stub").
    fn page_name(&self) -> &str;
}

/// Ambient signals the environment detector reads.
pub trait PageSignals {
    fn user_agent(&self) -> String;

    /// Full URL of the page, including the query string.
    fn location_href(&self) -> String;

    /// Platform name from the host-injected device info, if any.
    fn device_platform(&self) -> Option<String>;

    /// Hosted-website flag set by the embedder before load.
    fn hosted_mode_flag(&self) -> bool;

    /// Whether the page runs inside a frame (`self !== top`).
    fn is_nested_frame(&self) -> bool;

    fn has_parent_frame(&self) -> bool;
}

/// Native webview bridges.
pub trait NativeMessaging {
    /// Post a JSON string to the iOS `gbObserver` script message handler.
    fn post_webkit_message(&self, message: &str) -> Result<()>;

    /// Call `Android.post(url, body)`. `None` passes `undefined`.
    fn android_post(&self, url: &str, body: Option<&str>) -> Result<()>;
}

/// Cross-frame messaging with the hosting website.
pub trait FrameMessaging {
    /// `parent.postMessage(message, "*")`.
    fn post_to_parent(&self, message: &Value) -> Result<()>;

    /// Subscribe to `message` events for the lifetime of the page.
    fn listen_for_messages(&self, handler: MessageHandler) -> Result<()>;

    /// Subscribe to clicks on links anywhere in the page.
    fn intercept_links(&self, handler: LinkHandler) -> Result<()>;
}

pub trait PageNavigation {
    /// Replace the current location after a zero-delay timer, so consecutive
    /// calls in one tick coalesce to the last one.
    fn replace_location_next_tick(&self, url: &str) -> Result<()>;

    /// Open the browser print dialog.
    fn open_print_dialog(&self) -> Result<()>;
}

pub trait PageConsole {
    /// Blocking alert.
    fn alert(&self, text: &str);

    fn console_log(&self, text: &str);
}

pub trait PageNetwork {
    /// Start a request from the page itself. The completion runs later, on the page thread.
    fn http_request(&self, request: HttpRequest, completion: HttpCompletion) -> Result<()>;
}

pub trait PageGeolocation {
    /// Ask the browser for the current position.
    fn current_position(&self, timeout: Duration, completion: PositionCompletion) -> Result<()>;
}

/// The page's global scope, where page scripts define handler functions.
pub trait PageGlobals {
    fn set_global(&self, name: &str, value: &Value) -> Result<()>;

    /// Call the global function `name` with `args`. Returns `false` when no
    /// such function exists. Errors thrown by the function propagate.
    fn call_global(&self, name: &str, args: &[Value]) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(href: &str, protocol: &str) -> LinkClick {
        LinkClick {
            href: href.into(),
            protocol: protocol.into(),
        }
    }

    #[test]
    fn ordinary_links_are_intercepted() {
        assert!(click("https://example.org", "https:").should_intercept());
        assert!(click("/articles/1", "https:").should_intercept());
        assert!(click("", "https:").should_intercept());
    }

    #[test]
    fn anchors_and_script_links_are_left_alone() {
        assert!(!click("#top", "https:").should_intercept());
        assert!(!click("javascript:void(0)", "javascript:").should_intercept());
    }
}
