// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pre-2.0 entry points, kept for pages written against the `gb*` globals.

use gbkit_bridge::BridgeContext;
use gbkit_core::wire::dest;
use gbkit_core::{MediaSource, Params, Result};
use serde_json::{Map, Value};

use crate::gb::Gb;
use crate::request::RequestSettings;

/// Raw access to the dispatcher.
#[derive(Debug)]
pub struct Deprecated<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> Deprecated<'a> {
    pub(crate) fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Navigation-style dispatch of an arbitrary destination.
    pub fn plugin_request(&self, destination: &str, query: Params) -> Result<()> {
        self.ctx.dispatch_read(destination, query)
    }
}

impl Gb {
    /// `gbRequest`: POST with `post_params` when asked to, GET otherwise.
    /// The tag and cache arguments are no longer used by the host.
    pub fn gb_request(
        &self,
        resource_url: &str,
        _tag: &str,
        _cache: bool,
        request_method: &str,
        post_params: Option<Map<String, Value>>,
    ) -> Result<()> {
        if request_method == "POST" {
            let settings = RequestSettings {
                params: post_params,
                ..Default::default()
            };
            self.request().post(resource_url, settings)
        } else {
            self.request().get(resource_url, RequestSettings::new())
        }
    }

    pub fn gb_share(&self, share_text: &str, share_link: &str) -> Result<()> {
        self.share(share_text, share_link)
    }

    /// `gbGetMedia`: photos unless `media_type` is something else.
    pub fn gb_get_media(&self, media_type: Option<&str>, media_source: Option<&str>) -> Result<()> {
        let source = media_source.map(MediaSource::from_name).unwrap_or_default();
        match media_type.unwrap_or("photo") {
            "photo" | "" => self.get_photo(source),
            _ => self.get_video(source),
        }
    }

    pub fn gb_get_location(&self) -> Result<()> {
        self.get_location()
    }

    pub fn gb_get_timezone_offset(&self) -> Result<()> {
        self.get_timezone_offset()
    }

    /// Answered by the host through `gbDidSuccessGetUser`.
    pub fn gb_get_user(&self) -> Result<()> {
        self.deprecated().plugin_request(dest::LEGACY_GET_USER, Params::new())
    }

    pub fn gb_logs(&self, log: &str) -> Result<()> {
        self.log(log)
    }

    pub fn gb_alert(&self, title: &str, message: &str) -> Result<()> {
        self.alert(title, message)
    }

    pub fn gb_print(&self) -> Result<()> {
        self.print()
    }
}
