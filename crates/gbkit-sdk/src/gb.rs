// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `Gb` handle: top-level capabilities plus accessors for the grouped ones.

use std::rc::Rc;
use std::time::Duration;

use gbkit_bridge::{BridgeContext, HostPage, Lifecycle, router};
use gbkit_core::payloads::GbCoordinate;
use gbkit_core::wire::{self, dest};
use gbkit_core::{
    BridgeConfig, Environment, GeolocationError, MediaSource, MediaType, Params, Platform, Result,
};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::files::Files;
use crate::legacy::Deprecated;
use crate::location::Location;
use crate::request::Request;
use crate::storage::Storage;
use crate::user::{Membership, User};

/// Protocol version spoken with the host app.
pub const PROTOCOL_VERSION: &str = "2.3.1";

/// Named handler the host (or the browser, in development) answers locations on.
pub const LOCATION_SUCCESS: &str = "gbDidSuccessGetLocation";
pub const LOCATION_FAILURE: &str = "gbDidFailGetLocation";

/// Entry point to every host capability.
#[derive(Debug, Clone)]
pub struct Gb {
    ctx: Rc<BridgeContext>,
}

impl Gb {
    /// Build a context over `page` and start routing its inbound messages.
    pub fn new(config: BridgeConfig, page: Rc<dyn HostPage>) -> Result<Self> {
        let ctx = BridgeContext::new(config, page);
        router::listen(&ctx)?;
        Ok(Self { ctx })
    }

    /// Attach to the page of the compile target.
    pub fn attach(config: BridgeConfig) -> Result<Self> {
        Self::new(config, gbkit_bridge::host_page())
    }

    pub fn context(&self) -> &Rc<BridgeContext> {
        &self.ctx
    }

    pub fn version(&self) -> &'static str {
        PROTOCOL_VERSION
    }

    pub fn platform(&self) -> Platform {
        self.ctx.platform()
    }

    pub fn environment(&self) -> Environment {
        self.ctx.environment()
    }

    /// Announce the page to the hosting frame. Only meaningful when the page
    /// is framed by something other than the hosted website.
    pub fn init(&self) -> Result<()> {
        let page = self.ctx.page();
        if self.environment() == Environment::HostedWeb || !page.has_parent_frame() {
            return Ok(());
        }
        page.post_to_parent(&json!({ "url": dest::INIT }))
    }

    pub fn location(&self) -> Location<'_> {
        Location::new(&self.ctx)
    }

    pub fn storage(&self) -> Storage<'_> {
        Storage::new(&self.ctx)
    }

    pub fn files(&self) -> Files<'_> {
        Files::new(&self.ctx)
    }

    pub fn request(&self) -> Request<'_> {
        Request::new(&self.ctx)
    }

    pub fn user(&self) -> User<'_> {
        User::new(&self.ctx)
    }

    pub fn membership(&self) -> Membership<'_> {
        Membership::new(&self.ctx)
    }

    pub fn device(&self) -> Device<'_> {
        Device { ctx: &self.ctx }
    }

    pub fn deprecated(&self) -> Deprecated<'_> {
        Deprecated::new(&self.ctx)
    }

    /// Open the host's share sheet.
    #[instrument(skip(self))]
    pub fn share(&self, text: &str, link: &str) -> Result<()> {
        let mut query = Params::new();
        query.insert("text".into(), wire::encode_uri_component(text));
        query.insert("link".into(), wire::encode_uri_component(link));
        self.ctx.dispatch_read(dest::SHARE, query)
    }

    pub fn get_photo(&self, source: MediaSource) -> Result<()> {
        self.get_media(MediaType::Photo, source)
    }

    pub fn get_video(&self, source: MediaSource) -> Result<()> {
        self.get_media(MediaType::Video, source)
    }

    fn get_media(&self, media: MediaType, source: MediaSource) -> Result<()> {
        let mut query = Params::new();
        query.insert("type".into(), media.as_str().into());
        query.insert("source".into(), source.as_str().into());
        self.ctx.dispatch_read(dest::GET_MEDIA, query)
    }

    /// Ask for the device position. The answer arrives on the
    /// `gbDidSuccessGetLocation` / `gbDidFailGetLocation` handlers.
    ///
    /// Outside a host the browser is asked directly.
    pub fn get_location(&self) -> Result<()> {
        if !self.ctx.detected().is_standalone_dev() {
            return self.ctx.dispatch_read(dest::GET_LOCATION, Params::new());
        }

        let weak = self.ctx.downgrade();
        let timeout = Duration::from_millis(self.ctx.config().geolocation_timeout_ms);
        self.ctx.page().current_position(
            timeout,
            Box::new(move |outcome: std::result::Result<GbCoordinate, GeolocationError>| {
                let Some(ctx) = weak.upgrade() else {
                    return;
                };
                let delivered = match outcome {
                    Ok(position) => ctx.invoke_named(
                        LOCATION_SUCCESS,
                        &[json!(position.latitude), json!(position.longitude)],
                    ),
                    Err(reason) => ctx.invoke_named(LOCATION_FAILURE, &[json!(reason.to_string())]),
                };
                match delivered {
                    Ok(true) => {}
                    Ok(false) => warn!("location answered but no handler is registered"),
                    Err(err) => warn!(%err, "location handler failed"),
                }
            }),
        )
    }

    /// Register the handlers `get_location` answers on.
    pub fn on_location<S, F>(&self, mut success: S, mut failure: F)
    where
        S: FnMut(GbCoordinate) -> Result<()> + 'static,
        F: FnMut(GeolocationError) -> Result<()> + 'static,
    {
        self.ctx.register_handler(LOCATION_SUCCESS, move |args| {
            let coordinate = GbCoordinate {
                latitude: args.first().and_then(Value::as_f64).unwrap_or_default(),
                longitude: args.get(1).and_then(Value::as_f64).unwrap_or_default(),
            };
            success(coordinate)
        });
        self.ctx.register_handler(LOCATION_FAILURE, move |args| {
            let reason = args.first().and_then(Value::as_str).unwrap_or_default();
            failure(geolocation_reason(reason))
        });
    }

    pub fn get_timezone_offset(&self) -> Result<()> {
        self.ctx.dispatch_read(dest::GET_TIMEZONE_OFFSET, Params::new())
    }

    /// Log through the host on iOS, to the console elsewhere.
    pub fn log(&self, text: &str) -> Result<()> {
        self.ctx.log(text)
    }

    /// Native alert on iOS, a blocking page alert elsewhere.
    pub fn alert(&self, title: &str, message: &str) -> Result<()> {
        if self.environment() == Environment::NativeIOS {
            let destination = format!(
                "{}?title={}&message={}",
                dest::ALERT,
                wire::encode_uri_component(title),
                wire::encode_uri_component(message)
            );
            return self.ctx.dispatch_read(&destination, Params::new());
        }
        self.ctx.page().alert(&format!("{title}\n{message}"));
        Ok(())
    }

    /// Print through the host, or the browser dialog on the hosted website.
    pub fn print(&self) -> Result<()> {
        if self.environment() == Environment::HostedWeb {
            self.ctx.page().open_print_dialog()
        } else {
            self.ctx.dispatch_read(dest::PRINT, Params::new())
        }
    }

    pub fn on_load<F>(&self, hook: F)
    where
        F: FnMut() -> Result<()> + 'static,
    {
        self.ctx.set_hook(Lifecycle::Load, hook);
    }

    pub fn on_appear<F>(&self, hook: F)
    where
        F: FnMut() -> Result<()> + 'static,
    {
        self.ctx.set_hook(Lifecycle::Appear, hook);
    }

    /// Deliver a `gbCallback(token, values)` call from a native host.
    pub fn deliver_callback(&self, token: &str, values: &[Value]) -> Result<()> {
        router::deliver_callback(&self.ctx, token, values)
    }

    /// Tear the context down. Pending callbacks are dropped.
    pub fn dispose(&self) {
        info!("disposing gb handle");
        self.ctx.dispose();
    }
}

fn geolocation_reason(reason: &str) -> GeolocationError {
    [
        GeolocationError::Timeout,
        GeolocationError::PositionUnavailable,
        GeolocationError::PermissionDenied,
    ]
    .into_iter()
    .find(|known| known.to_string() == reason)
    .unwrap_or(GeolocationError::Unknown)
}

/// Device information stashed by the host.
#[derive(Debug)]
pub struct Device<'a> {
    ctx: &'a BridgeContext,
}

impl Device<'_> {
    /// `_GB.contextUUID`, empty before the host sent one.
    pub fn context_uuid(&self) -> String {
        self.ctx.context_uuid().unwrap_or_default()
    }
}
