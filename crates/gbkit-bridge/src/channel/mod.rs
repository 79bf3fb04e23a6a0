// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host channels.
//
// One channel per environment, selected once when the bridge context is
// built. Capabilities never branch on the environment themselves; they hand a
// finished `OutboundMessage` to `Channel::send`.

mod android;
mod dev;
mod hosted;
mod ios;

pub use android::NativeAndroidChannel;
pub use dev::DevChannel;
pub use hosted::HostedWebChannel;
pub use ios::NativeIosChannel;

use gbkit_core::{BridgeConfig, Environment, OutboundMessage, Params, Result};
use serde::Serialize;

use crate::traits::HostPage;

/// A transport to the host app.
pub trait Channel {
    fn environment(&self) -> Environment;

    /// Deliver one message. Fire-and-forget: `Ok` means handed to the
    /// transport, not acknowledged by the host.
    fn send(&self, page: &dyn HostPage, message: &OutboundMessage) -> Result<()>;
}

/// Build the channel for a detected environment.
pub fn channel_for(environment: Environment, config: &BridgeConfig) -> Box<dyn Channel> {
    match environment {
        Environment::NativeIOS => Box::new(NativeIosChannel),
        Environment::NativeAndroid => Box::new(NativeAndroidChannel),
        Environment::HostedWeb => Box::new(HostedWebChannel),
        Environment::StandaloneDev => Box::new(DevChannel::new(config.session_token())),
    }
}

/// `{ url, params }` envelope shared by the iOS handler and the parent frame.
/// `params` is omitted for reads and for writes without a body.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Params>,
}

impl<'a> Envelope<'a> {
    pub fn for_message(message: &'a OutboundMessage) -> Self {
        Self {
            url: message.url(),
            params: message.body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_missing_body() {
        let read = OutboundMessage::read("goodbarber://print", Params::new());
        let json = serde_json::to_string(&Envelope::for_message(&read)).expect("json");
        assert_eq!(json, r#"{"url":"goodbarber://print"}"#);

        let mut body = Params::new();
        body.insert("log".into(), "hi".into());
        let write = OutboundMessage::write("goodbarber://log", Params::new(), Some(body));
        let json = serde_json::to_string(&Envelope::for_message(&write)).expect("json");
        assert_eq!(json, r#"{"url":"goodbarber://log","params":{"log":"hi"}}"#);
    }

    #[test]
    fn selects_one_channel_per_environment() {
        let config = BridgeConfig::default();
        for environment in [
            Environment::NativeIOS,
            Environment::NativeAndroid,
            Environment::HostedWeb,
            Environment::StandaloneDev,
        ] {
            assert_eq!(channel_for(environment, &config).environment(), environment);
        }
    }
}
