// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Environment detection.
//
// Decides once, from the host-injected device info, the user agent, and the
// hosted-mode flag, which channel the page must use. The result is cached in
// the bridge context and never recomputed.

use gbkit_core::{BridgeConfig, Environment, Platform};

use crate::traits::PageSignals;

/// Raw inputs to detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    pub user_agent: String,
    pub hosted_mode: bool,
    pub device_platform: Option<String>,
}

impl EnvironmentSignals {
    /// Read the signals from the page; `config.hosted_mode` forces hosted mode on.
    pub fn from_page(page: &dyn PageSignals, config: &BridgeConfig) -> Self {
        Self {
            user_agent: page.user_agent(),
            hosted_mode: config.hosted_mode || page.hosted_mode_flag(),
            device_platform: page.device_platform(),
        }
    }
}

/// Outcome of detection: the channel environment plus the reported platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedEnvironment {
    environment: Environment,
    platform: Platform,
}

impl DetectedEnvironment {
    pub fn detect(signals: &EnvironmentSignals) -> Self {
        let platform = Platform::from_device_info(signals.device_platform.as_deref());
        let environment = if signals.hosted_mode {
            Environment::HostedWeb
        } else {
            match platform {
                Platform::Ios => Environment::NativeIOS,
                Platform::Android => Environment::NativeAndroid,
                Platform::Web => from_user_agent(&signals.user_agent),
            }
        };
        Self {
            environment,
            platform,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Platform reported by the host (`ios`, `android`, or `web`).
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_hosted_web(&self) -> bool {
        self.environment == Environment::HostedWeb
    }

    /// True only when no native or hosted signal was present.
    pub fn is_standalone_dev(&self) -> bool {
        self.environment == Environment::StandaloneDev
    }
}

/// Native webview user agents without injected device info.
fn from_user_agent(user_agent: &str) -> Environment {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("iphone os") || ua.contains("ipad") {
        Environment::NativeIOS
    } else if ua.contains("android") {
        Environment::NativeAndroid
    } else {
        Environment::StandaloneDev
    }
}
