// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire contract with the host app: destination identifiers, query string
// construction, and URI-component escaping.
//
// Hosts match URLs byte for byte, so nothing here may normalise, reorder,
// or re-escape what callers hand in.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::types::Params;

/// The host app's URL scheme.
pub const HOST_SCHEME: &str = "goodbarber";

/// Destination identifiers understood by the host app.
pub mod dest {
    pub const INIT: &str = "goodbarber://init";
    pub const SHARE: &str = "goodbarber://share";
    pub const GET_MEDIA: &str = "goodbarber://getmedia";
    pub const GET_LOCATION: &str = "goodbarber://getlocation";
    pub const GET_TIMEZONE_OFFSET: &str = "goodbarber://gettimezoneoffset";
    pub const LOG: &str = "goodbarber://log";
    pub const ALERT: &str = "goodbarber://alert";
    pub const PRINT: &str = "goodbarber://print";
    pub const NAVIGATE_BACK: &str = "goodbarber://navigate.back";
    pub const OPEN_EXTERNAL: &str = "goodbarber://openExternal";
    pub const MAPS: &str = "goodbarber://maps";
    pub const SET_STORAGE_ITEM: &str = "goodbarber://gbsetstorageitem";
    pub const GET_STORAGE_ITEM: &str = "goodbarber://gbgetstorageitem";
    pub const REMOVE_STORAGE_ITEM: &str = "goodbarber://gbremovestorageitem";
    pub const CLEAR_STORAGE: &str = "goodbarber://gbclearstorage";
    pub const GET_STORAGE_KEYS: &str = "goodbarber://gbgetstoragekeys";
    pub const REQUEST: &str = "goodbarber://gbrequest";
    pub const GET_CURRENT_USER: &str = "goodbarber://gbgetcurrentuser";
    pub const GET_ACCESS_LEVELS: &str = "goodbarber://gbgetaccesslevels";
    /// Pre-2.0 user lookup, answered through `gbDidSuccessGetUser`.
    pub const LEGACY_GET_USER: &str = "goodbarber://getuser";
    pub const LOGIN: &str = "/login";
    pub const LOGOUT: &str = "/logout";
}

/// Query parameter carrying the session token in the page URL.
pub const SESSION_TOKEN_PARAM: &str = "gbToken";

/// Characters `encodeURIComponent` leaves alone: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escape a value exactly like ECMAScript `encodeURIComponent`.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Join parameters as `k=v&k=v`. Keys and values are emitted verbatim.
pub fn query_string(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Form-encode parameters for a body the page sends itself.
pub fn form_encode(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_uri_component(key),
                encode_uri_component(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Split `scheme:rest` into its scheme and the remainder without a leading `//`.
///
/// Relative references (`/login`) have no scheme.
pub fn split_scheme(destination: &str) -> (Option<&str>, &str) {
    if let Some((scheme, rest)) = destination.split_once(':') {
        let mut chars = scheme.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if valid {
            return (Some(scheme), rest.strip_prefix("//").unwrap_or(rest));
        }
    }
    (None, destination)
}

/// Value of the first `?name=` or `&name=` parameter in `href`, up to the next
/// `&` or `#`. Returns an empty string when absent. The value is not decoded.
pub fn url_param(href: &str, name: &str) -> String {
    for (index, _) in href.match_indices(name) {
        let preceded = index > 0 && matches!(href.as_bytes()[index - 1], b'?' | b'&');
        if !preceded {
            continue;
        }
        if let Some(value) = href[index + name.len()..].strip_prefix('=') {
            let end = value.find(['&', '#']).unwrap_or(value.len());
            return value[..end].to_string();
        }
    }
    String::new()
}

/// Append `gbToken=<token>` to a URL, choosing `?` or `&` as appropriate.
pub fn append_session_token(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{SESSION_TOKEN_PARAM}={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_encode_uri_component() {
        assert_eq!(encode_uri_component("http://x"), "http%3A%2F%2Fx");
        assert_eq!(encode_uri_component("hello"), "hello");
        assert_eq!(encode_uri_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_uri_component("café"), "caf%C3%A9");
        assert_eq!(encode_uri_component(""), "");
    }

    #[test]
    fn query_string_keeps_order_and_bytes() {
        let mut params = Params::new();
        params.insert("text".into(), "hello".into());
        params.insert("link".into(), "http%3A%2F%2Fx".into());
        params.insert("raw".into(), "a b".into());
        assert_eq!(query_string(&params), "text=hello&link=http%3A%2F%2Fx&raw=a b");
    }

    #[test]
    fn form_encoding_escapes_both_sides() {
        let mut params = Params::new();
        params.insert("log".into(), "a&b".into());
        assert_eq!(form_encode(&params), "log=a%26b");
    }

    #[test]
    fn splits_schemes() {
        assert_eq!(split_scheme("goodbarber://share"), (Some("goodbarber"), "share"));
        assert_eq!(split_scheme("mailto:me@x.io"), (Some("mailto"), "me@x.io"));
        assert_eq!(split_scheme("/login"), (None, "/login"));
        assert_eq!(split_scheme("1x:oops"), (None, "1x:oops"));
    }

    #[test]
    fn reads_url_params_like_the_page_does() {
        let href = "https://app.example/page?x=1&gbToken=abc123#frag";
        assert_eq!(url_param(href, "gbToken"), "abc123");
        assert_eq!(url_param("https://a/?gbToken=t&y=2", "gbToken"), "t");
        assert_eq!(url_param("https://a/?xgbToken=t", "gbToken"), "");
        assert_eq!(url_param("https://a/", "gbToken"), "");
    }

    #[test]
    fn appends_session_token() {
        assert_eq!(append_session_token("https://a/b", "t"), "https://a/b?gbToken=t");
        assert_eq!(append_session_token("https://a/b?c=1", "t"), "https://a/b?c=1&gbToken=t");
    }
}
