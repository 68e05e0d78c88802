//! `X-Caller` header set by the identity provider in front of this service:
//!
//! ```text
//! X-Caller: id=<uuid>; name=<percent-encoded>; entitlements=admin,premium
//! ```

use axum_extra::headers::{self, Header};
use http::header::{HeaderName, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::{CallerContext, Entitlement};

pub static X_CALLER: HeaderName = HeaderName::from_static("x-caller");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XCaller(pub CallerContext);

pub fn parse(raw: &str) -> Option<CallerContext> {
    let mut id = None;
    let mut name = String::new();
    let mut entitlements = BTreeSet::new();

    for part in raw.split(';') {
        let Some((k, v)) = part.split_once('=') else {
            continue;
        };
        match k.trim() {
            "id" => id = Uuid::parse_str(v.trim()).ok(),
            "name" => name = percent_decode_str(v.trim()).decode_utf8().ok()?.into_owned(),
            "entitlements" => {
                // unknown flags are ignored
                entitlements.extend(v.split(',').filter_map(Entitlement::parse));
            }
            _ => {}
        }
    }
    Some(CallerContext {
        user_id: id?,
        display_name: name,
        entitlements,
    })
}

pub fn format(caller: &CallerContext) -> String {
    let mut out = format!(
        "id={}; name={}",
        caller.user_id,
        utf8_percent_encode(&caller.display_name, NON_ALPHANUMERIC)
    );
    if !caller.entitlements.is_empty() {
        let flags: Vec<&str> = caller.entitlements.iter().map(|e| e.as_str()).collect();
        out.push_str("; entitlements=");
        out.push_str(&flags.join(","));
    }
    out
}

impl Header for XCaller {
    fn name() -> &'static HeaderName {
        &X_CALLER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        values
            .next()
            .and_then(|v| v.to_str().ok())
            .and_then(parse)
            .map(XCaller)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(v) = HeaderValue::from_str(&format(&self.0)) {
            values.extend(std::iter::once(v));
        }
    }
}
