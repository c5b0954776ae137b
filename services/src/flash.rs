//! One-shot messages carried across a redirect in a cookie.
//!
//! A handler pushes a message before redirecting; the next page drains the cookie and
//! renders the messages in its `flashes` field.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "diary_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

fn read(jar: &CookieJar) -> Vec<FlashMessage> {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return Vec::new();
    };

    let decoded = match percent_decode_str(cookie.value()).decode_utf8() {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!("Discarding undecodable flash cookie: {}", e);
            return Vec::new();
        }
    };

    serde_json::from_str(&decoded).unwrap_or_else(|e| {
        tracing::debug!("Discarding malformed flash cookie: {}", e);
        Vec::new()
    })
}

/// Queue a message for the next rendered page.
pub fn push(jar: CookieJar, message: FlashMessage) -> CookieJar {
    let mut messages = read(&jar);
    messages.push(message);

    let json = match serde_json::to_string(&messages) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode flash messages: {}", e);
            return jar;
        }
    };
    let value = utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string();

    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true),
    )
}

/// Drain queued messages, clearing the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    let messages = read(&jar);
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, messages);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), messages)
}
