// src/config.rs
use crate::services::SessionLimits;
use crate::services::session_store::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_TTL};
use log::{error, warn};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Startup configuration, read once and handed to whatever needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub server_addr: String,
    pub api_base: String,
    pub image_model: String,
    pub text_model: String,
    pub static_dir: String,
    pub session_limits: SessionLimits,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default =
            |key: &str, default: &str| non_blank(key).unwrap_or_else(|| default.to_string());

        let api_key = non_blank("GEMINI_API_KEY").or_else(|| non_blank("API_KEY"));
        if api_key.is_none() {
            error!("GEMINI_API_KEY (or API_KEY) environment variable not set");
        }

        Self {
            api_key,
            server_addr: or_default("SERVER_ADDR", DEFAULT_SERVER_ADDR),
            api_base: or_default("GEMINI_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            image_model: or_default("GEMINI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            text_model: or_default("GEMINI_TEXT_MODEL", DEFAULT_TEXT_MODEL),
            static_dir: or_default("STATIC_DIR", DEFAULT_STATIC_DIR),
            session_limits: SessionLimits {
                idle_ttl: non_blank("SESSION_IDLE_SECS")
                    .and_then(|v| parse_or_warn("SESSION_IDLE_SECS", &v))
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_SESSION_IDLE_TTL),
                max_sessions: non_blank("MAX_SESSIONS")
                    .and_then(|v| parse_or_warn("MAX_SESSIONS", &v))
                    .unwrap_or(DEFAULT_MAX_SESSIONS),
            },
            max_upload_bytes: non_blank("MAX_UPLOAD_BYTES")
                .and_then(|v| parse_or_warn("MAX_UPLOAD_BYTES", &v))
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring invalid {}={:?}, using the default", key, value);
    }
    parsed
}
