use std::{env, sync::Arc};

use crate::config::Config;

pub trait ConfigService: Send + Sync {
    fn port(&self) -> u16;
    fn values(&self) -> &Config;
}

pub struct ConfigServiceImpl {
    config: Arc<Config>,
}

impl ConfigServiceImpl {
    fn strip_wrapping_quotes(value: &str) -> &str {
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            let first = bytes[0];
            let last = bytes[value.len() - 1];
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                return &value[1..value.len() - 1];
            }
        }
        value
    }

    fn env_nonempty(key: &str) -> Option<String> {
        env::var(key).ok().and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            let normalized = Self::strip_wrapping_quotes(trimmed).trim();
            if normalized.is_empty() {
                None
            } else {
                Some(normalized.to_string())
            }
        })
    }

    fn env_u16(key: &str) -> Option<u16> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u16>().ok())
    }

    fn env_u64(key: &str) -> Option<u64> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u64>().ok())
    }

    pub fn new() -> Self {
        let port = Self::env_u16("PORT").unwrap_or(3333);
        let redis_url = Self::env_nonempty("REDIS_URL");
        let access_token_ttl_seconds =
            Self::env_u64("ACCESS_TOKEN_TTL_SECONDS").unwrap_or(60 * 60);
        let refresh_token_ttl_seconds =
            Self::env_u64("REFRESH_TOKEN_TTL_SECONDS").unwrap_or(60 * 60 * 24 * 7);
        let token_key_prefix =
            Self::env_nonempty("TOKEN_KEY_PREFIX").unwrap_or_else(|| "social-api".to_string());

        Self {
            config: Arc::new(Config {
                port,
                redis_url,
                access_token_ttl_seconds,
                refresh_token_ttl_seconds,
                token_key_prefix,
            }),
        }
    }
}

impl ConfigService for ConfigServiceImpl {
    fn port(&self) -> u16 {
        self.config.port
    }

    fn values(&self) -> &Config {
        &self.config
    }
}
