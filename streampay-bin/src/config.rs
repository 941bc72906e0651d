//! Process configuration from environment variables (`.env` honoured).

use std::path::PathBuf;

use streampay_http_api::ApiConfig;

pub const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TOML registry; the built-in local registry when unset.
    pub registry_path: Option<PathBuf>,
    /// Overrides the registry's `active` network.
    pub network: Option<String>,
    pub http_port: u16,
    pub api: ApiConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank values take defaults;
    /// values that are set but unparseable are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = ApiConfig::default();

        let config = Self {
            registry_path: get("STREAMPAY_REGISTRY_PATH").map(PathBuf::from),
            network: get("STREAMPAY_NETWORK"),
            http_port: parse_or(get("STREAMPAY_HTTP_PORT"), "STREAMPAY_HTTP_PORT", DEFAULT_HTTP_PORT)?,
            api: ApiConfig {
                auth_ttl_secs: parse_or(
                    get("STREAMPAY_AUTH_TTL_SECS"),
                    "STREAMPAY_AUTH_TTL_SECS",
                    defaults.auth_ttl_secs,
                )?,
                session_ttl_secs: parse_or(
                    get("STREAMPAY_SESSION_TTL_SECS"),
                    "STREAMPAY_SESSION_TTL_SECS",
                    defaults.session_ttl_secs,
                )?,
                challenge_ttl_secs: defaults.challenge_ttl_secs,
                replay_protection: match get("STREAMPAY_REPLAY_PROTECTION") {
                    Some(v) => parse_bool(&v).ok_or_else(|| {
                        anyhow::anyhow!("STREAMPAY_REPLAY_PROTECTION: expected true/false, got '{v}'")
                    })?,
                    None => defaults.replay_protection,
                },
            },
        };
        if config.api.auth_ttl_secs <= 0 {
            anyhow::bail!("STREAMPAY_AUTH_TTL_SECS must be positive");
        }
        Ok(config)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}: invalid value '{v}': {e}")),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
