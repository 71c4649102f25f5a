//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.wellchat/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::transport::ReconnectPolicy;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WellchatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_conversation: Option<String>,
    pub typing_timeout_ms: Option<u64>,
    pub event_buffer: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RealtimeConfig {
    pub url: Option<String>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub jitter: Option<f64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_TYPING_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_EVENT_BUFFER: usize = 256;
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_REALTIME_URL: &str = "ws://localhost:3000/ws";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub conversation: Option<String>,
    pub typing_timeout: Duration,
    pub event_buffer: usize,
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub realtime_url: String,
    pub reconnect: ReconnectPolicy,
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub conversation: Option<String>,
    pub api_url: Option<String>,
    pub realtime_url: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.wellchat/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".wellchat").join("config.toml"))
}

/// Load config from `~/.wellchat/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `WellchatConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<WellchatConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(WellchatConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(WellchatConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: WellchatConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", redacted(&config));
    Ok(config)
}

/// Debug view of the config without the API token.
fn redacted(config: &WellchatConfig) -> String {
    format!(
        "general={:?} api.base_url={:?} api.token={} realtime={:?}",
        config.general,
        config.api.base_url,
        if config.api.token.is_some() { "<set>" } else { "<unset>" },
        config.realtime
    )
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# wellchat configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_conversation = "abc123"    # Or set WELLCHAT_CONVERSATION / --conversation
# typing_timeout_ms = 1000           # Idle time before "composing" turns off
# event_buffer = 256                 # Inbound event queue capacity per conversation

# [api]
# base_url = "http://localhost:3000/api"   # Or set WELLCHAT_API_URL
# token = "..."                            # Or set WELLCHAT_TOKEN

# [realtime]
# url = "ws://localhost:3000/ws"     # Or set WELLCHAT_REALTIME_URL
# initial_backoff_ms = 500
# max_backoff_ms = 30000
# max_retries = 10
# jitter = 0.2                       # Fraction of the delay to randomize (0.0 - 1.0)
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &WellchatConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading environment variables through `env`.
pub fn resolve_with_env(
    config: &WellchatConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Conversation: CLI → env → config → none
    let conversation = cli
        .conversation
        .clone()
        .or_else(|| env("WELLCHAT_CONVERSATION"))
        .or_else(|| config.general.default_conversation.clone());

    // API base URL: CLI → env → config → default
    let api_base_url = cli
        .api_url
        .clone()
        .or_else(|| env("WELLCHAT_API_URL"))
        .or_else(|| config.api.base_url.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    // Token: env → config
    let api_token = env("WELLCHAT_TOKEN").or_else(|| config.api.token.clone());

    // Realtime URL: CLI → env → config → default
    let realtime_url = cli
        .realtime_url
        .clone()
        .or_else(|| env("WELLCHAT_REALTIME_URL"))
        .or_else(|| config.realtime.url.clone())
        .unwrap_or_else(|| DEFAULT_REALTIME_URL.to_string());

    let defaults = ReconnectPolicy::default();
    let reconnect = ReconnectPolicy {
        initial_delay: config
            .realtime
            .initial_backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay),
        max_delay: config
            .realtime
            .max_backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay),
        max_retries: config.realtime.max_retries.unwrap_or(defaults.max_retries),
        jitter: config
            .realtime
            .jitter
            .filter(|j| j.is_finite())
            .map(|j| j.clamp(0.0, 1.0))
            .unwrap_or(defaults.jitter),
    };

    ResolvedConfig {
        conversation,
        typing_timeout: Duration::from_millis(
            config
                .general
                .typing_timeout_ms
                .filter(|&ms| ms > 0)
                .unwrap_or(DEFAULT_TYPING_TIMEOUT_MS),
        ),
        event_buffer: config
            .general
            .event_buffer
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_EVENT_BUFFER),
        api_base_url,
        api_token,
        realtime_url,
        reconnect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_parses() {
        let config = WellchatConfig::default();
        assert!(config.general.default_conversation.is_none());
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&WellchatConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.typing_timeout, Duration::from_millis(1000));
        assert_eq!(resolved.event_buffer, DEFAULT_EVENT_BUFFER);
        assert_eq!(resolved.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(resolved.realtime_url, DEFAULT_REALTIME_URL);
        assert_eq!(resolved.reconnect.max_retries, ReconnectPolicy::default().max_retries);
        assert!(resolved.conversation.is_none());
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = WellchatConfig {
            general: GeneralConfig {
                default_conversation: Some("c42".to_string()),
                typing_timeout_ms: Some(750),
                event_buffer: Some(16),
            },
            realtime: RealtimeConfig {
                max_retries: Some(3),
                jitter: Some(4.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.conversation.as_deref(), Some("c42"));
        assert_eq!(resolved.typing_timeout, Duration::from_millis(750));
        assert_eq!(resolved.event_buffer, 16);
        assert_eq!(resolved.reconnect.max_retries, 3);
        assert_eq!(resolved.reconnect.jitter, 1.0);
    }

    #[test]
    fn test_resolve_env_beats_file_and_cli_beats_env() {
        let config = WellchatConfig {
            api: ApiConfig {
                base_url: Some("http://file".to_string()),
                token: Some("file-token".to_string()),
            },
            ..Default::default()
        };
        let env = |key: &str| match key {
            "WELLCHAT_API_URL" => Some("http://env".to_string()),
            "WELLCHAT_TOKEN" => Some("env-token".to_string()),
            _ => None,
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), env);
        assert_eq!(resolved.api_base_url, "http://env");
        assert_eq!(resolved.api_token.as_deref(), Some("env-token"));

        let cli = CliOverrides {
            api_url: Some("http://cli".to_string()),
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &cli, env);
        assert_eq!(resolved.api_base_url, "http://cli");
    }

    #[test]
    fn test_non_finite_jitter_falls_back_to_default() {
        let config: WellchatConfig = toml::from_str("[realtime]\njitter = nan").unwrap();
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.reconnect.jitter, ReconnectPolicy::default().jitter);
        assert!(resolved.reconnect.delay(1, 0.5).unwrap() > Duration::ZERO);

        let config: WellchatConfig = toml::from_str("[realtime]\njitter = inf").unwrap();
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.reconnect.jitter, ReconnectPolicy::default().jitter);
    }

    #[test]
    fn test_zero_typing_timeout_falls_back_to_default() {
        let config: WellchatConfig = toml::from_str("[general]\ntyping_timeout_ms = 0").unwrap();
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.typing_timeout, Duration::from_millis(DEFAULT_TYPING_TIMEOUT_MS));
    }

    #[test]
    fn test_zero_event_buffer_falls_back_to_default() {
        let config = WellchatConfig {
            general: GeneralConfig {
                event_buffer: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.event_buffer, DEFAULT_EVENT_BUFFER);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
default_conversation = "c1"
typing_timeout_ms = 1200

[api]
base_url = "https://health.example/api"
token = "t-123"

[realtime]
url = "wss://health.example/ws"
initial_backoff_ms = 250
max_backoff_ms = 8000
max_retries = 4
jitter = 0.1
"#;
        let config: WellchatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_conversation.as_deref(), Some("c1"));
        assert_eq!(config.api.token.as_deref(), Some("t-123"));
        assert_eq!(config.realtime.max_retries, Some(4));

        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.realtime_url, "wss://health.example/ws");
        assert_eq!(resolved.reconnect.initial_delay, Duration::from_millis(250));
        assert_eq!(resolved.reconnect.max_delay, Duration::from_millis(8000));
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing; everything else stays default
        let toml_str = r#"
[realtime]
url = "ws://10.0.0.2/ws"
"#;
        let config: WellchatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.realtime.url.as_deref(), Some("ws://10.0.0.2/ws"));
        assert!(config.general.typing_timeout_ms.is_none());
        assert!(config.api.base_url.is_none());
    }
}
