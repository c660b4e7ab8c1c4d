//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.paneldeck/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PaneldeckConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub port: Option<String>,
    pub baud: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TimingConfig {
    pub boot_drain_ms: Option<u64>,
    pub settle_drain_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PORT: &str = "/dev/ttyACM0";
pub const DEFAULT_BAUD: u32 = 9600;
pub const DEFAULT_BOOT_DRAIN_MS: u64 = 5000;
pub const DEFAULT_SETTLE_DRAIN_MS: u64 = 100;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub port: String,
    pub baud: u32,
    pub boot_drain: Duration,
    pub settle_drain: Duration,
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

/// Returns the path to `~/.paneldeck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".paneldeck").join("config.toml"))
}

/// Load config from `~/.paneldeck/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PaneldeckConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<PaneldeckConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(PaneldeckConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(PaneldeckConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: PaneldeckConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Paneldeck Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [connection]
# port = "/dev/ttyACM0"     # Or set PANELDECK_PORT env var
# baud = 9600               # Or set PANELDECK_BAUD env var

# [timing]
# boot_drain_ms = 5000      # flush window for boot-time panel chatter
# settle_drain_ms = 100     # flush window after a full page render
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

/// Resolve the final config by collapsing: defaults → config file → env
/// vars → CLI flags.
///
/// `cli_port` and `cli_baud` come from CLI flags (None = not specified).
pub fn resolve(config: &PaneldeckConfig, cli_port: Option<&str>, cli_baud: Option<u32>) -> ResolvedConfig {
    // Port: CLI → env → config → default
    let port = cli_port
        .map(|s| s.to_string())
        .or_else(|| std::env::var("PANELDECK_PORT").ok())
        .or_else(|| config.connection.port.clone())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    // Baud: CLI → env → config → default
    let baud = cli_baud
        .or_else(|| std::env::var("PANELDECK_BAUD").ok().and_then(|v| v.parse().ok()))
        .or(config.connection.baud)
        .unwrap_or(DEFAULT_BAUD);

    ResolvedConfig {
        port,
        baud,
        boot_drain: Duration::from_millis(
            config.timing.boot_drain_ms.unwrap_or(DEFAULT_BOOT_DRAIN_MS),
        ),
        settle_drain: Duration::from_millis(
            config
                .timing
                .settle_drain_ms
                .unwrap_or(DEFAULT_SETTLE_DRAIN_MS),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = PaneldeckConfig::default();
        assert!(config.connection.port.is_none());
        assert!(config.timing.boot_drain_ms.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config = PaneldeckConfig::default();
        let resolved = resolve(&config, None, None);
        assert_eq!(resolved.port, DEFAULT_PORT);
        assert_eq!(resolved.baud, DEFAULT_BAUD);
        assert_eq!(resolved.boot_drain, Duration::from_millis(DEFAULT_BOOT_DRAIN_MS));
        assert_eq!(resolved.settle_drain, Duration::from_millis(DEFAULT_SETTLE_DRAIN_MS));
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = PaneldeckConfig {
            connection: ConnectionConfig {
                port: Some("/dev/ttyUSB3".to_string()),
                baud: Some(115200),
            },
            timing: TimingConfig {
                boot_drain_ms: Some(2000),
                settle_drain_ms: Some(50),
            },
        };
        let resolved = resolve(&config, None, None);
        assert_eq!(resolved.port, "/dev/ttyUSB3");
        assert_eq!(resolved.baud, 115200);
        assert_eq!(resolved.boot_drain, Duration::from_millis(2000));
        assert_eq!(resolved.settle_drain, Duration::from_millis(50));
    }

    #[test]
    fn test_resolve_cli_flags_win() {
        let config = PaneldeckConfig {
            connection: ConnectionConfig {
                port: Some("/dev/ttyUSB3".to_string()),
                baud: Some(115200),
            },
            ..Default::default()
        };
        let resolved = resolve(&config, Some("/dev/ttyACM7"), Some(19200));
        assert_eq!(resolved.port, "/dev/ttyACM7");
        assert_eq!(resolved.baud, 19200);
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing; everything else stays default
        let toml_str = r#"
[connection]
baud = 115200
"#;
        let config: PaneldeckConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.baud, Some(115200));
        assert!(config.connection.port.is_none());
        assert!(config.timing.settle_drain_ms.is_none());
    }

    #[test]
    fn test_full_toml_parses() {
        let toml_str = r#"
[connection]
port = "/dev/ttyACM1"
baud = 9600

[timing]
boot_drain_ms = 3000
settle_drain_ms = 250
"#;
        let config: PaneldeckConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(config.timing.boot_drain_ms, Some(3000));
        assert_eq!(config.timing.settle_drain_ms, Some(250));
    }
}
