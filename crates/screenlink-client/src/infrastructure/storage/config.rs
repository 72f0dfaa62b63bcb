//! TOML-based configuration persistence for the client application.
//!
//! Reads and writes `ClientConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\ScreenLink\config.toml`
//! - Linux:    `~/.config/screenlink/config.toml`
//! - macOS:    `~/Library/Application Support/ScreenLink/config.toml`
//!
//! Every field carries a serde default so the client works on first run
//! (before a config file exists) and keeps working when an older file is
//! missing newer fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Local screen identity and reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenConfig {
    /// Screen name announced to the server during the greeting.
    #[serde(default = "default_screen_name")]
    pub name: String,
    /// Physical width of the local screen in pixels.
    #[serde(default = "default_screen_width")]
    pub width: u16,
    /// Physical height of the local screen in pixels.
    #[serde(default = "default_screen_height")]
    pub height: u16,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which server to connect to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Server hostname or IP address. `"unset"` means not configured yet.
    #[serde(default = "default_server_address")]
    pub address: String,
    /// TCP port of the server's listener.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Whether to wrap the connection in TLS.
    #[serde(default)]
    pub use_tls: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_screen_name() -> String {
    "screenlink-client".to_string()
}
fn default_screen_width() -> u16 {
    1920
}
fn default_screen_height() -> u16 {
    1080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_server_address() -> String {
    "unset".to_string()
}
fn default_server_port() -> u16 {
    24800
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            name: default_screen_name(),
            width: default_screen_width(),
            height: default_screen_height(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            port: default_server_port(),
            use_tls: false,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ClientConfig` from disk, returning `ClientConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: ClientConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk.
///
/// Creates the config directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ClientConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    // Ensure directory exists before writing.
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ScreenLink"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("screenlink"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/ScreenLink
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ScreenLink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_client_config_default_server_is_unset() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(cfg.server.address, "unset");
        assert_eq!(cfg.server.port, 24800);
        assert!(!cfg.server.use_tls);
    }

    #[test]
    fn test_client_config_default_screen_dimensions() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.screen.width, 1920);
        assert_eq!(cfg.screen.height, 1080);
    }

    #[test]
    fn test_screen_config_default_log_level_is_info() {
        let cfg = ScreenConfig::default();
        assert_eq!(cfg.log_level, "info");
    }

    // ── TOML round-trip ───────────────────────────────────────────────────────

    #[test]
    fn test_client_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = ClientConfig::default();
        cfg.server.address = "192.168.1.5".to_string();
        cfg.server.port = 9000;
        cfg.server.use_tls = true;
        cfg.screen.name = "laptop".to_string();

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ClientConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        // Arrange: an empty file is valid and yields the defaults
        let cfg: ClientConfig = toml::from_str("").expect("deserialize empty");

        // Assert
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_deserialize_partial_server_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[server]
address = "10.0.0.2"
"#;

        // Act
        let cfg: ClientConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.server.address, "10.0.0.2");
        // Unspecified fields keep their defaults
        assert_eq!(cfg.server.port, 24800);
        assert_eq!(cfg.screen.name, "screenlink-client");
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        // Arrange
        let bad_toml = "[[[ not valid toml";

        // Act
        let result: Result<ClientConfig, toml::de::Error> = toml::from_str(bad_toml);

        // Assert
        assert!(result.is_err());
    }

    // ── File round-trip via temp directory ────────────────────────────────────

    #[test]
    fn test_write_and_read_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!(
            "screenlink_test_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let mut cfg = ClientConfig::default();
        cfg.server.port = 12345;
        cfg.screen.log_level = "debug".to_string();

        // Act: serialize and write manually (mirrors save_config logic)
        let content = toml::to_string_pretty(&cfg).unwrap();
        std::fs::write(&path, &content).unwrap();
        let loaded: ClientConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        // Assert
        assert_eq!(loaded.server.port, 12345);
        assert_eq!(loaded.screen.log_level, "debug");

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    // ── config_dir path formation ─────────────────────────────────────────────

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir in a stripped CI environment is also acceptable.
    }

    #[test]
    fn test_platform_config_dir_returns_some_on_this_platform() {
        let result = platform_config_dir();
        #[cfg(target_os = "windows")]
        if std::env::var_os("APPDATA").is_some() {
            assert!(result.is_some());
        }
        #[cfg(target_os = "linux")]
        {
            let has_xdg = std::env::var_os("XDG_CONFIG_HOME").is_some();
            let has_home = std::env::var_os("HOME").is_some();
            if has_xdg || has_home {
                assert!(result.is_some());
            }
        }
        #[cfg(target_os = "macos")]
        if std::env::var_os("HOME").is_some() {
            assert!(result.is_some());
        }
    }
}
