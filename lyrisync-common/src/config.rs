//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration is a single TOML file. Every key has a built-in default, so a
//! missing file (or a file containing only some sections) is valid.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LYRISYNC_ROOT_FOLDER";

/// Environment variable pointing at the TOML config file
pub const CONFIG_FILE_ENV: &str = "LYRISYNC_CONFIG";

/// Upper bound for the scheduler poll interval
pub const MAX_POLL_INTERVAL_MS: u64 = 50;

/// Lower bound for the telemetry reconnect delay
pub const MIN_RECONNECT_BACKOFF_MS: u64 = 100;

/// Game whose telemetry feed drives the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameProfile {
    /// Beat Saber with the DataPuller mod (`MapData` snapshots)
    #[default]
    BeatSaber,
    /// Synth Riders websocket event feed
    SynthRiders,
}

impl GameProfile {
    /// Default websocket address of the game's telemetry feed
    pub fn default_url(&self) -> &'static str {
        match self {
            GameProfile::BeatSaber => "ws://localhost:2946/BSDataPuller/MapData",
            GameProfile::SynthRiders => "ws://localhost:9000/",
        }
    }
}

/// Lyrics provider identifiers, in the order they may be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Lrclib,
    Spotify,
    Netease,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Lrclib => "lrclib",
            ProviderKind::Spotify => "spotify",
            ProviderKind::Netease => "netease",
        };
        f.write_str(name)
    }
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder for the cache database (optional)
    pub root_folder: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
    pub playback: PlaybackConfig,
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Telemetry connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub game: GameProfile,
    /// Websocket url; falls back to the game's default address
    pub url: Option<String>,
    /// Fixed delay between reconnect attempts, at least
    /// `MIN_RECONNECT_BACKOFF_MS`
    pub reconnect_backoff_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            game: GameProfile::default(),
            url: None,
            reconnect_backoff_ms: 5000,
        }
    }
}

impl TelemetryConfig {
    pub fn url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.game.default_url().to_string())
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms.max(MIN_RECONNECT_BACKOFF_MS))
    }
}

/// Lyrics playback settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Scheduler poll interval, clamped to `MAX_POLL_INTERVAL_MS`
    pub poll_interval_ms: u64,
    /// Number of lines sent to the renderer (current line included)
    pub lines_shown: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            lines_shown: 4,
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(1, MAX_POLL_INTERVAL_MS))
    }
}

/// Lyrics provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Providers tried after a cache miss, first hit wins
    pub order: Vec<ProviderKind>,
    pub http_timeout_ms: u64,
    pub lrclib_base_url: String,
    pub netease_base_url: String,
    pub spotify: SpotifyConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: vec![
                ProviderKind::Lrclib,
                ProviderKind::Spotify,
                ProviderKind::Netease,
            ],
            http_timeout_ms: 5000,
            lrclib_base_url: "https://lrclib.net/api".to_string(),
            netease_base_url: "https://music.xianqiao.wang/neteaseapiv2".to_string(),
            spotify: SpotifyConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

/// Spotify credentials and endpoints
///
/// Debug output redacts every credential.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// `sp_dc` web-player cookie used for the lyrics endpoint
    pub sp_dc_cookie: Option<String>,
    /// Client-credentials token service (`/api/token`)
    pub accounts_base_url: String,
    /// Web API root (`/search`)
    pub api_base_url: String,
    /// Web-player token service (`/get_access_token`)
    pub web_player_base_url: String,
    /// Color-lyrics service (`/track/{id}`)
    pub lyrics_base_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            sp_dc_cookie: None,
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            api_base_url: "https://api.spotify.com/v1".to_string(),
            web_player_base_url: "https://open.spotify.com".to_string(),
            lyrics_base_url: "https://spclient.wg.spotify.com/color-lyrics/v2".to_string(),
        }
    }
}

impl SpotifyConfig {
    /// True when both the catalog search and the lyrics endpoint can be used
    pub fn is_complete(&self) -> bool {
        [&self.client_id, &self.client_secret, &self.sp_dc_cookie]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("SpotifyConfig")
            .field("client_id", &redact(&self.client_id))
            .field("client_secret", &redact(&self.client_secret))
            .field("sp_dc_cookie", &redact(&self.sp_dc_cookie))
            .field("accounts_base_url", &self.accounts_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("web_player_base_url", &self.web_player_base_url)
            .field("lyrics_base_url", &self.lyrics_base_url)
            .finish()
    }
}

/// Lyrics cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Database file name, relative to the root folder
    pub database_file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_file: "lyrics.db".to_string(),
        }
    }
}

/// Renderer HTTP/SSE server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:5790".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load from the resolved config path, or fall back to built-in defaults
    ///
    /// An explicitly requested file that cannot be read is an error; a missing
    /// user-level config file is not.
    pub fn load_resolved(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Self::load(Path::new(&path));
        }
        match user_config_file() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Full path of the cache database under `root_folder`
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        root_folder.join(&self.cache.database_file)
    }
}

/// Root folder resolution, highest priority first
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// User-level config file location (`<config dir>/lyrisync/config.toml`)
fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lyrisync").join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lyrisync"))
        .unwrap_or_else(|| PathBuf::from("./lyrisync_data"))
}
