//! Application configuration management.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config PATH`, or `config.toml` in the platform
//!    config directory)
//! 3. `DRIVEDUPE_*` environment variables (e.g. `DRIVEDUPE_PAGE_SIZE=500`)
//! 4. CLI flags, merged by the caller
//!
//! A config file that fails to parse is ignored with a warning. Unknown keys
//! are reported with a "did you mean" suggestion.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, OutputFormat};
use crate::drive::auth::DEFAULT_TOKEN_URI;
use crate::drive::client::{DriveClientConfig, DEFAULT_API_BASE_URL, MAX_PAGE_SIZE};

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "DRIVEDUPE_";

/// Keys accepted at the top level of the config file.
pub const KNOWN_KEYS: &[&str] = &[
    "token_path",
    "access_token",
    "api_base_url",
    "token_uri",
    "page_size",
    "request_timeout_secs",
    "keep_strategy",
    "trash_folder_id",
    "output",
];

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authorized-user token file. Defaults to `token.json` next to the config file.
    pub token_path: Option<PathBuf>,
    /// Fixed bearer token, used instead of the token file when set.
    pub access_token: Option<String>,
    /// Drive API root.
    pub api_base_url: String,
    /// OAuth endpoint used for refreshes when the token file names none.
    pub token_uri: String,
    /// Items requested per listing page.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Keep strategy applied when a run asks for removal without naming one.
    pub keep_strategy: Option<String>,
    /// Folder override applied when a run asks for removal without naming one.
    pub trash_folder_id: Option<String>,
    /// Default output format of `scan`.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_path: None,
            access_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            page_size: MAX_PAGE_SIZE,
            request_timeout_secs: 60,
            keep_strategy: None,
            trash_folder_id: None,
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load the configuration from `explicit`, or from the platform default path.
    pub fn load(explicit: Option<&Path>) -> Self {
        match explicit.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load_from_path(path),
            None => {
                log::debug!("No config directory available, using defaults and environment");
                Self::extract_or_default(Self::figment(None))
            }
        }
    }

    /// Load the configuration from a specific TOML file.
    ///
    /// A missing file is not an error. A file that cannot be parsed is
    /// skipped with a warning, keeping defaults and environment overrides.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            log::debug!("Loading config from {}", path.display());
            if let Ok(content) = std::fs::read_to_string(path) {
                for warning in unknown_key_warnings(&content) {
                    log::warn!("{}: {}", path.display(), warning);
                }
            }
        }

        match Self::figment(Some(path)).extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Ignoring invalid config file {}: {}",
                    path.display(),
                    e
                );
                Self::extract_or_default(Self::figment(None))
            }
        }
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract_or_default(figment: Figment) -> Self {
        figment.extract().unwrap_or_else(|e| {
            log::warn!("Ignoring invalid {}* environment settings: {}", ENV_PREFIX, e);
            Self::default()
        })
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "drivedupe", "drivedupe")
    }

    /// The platform-specific config file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply global CLI flags on top of the loaded layers.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(token) = &cli.token {
            self.token_path = Some(token.clone());
        }
    }

    /// The token file to read, falling back to the platform config directory.
    #[must_use]
    pub fn token_file(&self) -> Option<PathBuf> {
        self.token_path.clone().or_else(|| {
            Self::project_dirs().map(|dirs| dirs.config_dir().join("token.json"))
        })
    }

    /// HTTP client settings derived from this configuration.
    #[must_use]
    pub fn client_config(&self) -> DriveClientConfig {
        DriveClientConfig::default()
            .with_base_url(self.api_base_url.clone())
            .with_page_size(self.page_size)
            .with_timeout(Duration::from_secs(self.request_timeout_secs.max(1)))
    }
}

/// Warnings for top-level keys in `content` that the configuration does not know.
///
/// Content that is not valid TOML yields no warnings here; the loader
/// reports the parse error itself.
#[must_use]
pub fn unknown_key_warnings(content: &str) -> Vec<String> {
    let Ok(table) = content.parse::<toml::Table>() else {
        return Vec::new();
    };
    table
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|key| match suggest_key(key) {
            Some(known) => format!("unknown config key '{key}' (did you mean '{known}'?)"),
            None => format!("unknown config key '{key}'"),
        })
        .collect()
}

fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (strsim::levenshtein(key, known), *known))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, known)| known)
}
