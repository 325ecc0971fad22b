//! Configuration file management for pathsmith.
//!
//! Provides a TOML-based config file at `~/.config/pathsmith/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use pathsmith_core::Session;
use pathsmith_core::generate::{GeminiClient, GenerationParams, PathGenerator};
use pathsmith_core::state::default_status_dir;
use pathsmith_db::config::DbConfig;

/// Env var holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Env var naming the signed-in user.
pub const USER_ENV: &str = "PATHSMITH_USER";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub user: UserSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeminiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageSection {
    /// Where module statuses of saved paths are mirrored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersistenceSection {
    /// Create the `learning_paths` table on first use when it is missing.
    pub auto_provision: bool,
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            auto_provision: true,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the pathsmith config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/pathsmith` or
/// `~/.config/pathsmith`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("pathsmith");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("pathsmith")
}

/// Return the path to the pathsmith config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Load the config file if there is one. A file that exists but does not
/// parse is an error.
pub fn load_config_if_present() -> Result<Option<ConfigFile>> {
    if !config_path().exists() {
        return Ok(None);
    }
    load_config().map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since the file may hold an API key.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Settings for the Gemini client, present only when an API key is known.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PathsmithConfig {
    pub db_config: DbConfig,
    pub gemini: Option<GeminiSettings>,
    pub params: GenerationParams,
    pub status_dir: PathBuf,
    pub user_id: Option<String>,
    pub auto_provision: bool,
}

/// Non-empty value of an env var.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl PathsmithConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `PATHSMITH_DATABASE_URL` > `[database] url` > `DbConfig::DEFAULT_URL`
    /// - API key: `GEMINI_API_KEY` > `[gemini] api_key` > none (fallback-only generation)
    /// - User: `cli_user` > `PATHSMITH_USER` > `[user] id` > none
    pub fn resolve(cli_db_url: Option<&str>, cli_user: Option<&str>) -> Result<Self> {
        let file_config = load_config_if_present()?;
        Ok(Self::resolve_with(file_config, cli_db_url, cli_user))
    }

    /// Resolution against an already-loaded config file.
    pub fn resolve_with(
        file_config: Option<ConfigFile>,
        cli_db_url: Option<&str>,
        cli_user: Option<&str>,
    ) -> Self {
        let file = file_config.unwrap_or_default();

        let db_url = cli_db_url
            .map(str::to_string)
            .or_else(|| env_value(DbConfig::ENV_VAR))
            .unwrap_or(file.database.url);

        let gemini = env_value(API_KEY_ENV)
            .or(file.gemini.api_key.filter(|k| !k.trim().is_empty()))
            .map(|api_key| GeminiSettings {
                api_key,
                model: file
                    .gemini
                    .model
                    .clone()
                    .unwrap_or_else(|| GeminiClient::DEFAULT_MODEL.to_string()),
                base_url: file
                    .gemini
                    .base_url
                    .clone()
                    .unwrap_or_else(|| GeminiClient::DEFAULT_BASE_URL.to_string()),
                timeout: file.gemini.timeout_secs.map(Duration::from_secs),
            });

        let defaults = GenerationParams::default();
        let params = GenerationParams {
            temperature: file.generation.temperature.unwrap_or(defaults.temperature),
            max_output_tokens: file
                .generation
                .max_output_tokens
                .unwrap_or(defaults.max_output_tokens),
        };

        let user_id = cli_user
            .map(str::to_string)
            .or_else(|| env_value(USER_ENV))
            .or(file.user.id);

        Self {
            db_config: DbConfig::new(db_url),
            gemini,
            params,
            status_dir: file.storage.status_dir.unwrap_or_else(default_status_dir),
            user_id,
            auto_provision: file.persistence.auto_provision,
        }
    }

    /// Build the learning-path generator. Without an API key every
    /// generation goes straight to the fallback path.
    pub fn generator(&self) -> Result<PathGenerator> {
        let Some(settings) = &self.gemini else {
            tracing::info!("no Gemini API key configured; generation will use the fallback path");
            return Ok(PathGenerator::unconfigured().with_params(self.params));
        };

        let mut client = GeminiClient::new(settings.api_key.clone())
            .with_model(settings.model.clone())
            .with_base_url(settings.base_url.clone());
        if let Some(timeout) = settings.timeout {
            client = client
                .with_timeout(timeout)
                .context("failed to build Gemini HTTP client")?;
        }

        Ok(PathGenerator::new(Box::new(client)).with_params(self.params))
    }

    /// Start a session for the configured user.
    pub fn session(&self) -> Result<Session> {
        let user_id = self.user_id.as_deref().ok_or_else(|| {
            anyhow!(
                "no user id; pass --user, set {USER_ENV}, or set [user] id in {}",
                config_path().display()
            )
        })?;
        Session::start(user_id).context("invalid user id")
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
