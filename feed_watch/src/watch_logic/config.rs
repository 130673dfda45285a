use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};

use lib_feedsync::core::{EngineConfig, SyncMode};
use lib_feedsync::retrieve::ClientOptions;

const CONFIG_FILE_NAME: &str = "feed_watch.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Keeps a live, deduplicated view of a social feed and its cache statistics", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "FEED_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "FEED_BASE_URL", help = "Base URL of the feed backend.")]
    pub base_url: Option<String>,

    #[clap(long, env = "FEED_TOKEN", help = "Bearer token. Takes precedence over username/password.")]
    pub token: Option<String>,

    #[clap(long, env = "FEED_USERNAME", help = "Username to log in with when no token is given.")]
    pub username: Option<String>,

    #[clap(long, env = "FEED_PASSWORD", help = "Password to log in with when no token is given.")]
    pub password: Option<String>,

    #[clap(long, env = "FEED_MODE", help = "Synchronization mode: replace (refresh the head) or append (page forward).")]
    pub mode: Option<String>,

    #[clap(long, env = "FEED_POLL_INTERVAL_SECS", help = "Feed poll period in seconds; 0 disables polling. Defaults by mode.")]
    pub poll_interval_secs: Option<u64>,

    #[clap(long, env = "FEED_TELEMETRY_INTERVAL_SECS", help = "Cache statistics poll period in seconds.")]
    pub telemetry_interval_secs: Option<u64>,

    #[clap(long, env = "FEED_PAGE_SIZE", help = "Records per request (the backend caps it at 50).")]
    pub page_size: Option<u32>,

    #[clap(long, env = "FEED_SCROLL_THRESHOLD", help = "Distance from the end that triggers a scroll fetch.")]
    pub scroll_threshold: Option<f64>,

    #[clap(long, env = "FEED_SCROLL_WINDOW_MS", help = "Scroll evaluation rate limit in milliseconds.")]
    pub scroll_window_ms: Option<u64>,

    #[clap(long, env = "FEED_MAX_RETRIES", help = "Transport-level retries per request (0 = none).")]
    pub max_retries: Option<u32>,

    #[clap(long, env = "FEED_REQUEST_TIMEOUT_SECS", help = "Request timeout in seconds (unset = transport default).")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "FEED_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "FEED_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            base_url: other.base_url.or(self.base_url),
            token: other.token.or(self.token),
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            mode: other.mode.or(self.mode),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            telemetry_interval_secs: other.telemetry_interval_secs.or(self.telemetry_interval_secs),
            page_size: other.page_size.or(self.page_size),
            scroll_threshold: other.scroll_threshold.or(self.scroll_threshold),
            scroll_window_ms: other.scroll_window_ms.or(self.scroll_window_ms),
            max_retries: other.max_retries.or(self.max_retries),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    fn defaults() -> Config {
        Config {
            base_url: Some("http://localhost:8080/".to_string()),
            mode: Some(SyncMode::Append.to_string()),
            telemetry_interval_secs: Some(40),
            page_size: Some(10),
            scroll_threshold: Some(100.0),
            scroll_window_ms: Some(300),
            max_retries: Some(0),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }
}

/// How the watcher authenticates.
#[derive(Debug, Clone, PartialEq)]
pub enum Login {
    /// A token issued earlier.
    Token(String),
    /// Log in at startup.
    Password { username: String, password: String },
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub login: Login,
    pub engine: EngineConfig,
    pub telemetry_interval: Duration,
    pub client: ClientOptions,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl TryFrom<Config> for Settings {
    type Error = anyhow::Error;

    fn try_from(config: Config) -> Result<Self> {
        let mode: SyncMode = config
            .mode
            .as_deref()
            .unwrap_or("append")
            .parse()
            .map_err(anyhow::Error::msg)?;

        let mut engine = EngineConfig::for_mode(mode);
        if let Some(secs) = config.poll_interval_secs {
            engine.poll_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(size) = config.page_size {
            if size == 0 {
                bail!("page size must be at least 1");
            }
            engine.page_size = size;
        }
        if let Some(threshold) = config.scroll_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                bail!("scroll threshold must be a non-negative number, got {threshold}");
            }
            engine.scroll_threshold = threshold;
        }
        if let Some(ms) = config.scroll_window_ms {
            engine.scroll_window = Duration::from_millis(ms);
        }

        let login = match (config.token, config.username, config.password) {
            (Some(token), _, _) if !token.trim().is_empty() => Login::Token(token.trim().to_string()),
            (_, Some(username), Some(password)) => Login::Password { username, password },
            _ => bail!("no credential configured: set --token, or --username and --password"),
        };

        let telemetry_secs = config.telemetry_interval_secs.unwrap_or(40);
        if telemetry_secs == 0 {
            bail!("telemetry interval must be at least one second");
        }

        Ok(Settings {
            base_url: config.base_url.unwrap_or_else(|| "http://localhost:8080/".to_string()),
            login,
            engine,
            telemetry_interval: Duration::from_secs(telemetry_secs),
            client: ClientOptions {
                max_retries: config.max_retries.unwrap_or(0),
                timeout: config.request_timeout_secs.map(Duration::from_secs),
            },
            log_dir: config.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: config.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Loads `.env`, parses the command line and resolves the layered settings.
pub fn load_config() -> Result<Settings> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    let cli = Config::parse();
    let fallback = dirs::config_dir().map(|dir| dir.join("feed_watch").join(CONFIG_FILE_NAME));
    resolve(cli, fallback.as_deref())
}

/// Layers defaults, the config file and the command line (which already
/// includes the environment).
///
/// The file is `cli.config_path` if given (and must then exist), else
/// `feed_watch.conf` in the working directory, else `fallback`.
pub fn resolve(cli: Config, fallback: Option<&Path>) -> Result<Settings> {
    let mut current_config = Config::defaults();

    let file = match &cli.config_path {
        Some(path) if !path.exists() => bail!("config file {} not found", path.display()),
        Some(path) => Some(path.clone()),
        None => [Some(Path::new(CONFIG_FILE_NAME)), fallback]
            .into_iter()
            .flatten()
            .find(|p| p.exists())
            .map(Path::to_path_buf),
    };

    if let Some(path) = file {
        let config_str = fs::read_to_string(&path).with_context(|| format!("failed to read config file {}", path.display()))?;
        let file_config: Config = serde_json::from_str(&config_str)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        current_config = current_config.merge(file_config);
    }

    current_config = current_config.merge(cli);
    Settings::try_from(current_config)
}
