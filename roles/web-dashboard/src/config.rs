use std::{
    fs, io,
    path::{Path, PathBuf},
};

use clap::Parser;
use dashboard_metrics::{
    metrics::{DEFAULT_BLOCK_TIME_SECS, DEFAULT_MAX_AVERAGE_HOURS},
    smoothing::DEFAULT_SMOOTHING_WINDOW_SECS,
    ChainParams, EarningsPeriod, SmoothingParams,
};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/web-dashboard.config.toml";

/// Holds the parsed CLI arguments for the dashboard binary.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "p2pool mining dashboard", long_about = None)]
pub struct Args {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to the TOML configuration file [default: config/web-dashboard.config.toml]"
    )]
    pub config_path: Option<PathBuf>,
    #[arg(short = 'w', long = "web-address", help = "Address the dashboard listens on")]
    pub web_address: Option<String>,
    #[arg(
        short = 'i',
        long = "poll-interval-secs",
        help = "Seconds between refresh cycles"
    )]
    pub poll_interval_secs: Option<u64>,
    #[arg(
        short = 'f',
        long = "log-file",
        help = "Path to the log file. If not set, logs will only be written to stdout."
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// URLs of the JSON endpoints polled every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrls {
    pub miner_summary: String,
    pub pool_stats: String,
    pub network_stats: String,
    pub min_payout_threshold: String,
    pub history: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub web_server_address: String,
    pub endpoints: EndpointUrls,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub chain: ChainParams,
    pub ticker: String,
    pub currency_symbol: String,
    pub chart_range_hours: f64,
    pub default_period: EarningsPeriod,
    pub smoothing: SmoothingParams,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DashboardConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    endpoints: EndpointsConfig,
    #[serde(default)]
    http_client: HttpClientConfig,
    #[serde(default)]
    polling: PollingConfig,
    #[serde(default)]
    chain: ChainConfig,
    #[serde(default)]
    display: DisplayConfig,
    #[serde(default)]
    smoothing: SmoothingConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
    listen_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: Some("127.0.0.1:8090".to_string()),
        }
    }
}

/// Endpoint paths are resolved against `base_url` unless given as full URLs.
#[derive(Debug, Deserialize)]
struct EndpointsConfig {
    base_url: Option<String>,
    miner_summary: Option<String>,
    pool_stats: Option<String>,
    network_stats: Option<String>,
    min_payout_threshold: Option<String>,
    history: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            base_url: Some("http://127.0.0.1:8080".to_string()),
            miner_summary: Some("/xmrig_summary".to_string()),
            pool_stats: Some("/pool/stats".to_string()),
            network_stats: Some("/network/stats".to_string()),
            min_payout_threshold: Some("/min_payment_threshold".to_string()),
            history: Some("/stats_log.json".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HttpClientConfig {
    pool_idle_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout_secs: Some(300),
            request_timeout_secs: Some(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PollingConfig {
    interval_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: Some(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChainConfig {
    block_time_secs: Option<f64>,
    atomic_units_per_coin: Option<f64>,
    ticker: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            block_time_secs: Some(DEFAULT_BLOCK_TIME_SECS),
            atomic_units_per_coin: Some(dashboard_metrics::metrics::ATOMIC_UNITS_PER_COIN),
            ticker: Some("XMR".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DisplayConfig {
    currency_symbol: Option<String>,
    chart_range_hours: Option<f64>,
    default_period: Option<EarningsPeriod>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: Some("€".to_string()),
            chart_range_hours: Some(24.0),
            default_period: Some(EarningsPeriod::Day),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SmoothingConfig {
    window_secs: Option<u64>,
    max_average_hours: Option<f64>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_secs: Some(DEFAULT_SMOOTHING_WINDOW_SECS),
            max_average_hours: Some(DEFAULT_MAX_AVERAGE_HOURS),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoggingConfig {
    file: Option<PathBuf>,
}

fn resolve_url(base: Option<&str>, path: Option<String>, default: Option<String>) -> String {
    let path = path.or(default).unwrap_or_default();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path;
    }
    match base {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
        None => path,
    }
}

impl Config {
    /// Parse CLI arguments and load the configuration they point at.
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = Args::parse();
        Self::load(&args)
    }

    /// Load the config file named by `args` (or the default path) and apply
    /// CLI overrides. A missing default config file means built-in defaults.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let (path, explicit) = match &args.config_path {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => String::new(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        Self::from_toml_str(&contents, args)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let args = Args {
            config_path: Some(path.to_path_buf()),
            ..Default::default()
        };
        Self::load(&args)
    }

    pub fn from_toml_str(contents: &str, args: &Args) -> Result<Self, ConfigError> {
        let file: DashboardConfigFile = toml::from_str(contents)?;

        let endpoint_defaults = EndpointsConfig::default();
        let base_url = file.endpoints.base_url.or(endpoint_defaults.base_url);
        let base = base_url.as_deref();
        let endpoints = EndpointUrls {
            miner_summary: resolve_url(
                base,
                file.endpoints.miner_summary,
                endpoint_defaults.miner_summary,
            ),
            pool_stats: resolve_url(base, file.endpoints.pool_stats, endpoint_defaults.pool_stats),
            network_stats: resolve_url(
                base,
                file.endpoints.network_stats,
                endpoint_defaults.network_stats,
            ),
            min_payout_threshold: resolve_url(
                base,
                file.endpoints.min_payout_threshold,
                endpoint_defaults.min_payout_threshold,
            ),
            history: resolve_url(base, file.endpoints.history, endpoint_defaults.history),
        };

        let web_server_address = args
            .web_address
            .clone()
            .or(file.server.listen_address)
            .ok_or_else(|| ConfigError::Invalid("missing server.listen_address".to_string()))?;

        let chain_defaults = ChainConfig::default();
        let display_defaults = DisplayConfig::default();
        let smoothing_defaults = SmoothingConfig::default();

        let config = Config {
            web_server_address,
            endpoints,
            poll_interval_secs: args
                .poll_interval_secs
                .or(file.polling.interval_secs)
                .unwrap_or(5),
            request_timeout_secs: file.http_client.request_timeout_secs.unwrap_or(5),
            pool_idle_timeout_secs: file.http_client.pool_idle_timeout_secs.unwrap_or(300),
            chain: ChainParams {
                block_time_secs: file
                    .chain
                    .block_time_secs
                    .or(chain_defaults.block_time_secs)
                    .unwrap_or(DEFAULT_BLOCK_TIME_SECS),
                atomic_units_per_coin: file
                    .chain
                    .atomic_units_per_coin
                    .or(chain_defaults.atomic_units_per_coin)
                    .unwrap_or(dashboard_metrics::metrics::ATOMIC_UNITS_PER_COIN),
            },
            ticker: file.chain.ticker.or(chain_defaults.ticker).unwrap_or_default(),
            currency_symbol: file
                .display
                .currency_symbol
                .or(display_defaults.currency_symbol)
                .unwrap_or_default(),
            chart_range_hours: file
                .display
                .chart_range_hours
                .or(display_defaults.chart_range_hours)
                .unwrap_or(24.0),
            default_period: file
                .display
                .default_period
                .or(display_defaults.default_period)
                .unwrap_or(EarningsPeriod::Day),
            smoothing: SmoothingParams {
                window_secs: file
                    .smoothing
                    .window_secs
                    .or(smoothing_defaults.window_secs)
                    .unwrap_or(DEFAULT_SMOOTHING_WINDOW_SECS),
                max_average_hours: file
                    .smoothing
                    .max_average_hours
                    .or(smoothing_defaults.max_average_hours)
                    .unwrap_or(DEFAULT_MAX_AVERAGE_HOURS),
            },
            log_file: args.log_file.clone().or(file.logging.file),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("polling.interval_secs must be > 0".into()));
        }
        if !(self.chain.block_time_secs > 0.0) {
            return Err(ConfigError::Invalid("chain.block_time_secs must be > 0".into()));
        }
        if !(self.chain.atomic_units_per_coin > 0.0) {
            return Err(ConfigError::Invalid(
                "chain.atomic_units_per_coin must be > 0".into(),
            ));
        }
        if !(self.chart_range_hours > 0.0) {
            return Err(ConfigError::Invalid("display.chart_range_hours must be > 0".into()));
        }
        if !(self.smoothing.max_average_hours > 0.0) {
            return Err(ConfigError::Invalid(
                "smoothing.max_average_hours must be > 0".into(),
            ));
        }

        let urls = [
            ("miner_summary", &self.endpoints.miner_summary),
            ("pool_stats", &self.endpoints.pool_stats),
            ("network_stats", &self.endpoints.network_stats),
            ("min_payout_threshold", &self.endpoints.min_payout_threshold),
            ("history", &self.endpoints.history),
        ];
        for (name, url) in urls {
            if url.is_empty() {
                return Err(ConfigError::Invalid(format!("endpoints.{} is empty", name)));
            }
        }
        Ok(())
    }

    /// The published view counts as stale after three missed cycles.
    pub fn stale_after_secs(&self) -> u64 {
        self.poll_interval_secs.saturating_mul(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let config = Config::from_toml_str("", &Args::default()).unwrap();
        assert_eq!(config.web_server_address, "127.0.0.1:8090");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.endpoints.miner_summary, "http://127.0.0.1:8080/xmrig_summary");
        assert_eq!(config.endpoints.history, "http://127.0.0.1:8080/stats_log.json");
        assert_eq!(config.chain, ChainParams::default());
        assert_eq!(config.smoothing.window_secs, 600);
        assert_eq!(config.default_period, EarningsPeriod::Day);
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(config.ticker, "XMR");
        assert_eq!(config.stale_after_secs(), 15);
    }

    #[test]
    fn test_full_dashboard_config_deserialization() {
        let toml_str = r#"
            [server]
            listen_address = "0.0.0.0:7070"

            [endpoints]
            base_url = "http://p2pool.lan:8080/"
            pool_stats = "/mini/stats"
            history = "http://logger.lan/stats_log.json"

            [http_client]
            pool_idle_timeout_secs = 500
            request_timeout_secs = 3

            [polling]
            interval_secs = 10

            [chain]
            block_time_secs = 60
            atomic_units_per_coin = 100000000
            ticker = "WOW"

            [display]
            currency_symbol = "$"
            chart_range_hours = 6
            default_period = "week"

            [smoothing]
            window_secs = 300
            max_average_hours = 12

            [logging]
            file = "dashboard.log"
        "#;
        let config = Config::from_toml_str(toml_str, &Args::default()).unwrap();
        assert_eq!(config.web_server_address, "0.0.0.0:7070");
        assert_eq!(config.endpoints.pool_stats, "http://p2pool.lan:8080/mini/stats");
        assert_eq!(config.endpoints.history, "http://logger.lan/stats_log.json");
        assert_eq!(config.endpoints.network_stats, "http://p2pool.lan:8080/network/stats");
        assert_eq!(config.pool_idle_timeout_secs, 500);
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.chain.block_time_secs, 60.0);
        assert_eq!(config.chain.atomic_units_per_coin, 1e8);
        assert_eq!(config.ticker, "WOW");
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.chart_range_hours, 6.0);
        assert_eq!(config.default_period, EarningsPeriod::Week);
        assert_eq!(config.smoothing.window_secs, 300);
        assert_eq!(config.smoothing.max_average_hours, 12.0);
        assert_eq!(config.log_file, Some(PathBuf::from("dashboard.log")));
    }

    #[test]
    fn test_cli_overrides_file() {
        let args = Args {
            web_address: Some("127.0.0.1:9999".to_string()),
            poll_interval_secs: Some(2),
            log_file: Some(PathBuf::from("cli.log")),
            ..Default::default()
        };
        let toml_str = r#"
            [server]
            listen_address = "0.0.0.0:7070"
            [polling]
            interval_secs = 10
            [logging]
            file = "file.log"
        "#;
        let config = Config::from_toml_str(toml_str, &args).unwrap();
        assert_eq!(config.web_server_address, "127.0.0.1:9999");
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.log_file, Some(PathBuf::from("cli.log")));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_interval = "[polling]\ninterval_secs = 0";
        assert!(matches!(
            Config::from_toml_str(zero_interval, &Args::default()),
            Err(ConfigError::Invalid(_))
        ));

        let zero_block_time = "[chain]\nblock_time_secs = 0";
        assert!(matches!(
            Config::from_toml_str(zero_block_time, &Args::default()),
            Err(ConfigError::Invalid(_))
        ));

        let bad_period = "[display]\ndefault_period = \"fortnight\"";
        assert!(matches!(
            Config::from_toml_str(bad_period, &Args::default()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        fs::write(&path, "[polling]\ninterval_secs = 7\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 7);
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let sample = include_str!("../config/web-dashboard.config.toml");
        let from_sample = Config::from_toml_str(sample, &Args::default()).unwrap();
        let defaults = Config::from_toml_str("", &Args::default()).unwrap();
        assert_eq!(from_sample.endpoints, defaults.endpoints);
        assert_eq!(from_sample.chain, defaults.chain);
        assert_eq!(from_sample.smoothing, defaults.smoothing);
        assert_eq!(from_sample.web_server_address, defaults.web_server_address);
        assert_eq!(from_sample.log_file, None);
    }
}
