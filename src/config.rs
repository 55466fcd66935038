use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub graph_policy: GraphPolicyConfig,
    pub stale_sweep: StaleSweepConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

/// Numeric policy knobs for the constraint-analysis engine. These are
/// explicitly policy, not mathematics (see design notes on the ×11 external
/// adjustment constant), so they live in configuration rather than being
/// baked into the algorithms.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GraphPolicyConfig {
    /// The "10x pessimistic adjustment" multiplier applied to a published
    /// SLA's unavailability by the External-Provider Buffer.
    pub external_buffer_multiplier: f64,
    pub default_external_availability: f64,
    pub default_internal_availability: f64,
    pub max_traversal_depth: u32,
    pub default_traversal_depth: u32,
    #[serde(deserialize_with = "deserialize_duration_hours")]
    pub stale_edge_threshold_hours: i64,
    pub default_slo_target_pct: f64,
    pub monthly_budget_minutes: f64,
    pub high_risk_threshold_pct: f64,
    pub moderate_risk_threshold_pct: f64,
    pub traversal_timeout_ms: u64,
    pub telemetry_read_timeout_ms: u64,
    pub constraint_analysis_timeout_ms: u64,
    pub impact_analysis_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaleSweepConfig {
    pub enabled: bool,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub interval_secs: u64,
}

/// Command line arguments for configuration overrides.
#[derive(Parser, Debug, Clone)]
#[command(name = "slo-server")]
#[command(version, about = "SLO reliability-analysis server")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Server host (overrides config file)
    #[arg(long, value_name = "HOST")]
    pub server_host: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Logging level (overrides config file, e.g. "info,slo_server=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// External-provider pessimistic adjustment multiplier
    #[arg(long, value_name = "MULTIPLIER")]
    pub external_buffer_multiplier: Option<f64>,

    /// Staleness threshold for dependency edges (e.g. "168h", "7d")
    #[arg(long, value_name = "DURATION")]
    pub stale_edge_threshold: Option<String>,

    /// Disable the background stale-edge sweep
    #[arg(long)]
    pub disable_stale_sweep: bool,
}

impl Config {
    /// Load configuration with CLI, environment variable, and file support.
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables (prefixed with `APP_`)
    /// 3. Configuration file (`config.toml`)
    /// 4. Default values
    pub fn load() -> Result<Self, anyhow::Error> {
        let cli_args = CommandLineArgs::parse();

        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(&cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported: `APP_SERVER_HOST`, `APP_SERVER_PORT`, `APP_DATABASE_URL`,
    /// `APP_LOG_LEVEL`, `APP_EXTERNAL_BUFFER_MULTIPLIER`,
    /// `APP_STALE_EDGE_THRESHOLD_HOURS`.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Ok(port) = std::env::var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Ok(db_url) = std::env::var("APP_DATABASE_URL") {
            self.database.url = db_url;
            tracing::info!("Override database.url from env");
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Ok(multiplier) = std::env::var("APP_EXTERNAL_BUFFER_MULTIPLIER")
            && let Ok(val) = multiplier.parse()
        {
            self.graph_policy.external_buffer_multiplier = val;
            tracing::info!(
                "Override graph_policy.external_buffer_multiplier from env: {}",
                val
            );
        }

        if let Ok(threshold) = std::env::var("APP_STALE_EDGE_THRESHOLD_HOURS") {
            match parse_duration_to_hours(&threshold) {
                Ok(val) => {
                    self.graph_policy.stale_edge_threshold_hours = val;
                    tracing::info!(
                        "Override graph_policy.stale_edge_threshold_hours from env: {}",
                        val
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_STALE_EDGE_THRESHOLD_HOURS '{}': {} (keep {})",
                    threshold,
                    e,
                    self.graph_policy.stale_edge_threshold_hours
                ),
            }
        }
    }

    /// Apply command line argument overrides (highest priority).
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(host) = &args.server_host {
            self.server.host = host.clone();
            tracing::info!("Override server.host from CLI: {}", self.server.host);
        }

        if let Some(port) = args.server_port {
            self.server.port = port;
            tracing::info!("Override server.port from CLI: {}", self.server.port);
        }

        if let Some(db_url) = &args.database_url {
            self.database.url = db_url.clone();
            tracing::info!("Override database.url from CLI");
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }

        if let Some(multiplier) = args.external_buffer_multiplier {
            self.graph_policy.external_buffer_multiplier = multiplier;
            tracing::info!(
                "Override graph_policy.external_buffer_multiplier from CLI: {}",
                multiplier
            );
        }

        if let Some(threshold) = &args.stale_edge_threshold {
            match parse_duration_to_hours(threshold) {
                Ok(val) => {
                    self.graph_policy.stale_edge_threshold_hours = val;
                    tracing::info!(
                        "Override graph_policy.stale_edge_threshold_hours from CLI: {}",
                        val
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid --stale-edge-threshold '{}': {} (keep {})",
                    threshold,
                    e,
                    self.graph_policy.stale_edge_threshold_hours
                ),
            }
        }

        if args.disable_stale_sweep {
            self.stale_sweep.enabled = false;
            tracing::info!("Disabled stale-edge sweep from CLI");
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.graph_policy.max_traversal_depth == 0 || self.graph_policy.max_traversal_depth > 10
        {
            anyhow::bail!("graph_policy.max_traversal_depth must be in 1..=10");
        }

        if self.graph_policy.high_risk_threshold_pct <= self.graph_policy.moderate_risk_threshold_pct
        {
            anyhow::bail!(
                "graph_policy.high_risk_threshold_pct must exceed moderate_risk_threshold_pct"
            );
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths = ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/slo-server.db".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,slo_server=debug".to_string(), directory: None }
    }
}

impl Default for GraphPolicyConfig {
    fn default() -> Self {
        Self {
            external_buffer_multiplier: 11.0,
            default_external_availability: 0.999,
            default_internal_availability: 0.999,
            max_traversal_depth: 10,
            default_traversal_depth: 3,
            stale_edge_threshold_hours: 168,
            default_slo_target_pct: 99.9,
            monthly_budget_minutes: 43_200.0,
            high_risk_threshold_pct: 30.0,
            moderate_risk_threshold_pct: 20.0,
            traversal_timeout_ms: 2_000,
            telemetry_read_timeout_ms: 1_000,
            constraint_analysis_timeout_ms: 5_000,
            impact_analysis_timeout_ms: 5_000,
        }
    }
}

impl Default for StaleSweepConfig {
    fn default() -> Self {
        Self { enabled: true, interval_secs: 3600 }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        "d" | "day" | "days" => Ok(n * 60 * 60 * 24),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

fn parse_duration_to_hours(input: &str) -> Result<i64, String> {
    if let Ok(val) = input.parse::<i64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: i64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "h" | "hr" | "hour" | "hours" => Ok(n),
        "d" | "day" | "days" => Ok(n * 24),
        "w" | "week" | "weeks" => Ok(n * 24 * 7),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

// Custom serde deserializers to support numeric or human-friendly string values.
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(&v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}

fn deserialize_duration_hours<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = i64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of hours or a string like '168h', '7d', '2w'")
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as i64)
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_hours(v).map_err(E::custom)
        }
        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_hours(&v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
