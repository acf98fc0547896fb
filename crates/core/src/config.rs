use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Weekday};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::WeekdayAvailability;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub channel: ChannelConfig,
    pub llm: LlmConfig,
    pub geocode: GeocodeConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// WhatsApp Cloud API credentials for the store's business number.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub access_token: SecretString,
    pub verify_token: SecretString,
    pub phone_number_id: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct GeocodeConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// The store being served: identity, coordinates for the delivery radius
/// check, fees, opening hours and the operator's alert number.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub delivery_max_radius_km: f64,
    pub delivery_fee: Decimal,
    pub operator_phone: Option<String>,
    /// JSON file holding the menu; read once at bootstrap.
    pub menu_path: String,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub open_days: WeekdayAvailability,
}

impl StoreConfig {
    pub fn is_open(&self, day: Weekday, time: NaiveTime) -> bool {
        if !self.open_days.allows(day) {
            return false;
        }
        if self.opens_at <= self.closes_at {
            time >= self.opens_at && time < self.closes_at
        } else {
            // Window crossing midnight, e.g. 18:00 to 01:00.
            time >= self.opens_at || time < self.closes_at
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub channel_access_token: Option<String>,
    pub channel_verify_token: Option<String>,
    pub geocode_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://comanda.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            channel: ChannelConfig {
                access_token: String::new().into(),
                verify_token: String::new().into(),
                phone_number_id: String::new(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            geocode: GeocodeConfig {
                api_key: String::new().into(),
                base_url: "https://maps.googleapis.com/maps/api".to_string(),
                timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            store: StoreConfig {
                id: "default".to_string(),
                name: String::new(),
                city: String::new(),
                state: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                delivery_max_radius_km: 10.0,
                delivery_fee: Decimal::ZERO,
                operator_phone: None,
                menu_path: "menu.json".to_string(),
                opens_at: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
                closes_at: NaiveTime::from_hms_opt(23, 30, 0).unwrap_or_default(),
                open_days: WeekdayAvailability::all_days(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("comanda.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(channel) = patch.channel {
            if let Some(access_token_value) = channel.access_token {
                self.channel.access_token = secret_value(access_token_value);
            }
            if let Some(verify_token_value) = channel.verify_token {
                self.channel.verify_token = secret_value(verify_token_value);
            }
            if let Some(phone_number_id) = channel.phone_number_id {
                self.channel.phone_number_id = phone_number_id;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(geocode) = patch.geocode {
            if let Some(api_key_value) = geocode.api_key {
                self.geocode.api_key = secret_value(api_key_value);
            }
            if let Some(base_url) = geocode.base_url {
                self.geocode.base_url = base_url;
            }
            if let Some(timeout_secs) = geocode.timeout_secs {
                self.geocode.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(store) = patch.store {
            if let Some(id) = store.id {
                self.store.id = id;
            }
            if let Some(name) = store.name {
                self.store.name = name;
            }
            if let Some(city) = store.city {
                self.store.city = city;
            }
            if let Some(state) = store.state {
                self.store.state = state;
            }
            if let Some(latitude) = store.latitude {
                self.store.latitude = latitude;
            }
            if let Some(longitude) = store.longitude {
                self.store.longitude = longitude;
            }
            if let Some(radius) = store.delivery_max_radius_km {
                self.store.delivery_max_radius_km = radius;
            }
            if let Some(fee) = store.delivery_fee {
                self.store.delivery_fee = fee;
            }
            if let Some(operator_phone) = store.operator_phone {
                self.store.operator_phone = Some(operator_phone);
            }
            if let Some(menu_path) = store.menu_path {
                self.store.menu_path = menu_path;
            }
            if let Some(raw) = store.opens_at {
                self.store.opens_at = parse_time("store.opens_at", &raw)?;
            }
            if let Some(raw) = store.closes_at {
                self.store.closes_at = parse_time("store.closes_at", &raw)?;
            }
            if let Some(days) = store.open_days {
                self.store.open_days = parse_open_days(&days)?;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COMANDA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COMANDA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("COMANDA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COMANDA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COMANDA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COMANDA_CHANNEL_ACCESS_TOKEN") {
            self.channel.access_token = secret_value(value);
        }
        if let Some(value) = read_env("COMANDA_CHANNEL_VERIFY_TOKEN") {
            self.channel.verify_token = secret_value(value);
        }
        if let Some(value) = read_env("COMANDA_CHANNEL_PHONE_NUMBER_ID") {
            self.channel.phone_number_id = value;
        }

        if let Some(value) = read_env("COMANDA_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("COMANDA_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("COMANDA_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("COMANDA_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("COMANDA_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("COMANDA_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("COMANDA_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("COMANDA_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("COMANDA_GEOCODE_API_KEY") {
            self.geocode.api_key = secret_value(value);
        }
        if let Some(value) = read_env("COMANDA_GEOCODE_BASE_URL") {
            self.geocode.base_url = value;
        }

        if let Some(value) = read_env("COMANDA_STORE_MENU_PATH") {
            self.store.menu_path = value;
        }

        if let Some(value) = read_env("COMANDA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COMANDA_SERVER_PORT") {
            self.server.port = parse_u16("COMANDA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COMANDA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COMANDA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("COMANDA_LOGGING_LEVEL").or_else(|| read_env("COMANDA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COMANDA_LOGGING_FORMAT").or_else(|| read_env("COMANDA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(access_token) = overrides.channel_access_token {
            self.channel.access_token = secret_value(access_token);
        }
        if let Some(verify_token) = overrides.channel_verify_token {
            self.channel.verify_token = secret_value(verify_token);
        }
        if let Some(api_key) = overrides.geocode_api_key {
            self.geocode.api_key = secret_value(api_key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_store(&self.store)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("comanda.toml"), PathBuf::from("config/comanda.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_open_days(days: &[String]) -> Result<WeekdayAvailability, ConfigError> {
    let mut parsed = Vec::with_capacity(days.len());
    for day in days {
        let weekday = match day.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" | "segunda" => Weekday::Mon,
            "tue" | "tuesday" | "terca" => Weekday::Tue,
            "wed" | "wednesday" | "quarta" => Weekday::Wed,
            "thu" | "thursday" | "quinta" => Weekday::Thu,
            "fri" | "friday" | "sexta" => Weekday::Fri,
            "sat" | "saturday" | "sabado" => Weekday::Sat,
            "sun" | "sunday" | "domingo" => Weekday::Sun,
            other => {
                return Err(ConfigError::Validation(format!(
                    "store.open_days contains unknown weekday `{other}`"
                )))
            }
        };
        parsed.push(weekday);
    }
    Ok(WeekdayAvailability::only(&parsed))
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.id.trim().is_empty() {
        return Err(ConfigError::Validation("store.id must not be empty".to_string()));
    }

    if !(-90.0..=90.0).contains(&store.latitude) {
        return Err(ConfigError::Validation(
            "store.latitude must be in range -90..=90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&store.longitude) {
        return Err(ConfigError::Validation(
            "store.longitude must be in range -180..=180".to_string(),
        ));
    }

    if store.delivery_max_radius_km <= 0.0 {
        return Err(ConfigError::Validation(
            "store.delivery_max_radius_km must be greater than zero".to_string(),
        ));
    }

    if store.delivery_fee < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "store.delivery_fee must not be negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    channel: Option<ChannelPatch>,
    llm: Option<LlmPatch>,
    geocode: Option<GeocodePatch>,
    server: Option<ServerPatch>,
    store: Option<StorePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelPatch {
    access_token: Option<String>,
    verify_token: Option<String>,
    phone_number_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    id: Option<String>,
    name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    delivery_max_radius_km: Option<f64>,
    delivery_fee: Option<Decimal>,
    operator_phone: Option<String>,
    menu_path: Option<String>,
    opens_at: Option<String>,
    closes_at: Option<String>,
    open_days: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
