use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

pub const COOKIE_SECURE_ENV: &str = "SESSION_GATE_COOKIE_SECURE";

#[derive(Debug, Parser)]
#[command(
    name = "session-gate",
    version,
    about = "Session login, logout, registration and admin gate"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    #[arg(long, short = 'd', value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Session lifetime, e.g. `24h` or `30m`.
    #[arg(long, value_name = "DURATION")]
    pub session_ttl: Option<String>,

    #[arg(long, value_name = "SECONDS")]
    pub sweep_interval_seconds: Option<u64>,

    #[arg(long, value_name = "COUNT")]
    pub max_sessions: Option<usize>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub session_ttl: Duration,
    pub sweep_interval_seconds: u64,
    pub max_sessions: usize,
    pub cookie_secure: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid boolean value for env var {key}: {value}")]
    InvalidEnvBool { key: String, value: String },
    #[error("invalid session ttl {value}: {source}")]
    InvalidTtl {
        value: String,
        source: humantime::DurationError,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    data_dir: Option<PathBuf>,
    session_ttl: Option<String>,
    sweep_interval_seconds: Option<u64>,
    max_sessions: Option<usize>,
    cookie_secure: Option<bool>,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;
        let env_cookie_secure = read_env_bool(COOKIE_SECURE_ENV)?;

        let bind = cli
            .bind
            .or(from_file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));
        let data_dir = cli
            .data_dir
            .or(from_file.data_dir)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let session_ttl = parse_ttl(
            cli.session_ttl
                .or(from_file.session_ttl)
                .as_deref()
                .unwrap_or("24h"),
        )?;
        let sweep_interval_seconds = cli
            .sweep_interval_seconds
            .or(from_file.sweep_interval_seconds)
            .unwrap_or(60)
            .max(1);
        let max_sessions = cli
            .max_sessions
            .or(from_file.max_sessions)
            .unwrap_or(10_000)
            .max(1);
        let cookie_secure = env_cookie_secure
            .or(from_file.cookie_secure)
            .unwrap_or(false);

        Ok(Self {
            bind,
            data_dir,
            session_ttl,
            sweep_interval_seconds,
            max_sessions,
            cookie_secure,
        })
    }
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|source| ConfigError::InvalidTtl {
        value: String::from(raw),
        source,
    })
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn read_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_bool_value(key, &value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from("<non-unicode>"),
        }),
    }
}

fn parse_bool_value(key: &str, raw: &str) -> Result<bool, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from(raw),
        }),
    }
}
