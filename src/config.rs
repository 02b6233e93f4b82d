//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the judge runs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::constants::{
    DEFAULT_COMPILE_TIMEOUT_MS, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DOCKER_TIMEOUT_SECS,
    DEFAULT_EXAM_SWEEP_CRON, DEFAULT_EXAM_UNLOCK_CRON, DEFAULT_HEALTH_HOST, DEFAULT_HEALTH_PORT,
    DEFAULT_JUDGE_IMAGE, DEFAULT_LOG_FILTER, DEFAULT_OUTPUT_LIMIT_BYTES, DEFAULT_PIDS_LIMIT,
    DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_QUEUE_KEY_PREFIX, DEFAULT_SAFETY_MARGIN_MS,
    DEFAULT_TMPFS_SIZE, DEFAULT_UNLOCK_COOLDOWN_MINUTES, DEFAULT_WORKER_COUNT,
};

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub docker: DockerConfig,
    pub judge: JudgeConfig,
    pub exam: ExamConfig,
}

/// Health probe and logging configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub json_logs: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Prefix of the two judge lists
    pub queue_key_prefix: String,
}

/// Docker configuration for sandbox containers
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Non-default daemon address (`DOCKER_HOST`)
    pub host: Option<String>,
    /// Image used by compiled-language recipes
    pub judge_image: String,
    pub pids_limit: i64,
    pub tmpfs_size: String,
    /// Daemon request timeout in seconds
    pub timeout_secs: u64,
    pub seccomp_profile: Option<PathBuf>,
    /// Bytes of program output a recipe emits
    pub output_limit_bytes: usize,
}

/// Judge worker configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub workers: usize,
    pub poll_timeout_secs: u64,
    pub safety_margin_ms: u64,
    pub compile_timeout_ms: u64,
}

/// Exam sweep configuration
#[derive(Debug, Clone)]
pub struct ExamConfig {
    pub sweep_cron: String,
    pub unlock_cron: String,
    pub unlock_cooldown_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig::from_env(),
            docker: DockerConfig::from_env()?,
            judge: JudgeConfig::from_env()?,
            exam: ExamConfig::from_env()?,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HEALTH_HOST").unwrap_or_else(|_| DEFAULT_HEALTH_HOST.to_string()),
            port: parse_var("HEALTH_PORT", DEFAULT_HEALTH_PORT)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
        })
    }
}

impl RedisConfig {
    fn from_env() -> Self {
        Self {
            url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_key_prefix: env::var("QUEUE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_QUEUE_KEY_PREFIX.to_string()),
        }
    }
}

impl DockerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("DOCKER_HOST").ok().filter(|v| !v.trim().is_empty()),
            judge_image: env::var("DOCKER_IMAGE_JUDGE")
                .unwrap_or_else(|_| DEFAULT_JUDGE_IMAGE.to_string()),
            pids_limit: parse_var("DOCKER_JUDGE_PIDS_LIMIT", DEFAULT_PIDS_LIMIT)?,
            tmpfs_size: env::var("DOCKER_JUDGE_TMPFS_SIZE")
                .unwrap_or_else(|_| DEFAULT_TMPFS_SIZE.to_string()),
            timeout_secs: parse_var("DOCKER_JUDGE_TIMEOUT", DEFAULT_DOCKER_TIMEOUT_SECS)?,
            seccomp_profile: env::var("DOCKER_SECCOMP_PROFILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            output_limit_bytes: parse_var("DOCKER_JUDGE_OUTPUT_LIMIT", DEFAULT_OUTPUT_LIMIT_BYTES)?,
        })
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            judge_image: DEFAULT_JUDGE_IMAGE.to_string(),
            pids_limit: DEFAULT_PIDS_LIMIT,
            tmpfs_size: DEFAULT_TMPFS_SIZE.to_string(),
            timeout_secs: DEFAULT_DOCKER_TIMEOUT_SECS,
            seccomp_profile: None,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl JudgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let workers: usize = parse_var("JUDGE_WORKERS", DEFAULT_WORKER_COUNT)?;
        if workers == 0 {
            return Err(ConfigError::InvalidValue("JUDGE_WORKERS".to_string()));
        }

        Ok(Self {
            workers,
            poll_timeout_secs: parse_var("JUDGE_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
            safety_margin_ms: parse_var("JUDGE_SAFETY_MARGIN_MS", DEFAULT_SAFETY_MARGIN_MS)?,
            compile_timeout_ms: parse_var("JUDGE_COMPILE_TIMEOUT_MS", DEFAULT_COMPILE_TIMEOUT_MS)?,
        })
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            safety_margin_ms: DEFAULT_SAFETY_MARGIN_MS,
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
        }
    }
}

impl ExamConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            sweep_cron: env::var("EXAM_SWEEP_CRON")
                .unwrap_or_else(|_| DEFAULT_EXAM_SWEEP_CRON.to_string()),
            unlock_cron: env::var("EXAM_UNLOCK_CRON")
                .unwrap_or_else(|_| DEFAULT_EXAM_UNLOCK_CRON.to_string()),
            unlock_cooldown_minutes: parse_var(
                "EXAM_UNLOCK_COOLDOWN_MINUTES",
                DEFAULT_UNLOCK_COOLDOWN_MINUTES,
            )?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let docker = DockerConfig::default();
        assert_eq!(docker.pids_limit, 64);
        assert_eq!(docker.tmpfs_size, "100m");
        assert!(docker.seccomp_profile.is_none());

        let judge = JudgeConfig::default();
        assert_eq!(judge.workers, 2);
        assert_eq!(judge.safety_margin_ms, 3_000);
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let value: u64 = parse_var("JUDGEFLOW_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }
}
