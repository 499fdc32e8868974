//! Process-level configuration.
//!
//! Loaded once at startup from environment variables. `validate()` enforces
//! the production constraints and maps failures onto
//! [`NavigatorError::ConfigInvalid`], which a host binary should treat as
//! exit code `1` (missing signing key, unreadable config) — the exit-code
//! wiring itself is host-binary plumbing and out of scope for this crate.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{NavigatorError, NavigatorResult};

/// Deployment environment. Production requires a non-empty trusted-account
/// list; development accepts a synthetic identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local/dev mode — synthetic identity allowed, looser checks.
    Development,
    /// Production — trusted accounts and signing key are mandatory.
    Production,
}

/// Which model tier agents should prefer for this workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Default cloud-hosted model.
    Primary,
    /// On-device/GPU-accelerated model, with fallback to `Primary`.
    Accelerated,
}

/// Which session-store backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// External document store (abstracted behind `SessionStore`; no
    /// concrete client is part of this crate).
    Document,
    /// In-memory map — data lost on restart.
    Memory,
    /// Local JSON files on disk.
    File,
}

/// The full recognised configuration set.
#[derive(Debug, Clone)]
pub struct Config {
    /// `environment`.
    pub environment: Environment,
    /// `trusted_service_accounts` — required non-empty in production.
    pub trusted_service_accounts: Vec<String>,
    /// `signing_key` — symmetric key material, required.
    pub signing_key: String,
    /// `use_pbkdf2`, default false.
    pub use_pbkdf2: bool,
    /// `pbkdf2_iterations`, default 100_000, must be >= 100_000.
    pub pbkdf2_iterations: u32,
    /// `model_type`.
    pub model_type: ModelType,
    /// `session_store_backend`.
    pub session_store_backend: StoreBackend,
    /// `event_buffer_capacity`, default 256.
    pub event_buffer_capacity: usize,
    /// `message_queue_capacity`, default 1024.
    pub message_queue_capacity: usize,
    /// `history_capacity_per_session`, default 1000.
    pub history_capacity_per_session: usize,
    /// `clock_skew_tolerance_seconds`, default 5.
    pub clock_skew_tolerance_seconds: i64,
    /// `max_workflow_duration_seconds`, default 600.
    pub max_workflow_duration_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables, applying the
    /// documented defaults for anything unset.
    pub fn from_env() -> NavigatorResult<Self> {
        let environment = match env::var("environment").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let trusted_service_accounts = env::var("trusted_service_accounts")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let signing_key = env::var("signing_key").unwrap_or_default();

        let use_pbkdf2 = matches!(env::var("use_pbkdf2").as_deref(), Ok("true") | Ok("1"));

        let pbkdf2_iterations = env::var("pbkdf2_iterations")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100_000);

        let model_type = match env::var("model_type").as_deref() {
            Ok("accelerated") => ModelType::Accelerated,
            _ => ModelType::Primary,
        };

        let session_store_backend = match env::var("session_store_backend").as_deref() {
            Ok("document") => StoreBackend::Document,
            Ok("file") => StoreBackend::File,
            _ => StoreBackend::Memory,
        };

        let event_buffer_capacity = env_usize("event_buffer_capacity", 256);
        let message_queue_capacity = env_usize("message_queue_capacity", 1024);
        let history_capacity_per_session = env_usize("history_capacity_per_session", 1000);

        let clock_skew_tolerance_seconds = env::var("clock_skew_tolerance_seconds")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let max_workflow_duration_seconds = env::var("max_workflow_duration_seconds")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        let config = Self {
            environment,
            trusted_service_accounts,
            signing_key,
            use_pbkdf2,
            pbkdf2_iterations,
            model_type,
            session_store_backend,
            event_buffer_capacity,
            message_queue_capacity,
            history_capacity_per_session,
            clock_skew_tolerance_seconds,
            max_workflow_duration_seconds,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the documented production constraints.
    pub fn validate(&self) -> NavigatorResult<()> {
        if self.signing_key.is_empty() {
            return Err(NavigatorError::ConfigInvalid {
                message: "signing_key is required".to_string(),
            });
        }
        if self.environment == Environment::Production && self.trusted_service_accounts.is_empty()
        {
            return Err(NavigatorError::ConfigInvalid {
                message: "trusted_service_accounts must be non-empty in production".to_string(),
            });
        }
        if self.pbkdf2_iterations < 100_000 {
            return Err(NavigatorError::ConfigInvalid {
                message: "pbkdf2_iterations must be >= 100_000".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    /// Documented defaults with an empty `signing_key` — callers must set
    /// one before `validate()` will pass. Useful for tests that only care
    /// about a subset of fields.
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            trusted_service_accounts: Vec::new(),
            signing_key: String::new(),
            use_pbkdf2: false,
            pbkdf2_iterations: 100_000,
            model_type: ModelType::Primary,
            session_store_backend: StoreBackend::Memory,
            event_buffer_capacity: 256,
            message_queue_capacity: 1024,
            history_capacity_per_session: 1000,
            clock_skew_tolerance_seconds: 5,
            max_workflow_duration_seconds: 600,
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
