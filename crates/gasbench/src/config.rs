//! # Harness Configuration
//!
//! Loaded once from `gasbench.toml`. Every key is optional:
//!
//! ```toml
//! [rpc]
//! url = "http://127.0.0.1:8545"
//! contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! timeout_ms = 30000
//! log_page_size = 50000
//!
//! [snapshot]
//! batch_size = 500
//! id_origin = "auto"   # "auto" | "zero" | "one"
//! from_block = 0
//! # to_block = 19000000   # pin both builders to one block
//!
//! [retry]
//! max_attempts = 4
//! initial_backoff_ms = 250
//! max_backoff_ms = 8000
//!
//! [whitelist]
//! generated = 1000
//! seed = 0
//! ```
//!
//! `GASBENCH_RPC_URL` overrides `rpc.url`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gasbench_chain::{Address, RetryPolicy, RpcConfig};
use gasbench_snapshot::{DirectQueryConfig, IdOrigin, ReplayConfig};
use serde::Deserialize;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

/// Environment variable that replaces `rpc.url`.
pub const RPC_URL_ENV: &str = "GASBENCH_RPC_URL";

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "gasbench.toml";

/// Root of `gasbench.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Node connection.
    pub rpc: RpcSection,
    /// Builder tuning.
    pub snapshot: SnapshotSection,
    /// Retry policy around every chain call.
    pub retry: RetrySection,
    /// Whitelist generation.
    pub whitelist: WhitelistSection,
}

/// `[rpc]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpcSection {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Collection address.
    pub contract: Option<Address>,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Blocks per `eth_getLogs` page.
    pub log_page_size: u64,
}

impl Default for RpcSection {
    fn default() -> Self {
        let defaults = RpcConfig::default();
        Self {
            url: defaults.rpc_url,
            contract: None,
            timeout_ms: duration_ms(defaults.request_timeout),
            log_page_size: defaults.log_page_size,
        }
    }
}

/// How token ids are numbered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginSetting {
    /// Probe `ownerOf(0)`.
    #[default]
    Auto,
    /// Ids start at 0.
    Zero,
    /// Ids start at 1.
    One,
}

/// `[snapshot]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotSection {
    /// Concurrent `ownerOf` calls per batch.
    pub batch_size: usize,
    /// Id numbering.
    pub id_origin: OriginSetting,
    /// First block of the Transfer history.
    pub from_block: u64,
    /// Pin both builders to this block.
    pub to_block: Option<u64>,
}

impl Default for SnapshotSection {
    fn default() -> Self {
        Self {
            batch_size: DirectQueryConfig::default().batch_size,
            id_origin: OriginSetting::Auto,
            from_block: 0,
            to_block: None,
        }
    }
}

/// `[retry]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Attempts per call including the first.
    pub max_attempts: u32,
    /// First backoff delay.
    pub initial_backoff_ms: u64,
    /// Backoff cap.
    pub max_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_backoff_ms: duration_ms(defaults.initial_backoff),
            max_backoff_ms: duration_ms(defaults.max_backoff),
        }
    }
}

/// `[whitelist]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WhitelistSection {
    /// File with one member address per line.
    pub input: Option<PathBuf>,
    /// Synthetic members appended after the input.
    pub generated: usize,
    /// Seed for the synthetic members.
    pub seed: u64,
}

impl Default for WhitelistSection {
    fn default() -> Self {
        Self {
            input: None,
            generated: 1000,
            seed: 0,
        }
    }
}

impl HarnessConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// `Config` for invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> HarnessResult<Self> {
        toml::from_str(text).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Loads `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// `Io` if the file exists but cannot be read, `Config` if it is invalid.
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Applies `GASBENCH_RPC_URL` from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_rpc_url_override(std::env::var(RPC_URL_ENV).ok())
    }

    /// Replaces `rpc.url` when `url` is set and non-empty.
    #[must_use]
    pub fn with_rpc_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            self.rpc.url = url;
        }
        self
    }

    /// Client settings for the configured node.
    ///
    /// # Errors
    ///
    /// `Config` if no contract address is set.
    pub fn rpc_config(&self) -> HarnessResult<RpcConfig> {
        let contract = self
            .rpc
            .contract
            .ok_or_else(|| HarnessError::Config("rpc.contract is required".into()))?;
        Ok(RpcConfig::local(contract)
            .with_rpc_url(self.rpc.url.clone())
            .with_request_timeout(Duration::from_millis(self.rpc.timeout_ms))
            .with_log_page_size(self.rpc.log_page_size))
    }

    /// Direct-query builder settings.
    #[must_use]
    pub fn direct_config(&self) -> DirectQueryConfig {
        let mut config = DirectQueryConfig::default().with_batch_size(self.snapshot.batch_size);
        if let Some(block) = self.snapshot.to_block {
            config = config.with_at_block(block);
        }
        match self.snapshot.id_origin {
            OriginSetting::Auto => config,
            OriginSetting::Zero => config.with_id_origin(IdOrigin::ZeroBased),
            OriginSetting::One => config.with_id_origin(IdOrigin::OneBased),
        }
    }

    /// Event-replay builder settings.
    #[must_use]
    pub fn replay_config(&self) -> ReplayConfig {
        let config = ReplayConfig::default().with_from_block(self.snapshot.from_block);
        match self.snapshot.to_block {
            Some(block) => config.with_to_block(block),
            None => config,
        }
    }

    /// Retry policy for chain calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.retry.max_attempts)
            .with_initial_backoff(Duration::from_millis(self.retry.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(self.retry.max_backoff_ms))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
