//! Dedup run configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use citeblock_core::env_config::{env_parse_with_default, env_string};
use citeblock_core::{
    DEFAULT_MODEL_PATH, QUIESCENCE_MAX_WAIT_SECS, QUIESCENCE_POLL_SECS, QUIESCENCE_WINDOW_SECS,
};

#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Trained blocking model.
    pub model_path: PathBuf,
    /// A review is ready once its newest record is at least this old.
    pub quiescence_window: Duration,
    pub poll_interval: Duration,
    /// Upper bound on the readiness wait.
    pub max_wait: Duration,
    /// Key-hash shards for block building.
    pub block_shards: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            quiescence_window: Duration::from_secs(QUIESCENCE_WINDOW_SECS),
            poll_interval: Duration::from_secs(QUIESCENCE_POLL_SECS),
            max_wait: Duration::from_secs(QUIESCENCE_MAX_WAIT_SECS),
            block_shards: default_shards(),
        }
    }
}

impl DedupConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let poll_secs = env_parse_with_default("CITEBLOCK_QUIESCENCE_POLL_SECS", QUIESCENCE_POLL_SECS);
        if poll_secs == 0 {
            tracing::warn!("CITEBLOCK_QUIESCENCE_POLL_SECS=0 would busy-poll, using 1");
        }
        let shards = env_parse_with_default("CITEBLOCK_BLOCK_SHARDS", defaults.block_shards);
        Self {
            model_path: env_string("CITEBLOCK_MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
            quiescence_window: Duration::from_secs(env_parse_with_default(
                "CITEBLOCK_QUIESCENCE_SECS",
                QUIESCENCE_WINDOW_SECS,
            )),
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            max_wait: Duration::from_secs(env_parse_with_default(
                "CITEBLOCK_QUIESCENCE_MAX_WAIT_SECS",
                QUIESCENCE_MAX_WAIT_SECS,
            )),
            block_shards: clamp_shards(shards),
        }
    }

    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

fn default_shards() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Shard buffers are allocated up front; more than a few per core buys nothing.
fn clamp_shards(requested: usize) -> usize {
    let max = default_shards() * 4;
    let shards = requested.clamp(1, max);
    if shards != requested {
        tracing::warn!(requested, using = shards, "CITEBLOCK_BLOCK_SHARDS out of range");
    }
    shards
}
