// src/poll/state.rs
//! Persisted poll state and the state store interface.
//!
//! The snapshot exists to survive crash/reload: attempt counts are resumed
//! across restarts, in-flight calls are never persisted. The store itself is
//! an external collaborator behind a trait; the JSON file implementation is
//! a convenience, not a mandate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    pub is_running: bool,
    pub attempt_count: u64,
    /// Unix milliseconds of the last snapshot write
    pub last_update_timestamp: i64,
}

impl PollState {
    pub fn now(is_running: bool, attempt_count: u64) -> Self {
        Self {
            is_running,
            attempt_count,
            last_update_timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<Option<PollState>>;
    async fn save(&self, state: &PollState) -> Result<()>;
}

/// Snapshot persistence as a single pretty-printed JSON file.
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<Option<PollState>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let state = serde_json::from_slice(&bytes)
                    .with_context(|| format!("malformed poll state in {}", self.path.display()))?;
                Ok(Some(state))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        }
    }

    async fn save(&self, state: &PollState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests and simulated runs.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: RwLock<Option<PollState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<PollState> {
        *self.inner.read().await
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<PollState>> {
        Ok(*self.inner.read().await)
    }

    async fn save(&self, state: &PollState) -> Result<()> {
        *self.inner.write().await = Some(*state);
        Ok(())
    }
}
