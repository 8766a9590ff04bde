//! Swarm engine abstraction consumed by the lifecycle core.
//!
//! Peer discovery, piece selection, and the wire protocol live behind this
//! trait in an external engine. The lifecycle manager only ever admits and
//! removes sessions and reads their snapshots; it never mutates engine
//! internals directly.

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::SwarmcastConfig;
use crate::torrent::{InfoHash, TorrentSource};

/// Options applied when admitting a session into an engine.
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Directory downloaded payload is materialized into
    pub download_dir: PathBuf,
    /// Maximum concurrent peer connections for the session
    pub max_connections: usize,
    /// Aggregate download limit in bytes per second
    pub download_limit: u64,
    /// Aggregate upload limit in bytes per second
    pub upload_limit: u64,
}

impl AddOptions {
    /// Builds add options from the configured storage and engine sections.
    pub fn from_config(config: &SwarmcastConfig) -> Self {
        Self {
            download_dir: config.storage.download_dir.clone(),
            max_connections: config.engine.max_connections,
            download_limit: config.engine.download_limit,
            upload_limit: config.engine.upload_limit,
        }
    }
}

/// Read-only view of one file within an engine session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionFile {
    pub name: String,
    pub path: String,
    pub length: u64,
    pub downloaded: u64,
}

impl SessionFile {
    /// Download progress of this file (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        if self.length == 0 {
            1.0
        } else {
            (self.downloaded as f64 / self.length as f64) as f32
        }
    }
}

/// Read-only snapshot of an engine session.
///
/// Copied out of the engine on every query so the lifecycle core never holds
/// references into engine state across suspension points.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSnapshot {
    pub info_hash: InfoHash,
    pub name: String,
    pub total_length: u64,
    pub files: Vec<SessionFile>,
    /// Aggregate download progress (0.0 to 1.0)
    pub progress: f32,
    pub downloaded: u64,
    pub uploaded: u64,
    /// Current download rate in bytes per second
    pub download_speed: u64,
    /// Current upload rate in bytes per second
    pub upload_speed: u64,
    pub peer_count: usize,
}

/// Errors surfaced by a swarm engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Session {info_hash} already exists")]
    Duplicate { info_hash: InfoHash },

    #[error("Session {info_hash} not found")]
    NotFound { info_hash: InfoHash },

    #[error("Metadata acquisition failed: {reason}")]
    Metadata { reason: String },

    #[error("Engine failure: {reason}")]
    Engine { reason: String },
}

/// Contract the lifecycle core consumes from a swarm engine.
///
/// Implementations wrap a live peer-protocol engine. All operations are
/// asynchronous; `add` resolves once the session's metadata is ready, and
/// `remove` resolves once the session has been fully destroyed.
#[async_trait]
pub trait SwarmEngine: Send + Sync + 'static {
    /// Admits a torrent and waits for its metadata to become available.
    ///
    /// # Errors
    /// - `EngineError::Duplicate` - A session for this identifier already exists
    /// - `EngineError::Metadata` - The source could not be decoded
    /// - `EngineError::Engine` - The engine rejected the session
    async fn add(
        &self,
        source: TorrentSource,
        options: AddOptions,
    ) -> Result<SessionSnapshot, EngineError>;

    /// Returns a snapshot of one session, if it exists.
    async fn session(&self, info_hash: InfoHash) -> Option<SessionSnapshot>;

    /// Returns snapshots of all live sessions.
    async fn sessions(&self) -> Vec<SessionSnapshot>;

    /// Destroys a session, optionally deleting its downloaded payload.
    ///
    /// # Errors
    /// - `EngineError::NotFound` - No session for this identifier; callers
    ///   treat this as an already-completed removal
    async fn remove(&self, info_hash: InfoHash, delete_data: bool) -> Result<(), EngineError>;
}
