//! Swarmcast Core - torrent session lifecycle management for swarm-backed streaming
//!
//! This crate provides the building blocks for streaming swarm-distributed
//! content to HTTP clients on demand: torrent metainfo decoding, the swarm
//! engine seam, and the session lifecycle manager that counts open consumer
//! streams, schedules grace-period teardowns, and reconciles persisted seeds
//! at startup.

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod torrent;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::SwarmcastConfig;
pub use engine::{EngineError, SessionSnapshot, SwarmEngine};
pub use lifecycle::{LifecycleError, LifecycleHandle, MetadataAcquirer, spawn_lifecycle_manager};
pub use torrent::{InfoHash, TorrentError, TorrentSource};

/// Core errors that can bubble up from any Swarmcast subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SwarmcastError {
    #[error("Torrent error: {0}")]
    Torrent(#[from] TorrentError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SwarmcastError>;
