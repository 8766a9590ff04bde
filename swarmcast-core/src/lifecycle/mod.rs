//! Torrent session lifecycle management.
//!
//! The lifecycle manager decides when swarm sessions exist: it counts open
//! consumer streams per content identifier, arms a grace-period teardown
//! timer when the last stream closes, cancels it when a new stream opens,
//! and destroys the session (and its persisted seed metainfo) when the timer
//! fires untouched. At startup it re-admits previously interrupted seeds
//! from the seed directory.
//!
//! The manager runs as an actor: an owned state struct driven by a command
//! channel, processing one command at a time. Sequential processing is what
//! makes the reference-counting and timer transitions race-free without any
//! locking.

mod actor;
mod commands;
mod handle;
mod manager;

pub mod acquire;
pub mod reconcile;


pub use acquire::{MetadataAcquirer, SummaryFile, TorrentSummary};
pub use actor::spawn_lifecycle_manager;
pub use commands::{FileStats, TorrentStats};
pub use handle::LifecycleHandle;
pub use reconcile::ReconcileReport;

use crate::engine::EngineError;
use crate::torrent::TorrentError;

/// Errors surfaced by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Lifecycle manager is shut down")]
    ManagerShutdown,

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Torrent error: {0}")]
    Torrent(#[from] TorrentError),
}
