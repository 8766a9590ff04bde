//! Command types processed by the lifecycle actor.

use tokio::sync::oneshot;

use super::LifecycleError;
use super::reconcile::ReconcileReport;
use crate::engine::SessionSnapshot;
use crate::torrent::{InfoHash, TorrentSource};

/// Messages the lifecycle actor processes, one at a time.
///
/// Every externally-visible operation carries a oneshot responder.
/// `GraceElapsed` is internal: teardown timer tasks send it back into the
/// actor's own channel when a grace period runs out.
pub enum LifecycleCommand {
    StreamOpened {
        info_hash: InfoHash,
        name: String,
        responder: oneshot::Sender<usize>,
    },
    StreamClosed {
        info_hash: InfoHash,
        name: String,
        responder: oneshot::Sender<usize>,
    },
    GraceElapsed {
        info_hash: InfoHash,
        epoch: u64,
    },
    Admit {
        source: TorrentSource,
        responder: oneshot::Sender<Result<SessionSnapshot, LifecycleError>>,
    },
    Reconcile {
        responder: oneshot::Sender<ReconcileReport>,
    },
    Stats {
        responder: oneshot::Sender<Vec<TorrentStats>>,
    },
    OpenStreams {
        info_hash: InfoHash,
        responder: oneshot::Sender<usize>,
    },
    Shutdown {
        responder: oneshot::Sender<()>,
    },
}

/// Read-only projection of one live session plus its consumer count.
///
/// Everything the embedding HTTP layer needs to render a status view;
/// computed fresh on every query, mutating nothing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TorrentStats {
    pub info_hash: InfoHash,
    pub name: String,
    pub total_length: u64,
    pub progress: f32,
    pub downloaded: u64,
    pub uploaded: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub peer_count: usize,
    /// Consumer streams currently reading from this session
    pub open_streams: usize,
    pub files: Vec<FileStats>,
}

/// Per-file slice of [`TorrentStats`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileStats {
    pub name: String,
    pub path: String,
    pub length: u64,
    pub downloaded: u64,
    pub progress: f32,
}
