//! Handle for communicating with the lifecycle actor.

use tokio::sync::{mpsc, oneshot};

use super::LifecycleError;
use super::commands::{LifecycleCommand, TorrentStats};
use super::reconcile::ReconcileReport;
use crate::engine::SessionSnapshot;
use crate::torrent::{InfoHash, TorrentSource};

/// Handle for communicating with the lifecycle actor.
///
/// Provides an ergonomic async API for sending commands to the lifecycle
/// manager. Cheap to clone and safe to share across tasks; the embedding
/// HTTP layer typically keeps one clone per connection handler.
#[derive(Clone)]
pub struct LifecycleHandle {
    sender: mpsc::Sender<LifecycleCommand>,
}

impl LifecycleHandle {
    /// Creates a new handle with the given command sender.
    pub(super) fn new(sender: mpsc::Sender<LifecycleCommand>) -> Self {
        Self { sender }
    }

    /// Reports a consumer stream opening for an identifier.
    ///
    /// Cancels any pending teardown for the session and returns the new
    /// open-stream count. Callers must pair every open with exactly one
    /// [`stream_closed`](Self::stream_closed) for the same identifier.
    ///
    /// # Errors
    /// - `LifecycleError::ManagerShutdown` - The actor is no longer running
    pub async fn stream_opened(
        &self,
        info_hash: InfoHash,
        name: &str,
    ) -> Result<usize, LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::StreamOpened {
            info_hash,
            name: name.to_string(),
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)
    }

    /// Reports a consumer stream closing for an identifier.
    ///
    /// Returns the remaining open-stream count; when it reaches zero the
    /// grace-period teardown timer is armed.
    ///
    /// # Errors
    /// - `LifecycleError::ManagerShutdown` - The actor is no longer running
    pub async fn stream_closed(
        &self,
        info_hash: InfoHash,
        name: &str,
    ) -> Result<usize, LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::StreamClosed {
            info_hash,
            name: name.to_string(),
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)
    }

    /// Admits a session into the streaming engine, or returns the existing
    /// one when another request already won the race to add it.
    ///
    /// # Errors
    /// - `LifecycleError::Torrent` - The source could not be decoded
    /// - `LifecycleError::Engine` - The engine rejected the session
    /// - `LifecycleError::ManagerShutdown` - The actor is no longer running
    pub async fn admit(&self, source: TorrentSource) -> Result<SessionSnapshot, LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::Admit { source, responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)?
    }

    /// Re-admits persisted seeds from the seed directory.
    ///
    /// Intended to be called once at startup; each re-admitted seed starts a
    /// fresh grace period.
    ///
    /// # Errors
    /// - `LifecycleError::ManagerShutdown` - The actor is no longer running
    pub async fn reconcile(&self) -> Result<ReconcileReport, LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::Reconcile { responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)
    }

    /// Returns stats for every live session, including open-stream counts.
    ///
    /// # Errors
    /// - `LifecycleError::ManagerShutdown` - The actor is no longer running
    pub async fn stats(&self) -> Result<Vec<TorrentStats>, LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::Stats { responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)
    }

    /// Returns the current open-stream count for one identifier.
    ///
    /// # Errors
    /// - `LifecycleError::ManagerShutdown` - The actor is no longer running
    pub async fn open_streams(&self, info_hash: InfoHash) -> Result<usize, LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::OpenStreams {
            info_hash,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)
    }

    /// Shuts down the lifecycle actor gracefully.
    ///
    /// # Errors
    /// - `LifecycleError::ManagerShutdown` - The actor already stopped
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let (responder, rx) = oneshot::channel();
        let cmd = LifecycleCommand::Shutdown { responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| LifecycleError::ManagerShutdown)?;

        rx.await.map_err(|_| LifecycleError::ManagerShutdown)
    }

    /// Checks whether the lifecycle actor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
