//! Core state machine for the session lifecycle manager.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::LifecycleError;
use super::commands::{FileStats, LifecycleCommand, TorrentStats};
use super::reconcile::{ReconcileReport, collect_seed_candidates};
use crate::config::SwarmcastConfig;
use crate::engine::{AddOptions, EngineError, SessionSnapshot, SwarmEngine};
use crate::torrent::{InfoHash, TorrentSource};

/// Per-identifier consumer state.
///
/// An absent map entry means no open streams and no pending teardown.
/// `Active` holds a positive reader count and no timer; `Draining` holds a
/// zero count and exactly one armed timer. The two invariants "count present
/// only while positive" and "at most one timer per identifier" are
/// structural consequences of this representation.
enum StreamState {
    Active {
        readers: usize,
    },
    Draining {
        /// Arm generation echoed by the timer's message; a mismatch marks
        /// the fire as stale.
        epoch: u64,
        name: String,
        timer: JoinHandle<()>,
    },
}

/// Owned lifecycle state, driven by the actor loop.
///
/// All mutation of the stream map happens in the entry points below,
/// processed one command at a time.
pub(super) struct LifecycleManager<E: SwarmEngine> {
    engine: E,
    config: SwarmcastConfig,
    streams: HashMap<InfoHash, StreamState>,
    next_epoch: u64,
    self_tx: mpsc::Sender<LifecycleCommand>,
}

impl<E: SwarmEngine> LifecycleManager<E> {
    pub(super) fn new(
        config: SwarmcastConfig,
        engine: E,
        self_tx: mpsc::Sender<LifecycleCommand>,
    ) -> Self {
        Self {
            engine,
            config,
            streams: HashMap::new(),
            next_epoch: 0,
            self_tx,
        }
    }

    /// Registers a newly opened consumer stream.
    ///
    /// Increments the reader count and unconditionally cancels any pending
    /// teardown: an opened stream always wins over a scheduled teardown,
    /// however close the deadline. Returns the new reader count.
    pub(super) fn stream_opened(&mut self, info_hash: InfoHash, name: &str) -> usize {
        let readers = match self.streams.remove(&info_hash) {
            Some(StreamState::Active { readers }) => readers + 1,
            Some(StreamState::Draining { timer, .. }) => {
                timer.abort();
                tracing::debug!("Cancelled pending teardown of {name} ({info_hash})");
                1
            }
            None => 1,
        };
        self.streams
            .insert(info_hash, StreamState::Active { readers });
        tracing::debug!("Stream opened for {name} ({info_hash}), {readers} now open");
        readers
    }

    /// Registers a closed consumer stream.
    ///
    /// Decrements the reader count; when it reaches zero a teardown timer is
    /// armed, unless one is already pending. A close with no matching open
    /// clamps at zero and still arms, so an orphaned session cannot outlive
    /// its grace period. Returns the remaining reader count.
    pub(super) fn stream_closed(&mut self, info_hash: InfoHash, name: &str) -> usize {
        match self.streams.remove(&info_hash) {
            Some(StreamState::Active { readers }) if readers > 1 => {
                let readers = readers - 1;
                self.streams
                    .insert(info_hash, StreamState::Active { readers });
                tracing::debug!("Stream closed for {name} ({info_hash}), {readers} still open");
                readers
            }
            Some(StreamState::Active { .. }) => {
                tracing::debug!("Last stream closed for {name} ({info_hash})");
                self.arm_teardown(info_hash, name.to_string());
                0
            }
            Some(state @ StreamState::Draining { .. }) => {
                // Unmatched close while already draining; the existing timer
                // keeps its deadline.
                self.streams.insert(info_hash, state);
                tracing::warn!("Stream closed for {name} ({info_hash}) with no open streams");
                0
            }
            None => {
                tracing::warn!("Stream closed for {name} ({info_hash}) with no matching open");
                self.arm_teardown(info_hash, name.to_string());
                0
            }
        }
    }

    /// Arms the grace-period timer for an identifier with no pending timer.
    ///
    /// The spawned task sleeps through the grace period and reports back via
    /// the actor's own channel; cancellation aborts the task.
    fn arm_teardown(&mut self, info_hash: InfoHash, name: String) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let grace = self.config.lifecycle.seed_grace_period;
        let tx = self.self_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx
                .send(LifecycleCommand::GraceElapsed { info_hash, epoch })
                .await;
        });

        tracing::debug!(
            "Teardown armed for {name} ({info_hash}), grace period {}ms",
            grace.as_millis()
        );
        self.streams
            .insert(info_hash, StreamState::Draining { epoch, name, timer });
    }

    /// Handles a fired grace-period timer.
    ///
    /// Stale fires (epoch mismatch, or the identifier is no longer draining)
    /// are ignored. A valid fire removes the map entry before the engine
    /// call suspends: destroy-in-progress is a point of no return, and a
    /// stream opened afterwards starts a brand-new session instead of
    /// resurrecting a half-destroyed one.
    pub(super) async fn grace_elapsed(&mut self, info_hash: InfoHash, epoch: u64) {
        let name = match self.streams.get(&info_hash) {
            Some(StreamState::Draining {
                epoch: current,
                name,
                ..
            }) if *current == epoch => name.clone(),
            _ => {
                tracing::trace!("Ignoring stale teardown fire for {info_hash}");
                return;
            }
        };
        self.streams.remove(&info_hash);

        tracing::info!("Grace period elapsed for {name} ({info_hash}), removing session");
        let delete_data = !self.config.storage.keep_downloaded_files;
        match self.engine.remove(info_hash, delete_data).await {
            Ok(()) => {}
            Err(EngineError::NotFound { .. }) => {
                tracing::debug!("Session {info_hash} already gone from engine");
            }
            Err(e) => tracing::warn!("Engine remove failed for {name} ({info_hash}): {e}"),
        }

        if !self.config.storage.keep_torrent_files {
            self.delete_metainfo_file(&self.seed_file_path(&name)).await;
            self.delete_metainfo_file(&self.torrent_file_path(&name))
                .await;
        }
    }

    /// Admits a session into the long-lived streaming engine.
    ///
    /// Two requests racing to add the same identifier are expected; the
    /// loser's duplicate error resolves to the existing session. When the
    /// source carries metainfo bytes and auto-seed is enabled, the metainfo
    /// is archived so an interrupted seed survives a restart.
    pub(super) async fn admit(
        &mut self,
        source: TorrentSource,
    ) -> Result<SessionSnapshot, LifecycleError> {
        let info_hash = source.info_hash()?;
        let metainfo_bytes = match &source {
            TorrentSource::TorrentFile(bytes) => Some(bytes.clone()),
            TorrentSource::MagnetUri(_) => None,
        };

        let options = AddOptions::from_config(&self.config);
        let snapshot = match self.engine.add(source, options).await {
            Ok(snapshot) => {
                if let Some(bytes) = metainfo_bytes {
                    self.cache_torrent_file(&snapshot.name, &bytes).await;
                    if self.config.storage.auto_seed {
                        self.archive_seed(&snapshot.name, &bytes).await;
                    }
                }
                snapshot
            }
            Err(EngineError::Duplicate { .. }) => {
                tracing::debug!("Session {info_hash} already admitted");
                self.engine
                    .session(info_hash)
                    .await
                    .ok_or(EngineError::NotFound { info_hash })?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(snapshot)
    }

    /// Re-admits persisted seeds from the seed directory.
    ///
    /// Runs once at startup when auto-seed is enabled. Every re-admitted
    /// seed gets a fresh grace period; any portion that elapsed before the
    /// restart is discarded. Per-file failures are isolated.
    pub(super) async fn reconcile(&mut self) -> ReconcileReport {
        if !self.config.storage.auto_seed {
            tracing::debug!("Auto-seed disabled, skipping seed reconciliation");
            return ReconcileReport::default();
        }

        let (candidates, mut failed) =
            collect_seed_candidates(&self.config.storage.seed_dir).await;
        let mut admitted = 0;

        for candidate in candidates {
            match self.streams.get(&candidate.info_hash) {
                Some(StreamState::Draining { .. }) => {
                    tracing::debug!(
                        "Teardown already pending for {}, skipping re-admission",
                        candidate.info_hash
                    );
                    continue;
                }
                Some(StreamState::Active { .. }) => {
                    tracing::debug!(
                        "Session {} has open streams, skipping re-admission",
                        candidate.info_hash
                    );
                    continue;
                }
                None => {}
            }

            let options = AddOptions::from_config(&self.config);
            match self
                .engine
                .add(TorrentSource::TorrentFile(candidate.bytes), options)
                .await
            {
                Ok(_) | Err(EngineError::Duplicate { .. }) => {
                    admitted += 1;
                    self.arm_teardown(candidate.info_hash, candidate.name);
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not re-admit seed {}: {e}",
                        candidate.path.display()
                    );
                    failed += 1;
                }
            }
        }

        tracing::info!("Seed reconciliation complete: {admitted} re-admitted, {failed} failed");
        ReconcileReport { admitted, failed }
    }

    /// Projects stats for every live session.
    pub(super) async fn stats(&self) -> Vec<TorrentStats> {
        self.engine
            .sessions()
            .await
            .into_iter()
            .map(|snapshot| self.project_stats(snapshot))
            .collect()
    }

    fn project_stats(&self, snapshot: SessionSnapshot) -> TorrentStats {
        let files = snapshot
            .files
            .iter()
            .map(|file| FileStats {
                name: file.name.clone(),
                path: file.path.clone(),
                length: file.length,
                downloaded: file.downloaded,
                progress: file.progress(),
            })
            .collect();
        TorrentStats {
            info_hash: snapshot.info_hash,
            name: snapshot.name,
            total_length: snapshot.total_length,
            progress: snapshot.progress,
            downloaded: snapshot.downloaded,
            uploaded: snapshot.uploaded,
            download_speed: snapshot.download_speed,
            upload_speed: snapshot.upload_speed,
            peer_count: snapshot.peer_count,
            open_streams: self.open_streams(snapshot.info_hash),
            files,
        }
    }

    /// Current open-stream count for an identifier (0 while draining).
    pub(super) fn open_streams(&self, info_hash: InfoHash) -> usize {
        match self.streams.get(&info_hash) {
            Some(StreamState::Active { readers }) => *readers,
            _ => 0,
        }
    }

    pub(super) fn has_pending_teardown(&self, info_hash: InfoHash) -> bool {
        matches!(
            self.streams.get(&info_hash),
            Some(StreamState::Draining { .. })
        )
    }

    /// Archives metainfo into the seed directory, marking the session as one
    /// to re-admit after a restart.
    async fn archive_seed(&self, name: &str, bytes: &[u8]) {
        let seed_dir = &self.config.storage.seed_dir;
        if let Err(e) = tokio::fs::create_dir_all(seed_dir).await {
            tracing::warn!("Could not create seed directory {}: {e}", seed_dir.display());
            return;
        }
        let path = self.seed_file_path(name);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => tracing::debug!("Archived seed metainfo to {}", path.display()),
            Err(e) => tracing::warn!("Could not archive seed metainfo {}: {e}", path.display()),
        }
    }

    /// Caches raw metainfo bytes so later requests can re-admit the session
    /// without refetching the torrent file.
    async fn cache_torrent_file(&self, name: &str, bytes: &[u8]) {
        let torrent_dir = &self.config.storage.torrent_dir;
        if let Err(e) = tokio::fs::create_dir_all(torrent_dir).await {
            tracing::warn!(
                "Could not create torrent cache directory {}: {e}",
                torrent_dir.display()
            );
            return;
        }
        let path = self.torrent_file_path(name);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!("Could not cache torrent file {}: {e}", path.display());
        }
    }

    /// Deletes a persisted metainfo file, swallowing all failures: cleanup
    /// problems must never prevent a session from being considered torn
    /// down.
    async fn delete_metainfo_file(&self, path: &std::path::Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("Deleted metainfo file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not delete metainfo file {}: {e}", path.display()),
        }
    }

    fn seed_file_path(&self, name: &str) -> PathBuf {
        self.config.storage.seed_dir.join(format!("{name}.torrent"))
    }

    fn torrent_file_path(&self, name: &str) -> PathBuf {
        self.config
            .storage
            .torrent_dir
            .join(format!("{name}.torrent"))
    }

    #[cfg(test)]
    fn draining_epoch(&self, info_hash: InfoHash) -> Option<u64> {
        match self.streams.get(&info_hash) {
            Some(StreamState::Draining { epoch, .. }) => Some(*epoch),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;
    use crate::engine::test_mocks::MockSwarmEngine;

    fn test_hash(byte: u8) -> InfoHash {
        InfoHash::new([byte; 20])
    }

    /// Manager with a grace period long enough that no timer fires during a
    /// test; the receiver is returned so timer sends would not error.
    fn quiet_manager() -> (
        LifecycleManager<MockSwarmEngine>,
        mpsc::Receiver<LifecycleCommand>,
    ) {
        let mut config = SwarmcastConfig::for_testing();
        config.lifecycle.seed_grace_period = Duration::from_secs(3600);
        let (tx, rx) = mpsc::channel(64);
        (
            LifecycleManager::new(config, MockSwarmEngine::new(), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn test_second_stream_keeps_session_active() {
        let (mut manager, _rx) = quiet_manager();
        let id = test_hash(1);

        assert_eq!(manager.stream_opened(id, "movie.mkv"), 1);
        assert_eq!(manager.stream_opened(id, "movie.mkv"), 2);
        assert_eq!(manager.stream_closed(id, "movie.mkv"), 1);

        assert_eq!(manager.open_streams(id), 1);
        assert!(!manager.has_pending_teardown(id));
    }

    #[tokio::test]
    async fn test_last_close_arms_teardown_and_reopen_cancels() {
        let (mut manager, _rx) = quiet_manager();
        let id = test_hash(2);

        manager.stream_opened(id, "movie.mkv");
        assert_eq!(manager.stream_closed(id, "movie.mkv"), 0);
        assert!(manager.has_pending_teardown(id));
        assert_eq!(manager.open_streams(id), 0);

        assert_eq!(manager.stream_opened(id, "movie.mkv"), 1);
        assert!(!manager.has_pending_teardown(id));
    }

    #[tokio::test]
    async fn test_repeated_closes_keep_single_timer() {
        let (mut manager, _rx) = quiet_manager();
        let id = test_hash(3);

        manager.stream_opened(id, "movie.mkv");
        manager.stream_closed(id, "movie.mkv");
        let epoch = manager.draining_epoch(id).unwrap();

        // Closes at zero must not re-arm or extend the existing timer.
        manager.stream_closed(id, "movie.mkv");
        manager.stream_closed(id, "movie.mkv");
        assert_eq!(manager.draining_epoch(id), Some(epoch));
    }

    #[tokio::test]
    async fn test_unmatched_close_arms_teardown() {
        let (mut manager, _rx) = quiet_manager();
        let id = test_hash(4);

        assert_eq!(manager.stream_closed(id, "movie.mkv"), 0);
        assert!(manager.has_pending_teardown(id));
    }

    #[tokio::test]
    async fn test_stale_grace_fire_is_ignored() {
        let (mut manager, _rx) = quiet_manager();
        let id = test_hash(5);

        manager.stream_opened(id, "movie.mkv");
        manager.stream_closed(id, "movie.mkv");
        let stale_epoch = manager.draining_epoch(id).unwrap();

        // Stream re-opens, then closes again: a new epoch is armed.
        manager.stream_opened(id, "movie.mkv");
        manager.stream_closed(id, "movie.mkv");
        let fresh_epoch = manager.draining_epoch(id).unwrap();
        assert_ne!(stale_epoch, fresh_epoch);

        // The stale fire must not tear the session down.
        manager.grace_elapsed(id, stale_epoch).await;
        assert_eq!(manager.draining_epoch(id), Some(fresh_epoch));

        manager.grace_elapsed(id, fresh_epoch).await;
        assert!(!manager.has_pending_teardown(id));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Replaying any open/close sequence leaves the count equal to the
        /// step-wise clamped balance, with a timer pending exactly when the
        /// count is zero and a close has happened since the last open.
        #[test]
        fn test_stream_count_replay(ops in proptest::collection::vec((any::<bool>(), 0u8..4), 1..48)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let (mut manager, _rx) = quiet_manager();
                let mut counts: HashMap<u8, usize> = HashMap::new();
                let mut closed_since_open: HashMap<u8, bool> = HashMap::new();

                for (open, key) in ops {
                    let id = test_hash(key);
                    if open {
                        manager.stream_opened(id, "replay");
                        *counts.entry(key).or_default() += 1;
                        closed_since_open.insert(key, false);
                    } else {
                        manager.stream_closed(id, "replay");
                        let count = counts.entry(key).or_default();
                        *count = count.saturating_sub(1);
                        closed_since_open.insert(key, true);
                    }
                }

                for key in 0u8..4 {
                    let id = test_hash(key);
                    let expected = counts.get(&key).copied().unwrap_or(0);
                    prop_assert_eq!(manager.open_streams(id), expected);

                    let expect_timer =
                        expected == 0 && closed_since_open.get(&key).copied().unwrap_or(false);
                    prop_assert_eq!(manager.has_pending_teardown(id), expect_timer);
                }
                Ok(())
            })?;
        }
    }
}
