//! Mock swarm engine for lifecycle tests.
//!
//! In-memory engine double with scripted behavior: configurable add latency
//! to provoke acquisition timeouts, duplicate detection, and a record of
//! every remove call for exactly-once assertions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AddOptions, EngineError, SessionFile, SessionSnapshot, SwarmEngine};
use crate::torrent::{InfoHash, TorrentSource, parse_metainfo};

/// Shared-state mock engine; clones observe the same sessions.
#[derive(Clone, Default)]
pub struct MockSwarmEngine {
    inner: Arc<Mutex<MockState>>,
    add_delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<InfoHash, SessionSnapshot>,
    removed: Vec<InfoHash>,
}

impl MockSwarmEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose metadata never arrives before `delay` has elapsed.
    pub fn with_add_delay(delay: Duration) -> Self {
        Self {
            inner: Arc::default(),
            add_delay: Some(delay),
        }
    }

    /// Identifiers `remove` was called with, in call order.
    pub fn removed(&self) -> Vec<InfoHash> {
        self.inner.lock().removed.clone()
    }

    /// Number of times `remove` was called for one identifier.
    pub fn remove_count(&self, info_hash: InfoHash) -> usize {
        self.inner
            .lock()
            .removed
            .iter()
            .filter(|id| **id == info_hash)
            .count()
    }

    pub fn contains(&self, info_hash: InfoHash) -> bool {
        self.inner.lock().sessions.contains_key(&info_hash)
    }

    /// Seeds a session directly, bypassing metadata resolution.
    pub fn insert_session(&self, snapshot: SessionSnapshot) {
        self.inner
            .lock()
            .sessions
            .insert(snapshot.info_hash, snapshot);
    }

    fn snapshot_for(source: &TorrentSource) -> Result<SessionSnapshot, EngineError> {
        let info_hash = source.info_hash().map_err(|e| EngineError::Metadata {
            reason: e.to_string(),
        })?;

        let (name, total_length, files) = match source {
            TorrentSource::TorrentFile(bytes) => {
                let metainfo = parse_metainfo(bytes).map_err(|e| EngineError::Metadata {
                    reason: e.to_string(),
                })?;
                let files = metainfo
                    .relative_paths()
                    .into_iter()
                    .zip(&metainfo.files)
                    .map(|(path, file)| SessionFile {
                        name: file.path.last().cloned().unwrap_or_else(|| path.clone()),
                        path,
                        length: file.length,
                        downloaded: 0,
                    })
                    .collect();
                (metainfo.name, metainfo.total_length, files)
            }
            TorrentSource::MagnetUri(_) => {
                let name = source
                    .display_name()
                    .unwrap_or_else(|| format!("torrent_{}", hex::encode(&info_hash.as_bytes()[..8])));
                (name, 0, Vec::new())
            }
        };

        Ok(SessionSnapshot {
            info_hash,
            name,
            total_length,
            files,
            progress: 0.0,
            downloaded: 0,
            uploaded: 0,
            download_speed: 0,
            upload_speed: 0,
            peer_count: 0,
        })
    }
}

#[async_trait]
impl SwarmEngine for MockSwarmEngine {
    async fn add(
        &self,
        source: TorrentSource,
        _options: AddOptions,
    ) -> Result<SessionSnapshot, EngineError> {
        if let Some(delay) = self.add_delay {
            tokio::time::sleep(delay).await;
        }

        let snapshot = Self::snapshot_for(&source)?;
        let mut state = self.inner.lock();
        if state.sessions.contains_key(&snapshot.info_hash) {
            return Err(EngineError::Duplicate {
                info_hash: snapshot.info_hash,
            });
        }
        state.sessions.insert(snapshot.info_hash, snapshot.clone());
        Ok(snapshot)
    }

    async fn session(&self, info_hash: InfoHash) -> Option<SessionSnapshot> {
        self.inner.lock().sessions.get(&info_hash).cloned()
    }

    async fn sessions(&self) -> Vec<SessionSnapshot> {
        self.inner.lock().sessions.values().cloned().collect()
    }

    async fn remove(&self, info_hash: InfoHash, _delete_data: bool) -> Result<(), EngineError> {
        let mut state = self.inner.lock();
        state.removed.push(info_hash);
        match state.sessions.remove(&info_hash) {
            Some(_) => Ok(()),
            None => Err(EngineError::NotFound { info_hash }),
        }
    }
}
