//! Metadata acquisition with a bounded timeout race.
//!
//! Resolution runs against a dedicated ephemeral engine built per request,
//! so metadata-only fetches never count against the streaming engine's
//! connection limits.

use std::time::Duration;

use super::LifecycleError;
use crate::config::SwarmcastConfig;
use crate::engine::{AddOptions, EngineError, SessionSnapshot, SwarmEngine};
use crate::torrent::{InfoHash, TorrentSource};

/// Metadata resolved for a swarm source.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TorrentSummary {
    pub info_hash: InfoHash,
    pub name: String,
    pub total_length: u64,
    /// Flat file listing with relative paths as served to consumers
    pub files: Vec<SummaryFile>,
}

/// One file entry within a [`TorrentSummary`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct SummaryFile {
    pub path: String,
    pub length: u64,
}

/// Resolves swarm metadata within a fixed deadline.
///
/// Each `resolve` call builds a fresh engine from the injected factory,
/// races the engine's metadata callback against the timeout, and destroys
/// the ephemeral session whichever side wins. Exactly one of
/// {summary, no metadata} is produced per call.
pub struct MetadataAcquirer<E, F>
where
    E: SwarmEngine,
    F: Fn() -> E + Send + Sync,
{
    make_engine: F,
    options: AddOptions,
    timeout: Duration,
}

impl<E, F> MetadataAcquirer<E, F>
where
    E: SwarmEngine,
    F: Fn() -> E + Send + Sync,
{
    pub fn new(make_engine: F, options: AddOptions, timeout: Duration) -> Self {
        Self {
            make_engine,
            options,
            timeout,
        }
    }

    /// Builds an acquirer from the configured options and timeout.
    pub fn from_config(make_engine: F, config: &SwarmcastConfig) -> Self {
        Self::new(
            make_engine,
            AddOptions::from_config(config),
            config.lifecycle.metadata_timeout,
        )
    }

    /// Resolves the file listing, total size, and identifier for a source.
    ///
    /// `Ok(None)` means the deadline passed without metadata: the source was
    /// unreachable or had no peers in the window. That is a valid outcome,
    /// not an error.
    ///
    /// # Errors
    /// - `LifecycleError::Torrent` - The source itself could not be decoded
    /// - `LifecycleError::Engine` - The ephemeral engine rejected the add
    pub async fn resolve(
        &self,
        source: TorrentSource,
    ) -> Result<Option<TorrentSummary>, LifecycleError> {
        let info_hash = source.info_hash()?;
        let engine = (self.make_engine)();

        let outcome =
            tokio::time::timeout(self.timeout, engine.add(source, self.options.clone())).await;

        let summary = match outcome {
            Ok(Ok(snapshot)) => Some(summarize(snapshot)),
            Ok(Err(e)) => {
                destroy_ephemeral(&engine, info_hash).await;
                return Err(e.into());
            }
            Err(_elapsed) => {
                tracing::debug!("Metadata acquisition timed out for {info_hash}");
                None
            }
        };

        // Both race outcomes converge here; the destroy is idempotent, so a
        // session the cancelled add never created is simply not found.
        destroy_ephemeral(&engine, info_hash).await;
        Ok(summary)
    }
}

async fn destroy_ephemeral<E: SwarmEngine>(engine: &E, info_hash: InfoHash) {
    match engine.remove(info_hash, true).await {
        Ok(()) => {}
        Err(EngineError::NotFound { .. }) => {}
        Err(e) => tracing::debug!("Ephemeral session cleanup failed for {info_hash}: {e}"),
    }
}

fn summarize(snapshot: SessionSnapshot) -> TorrentSummary {
    TorrentSummary {
        info_hash: snapshot.info_hash,
        name: snapshot.name,
        total_length: snapshot.total_length,
        files: snapshot
            .files
            .into_iter()
            .map(|file| SummaryFile {
                path: file.path,
                length: file.length,
            })
            .collect(),
    }
}
