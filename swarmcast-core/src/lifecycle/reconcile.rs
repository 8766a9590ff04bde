//! Seed directory scanning for startup reconciliation.
//!
//! The scan is deliberately forgiving: one unreadable or malformed file must
//! never abort the rest of the directory.

use std::path::{Path, PathBuf};

use crate::torrent::{InfoHash, parse_metainfo};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    /// Seeds re-admitted into the streaming engine
    pub admitted: usize,
    /// Files that could not be read, parsed, or re-admitted
    pub failed: usize,
}

/// A persisted seed file that parsed cleanly.
pub(super) struct SeedCandidate {
    pub(super) path: PathBuf,
    pub(super) bytes: Vec<u8>,
    pub(super) info_hash: InfoHash,
    pub(super) name: String,
}

/// Lists every `.torrent` file in the seed directory and decodes each one.
///
/// Returns the parseable candidates plus the number of failures. Identifiers
/// come from the pure hashing path; no engine sessions are created here.
pub(super) async fn collect_seed_candidates(seed_dir: &Path) -> (Vec<SeedCandidate>, usize) {
    let mut candidates = Vec::new();
    let mut failed = 0;

    let mut entries = match tokio::fs::read_dir(seed_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Seed directory {} does not exist", seed_dir.display());
            return (candidates, failed);
        }
        Err(e) => {
            tracing::warn!("Could not read seed directory {}: {e}", seed_dir.display());
            return (candidates, failed);
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Error while scanning {}: {e}", seed_dir.display());
                break;
            }
        };

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("torrent") {
            continue;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not read seed file {}: {e}", path.display());
                failed += 1;
                continue;
            }
        };

        match parse_metainfo(&bytes) {
            Ok(metainfo) => candidates.push(SeedCandidate {
                path,
                bytes,
                info_hash: metainfo.info_hash,
                name: metainfo.name,
            }),
            Err(e) => {
                tracing::warn!("Malformed seed file {}: {e}", path.display());
                failed += 1;
            }
        }
    }

    (candidates, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_FILE: &[u8] = b"d4:infod6:lengthi1000e4:name8:test.txtee";

    #[tokio::test]
    async fn test_missing_directory_yields_empty_scan() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");

        let (candidates, failed) = collect_seed_candidates(&missing).await;
        assert!(candidates.is_empty());
        assert_eq!(failed, 0);
    }

    #[tokio::test]
    async fn test_scan_isolates_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("good.torrent"), SINGLE_FILE)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("bad.torrent"), b"garbage")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"ignored")
            .await
            .unwrap();

        let (candidates, failed) = collect_seed_candidates(dir.path()).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "test.txt");
        assert_eq!(failed, 1);
    }
}
