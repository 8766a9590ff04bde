//! Torrent identity and metadata types shared across the crate.

pub mod metainfo;

use std::fmt;
use std::str::FromStr;

pub use metainfo::{
    MagnetLink, Metainfo, MetainfoFile, TorrentSource, info_hash_from_bytes, parse_magnet_link,
    parse_metainfo,
};

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte SHA-1 digest of the bencoded info dictionary. Two torrents with
/// identical content produce identical hashes, independent of where the
/// metadata was fetched from. Primary key for every session map in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates InfoHash from a 20-byte SHA-1 digest.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Returns reference to the underlying 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for InfoHash {
    type Err = TorrentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(TorrentError::InvalidInfoHash {
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        let decoded = hex::decode(s).map_err(|e| TorrentError::InvalidInfoHash {
            reason: e.to_string(),
        })?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded);
        Ok(Self(hash))
    }
}

impl serde::Serialize for InfoHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Errors that can occur while decoding torrent metadata.
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    #[error("Failed to parse torrent metainfo: {reason}")]
    InvalidMetainfo { reason: String },

    #[error("Invalid magnet link: {reason}")]
    InvalidMagnetLink { reason: String },

    #[error("Invalid info hash: {reason}")]
    InvalidInfoHash { reason: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hash_display() {
        let hash = [
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab,
            0xcd, 0xef, 0x01, 0x23, 0x45, 0x67,
        ];
        let info_hash = InfoHash::new(hash);
        assert_eq!(
            info_hash.to_string(),
            "0123456789abcdef0123456789abcdef01234567"
        );
    }

    #[test]
    fn test_info_hash_from_str_round_trip() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let info_hash: InfoHash = hex.parse().unwrap();
        assert_eq!(info_hash.to_string(), hex);
    }

    #[test]
    fn test_info_hash_from_str_rejects_bad_input() {
        assert!("tooshort".parse::<InfoHash>().is_err());
        assert!(
            "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"
                .parse::<InfoHash>()
                .is_err()
        );
    }

    #[test]
    fn test_info_hash_serializes_as_hex() {
        let info_hash = InfoHash::new([0xab; 20]);
        let json = serde_json::to_string(&info_hash).unwrap();
        assert_eq!(json, format!("\"{info_hash}\""));
    }
}
