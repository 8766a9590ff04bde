//! Torrent metainfo and magnet link decoding.
//!
//! Metadata extraction using serde_bencode and magnet-url. The content
//! identifier is computed as the SHA-1 digest of the canonically re-encoded
//! info dictionary, so decoding and re-encoding the same metainfo always
//! reproduces the same identifier.

use std::collections::HashMap;

use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

use super::{InfoHash, TorrentError};

type Dict = HashMap<Vec<u8>, Value>;

/// Metadata decoded from a torrent file.
///
/// Only the fields this crate acts on are retained: identity, display name,
/// total payload size, and the file layout. Piece hashes and tracker tiers
/// stay with the swarm engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Metainfo {
    pub info_hash: InfoHash,
    pub name: String,
    pub total_length: u64,
    pub files: Vec<MetainfoFile>,
}

/// Individual file within a torrent, as raw path components.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetainfoFile {
    pub path: Vec<String>,
    pub length: u64,
}

impl Metainfo {
    /// Per-file paths relative to the download root, as served to consumers.
    ///
    /// Single-file torrents expose the display name itself; multi-file
    /// torrents expose `<name>/<component>/...` for each entry.
    pub fn relative_paths(&self) -> Vec<String> {
        if self.files.len() == 1 && self.files[0].path == [self.name.as_str()] {
            return vec![self.name.clone()];
        }
        self.files
            .iter()
            .map(|file| {
                let mut parts = Vec::with_capacity(file.path.len() + 1);
                parts.push(self.name.as_str());
                parts.extend(file.path.iter().map(String::as_str));
                parts.join("/")
            })
            .collect()
    }
}

/// Magnet link components.
///
/// Minimal metadata carried by a magnet URI: the content identifier plus an
/// optional display name and tracker URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct MagnetLink {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
}

/// Source a torrent session can be admitted from.
#[derive(Debug, Clone, PartialEq)]
pub enum TorrentSource {
    /// A magnet URI naming the content by identifier.
    MagnetUri(String),
    /// Raw bencoded torrent-file bytes.
    TorrentFile(Vec<u8>),
}

impl TorrentSource {
    /// Computes the content identifier without engine involvement.
    ///
    /// # Errors
    /// - `TorrentError::InvalidMagnetLink` - Malformed magnet URI
    /// - `TorrentError::InvalidMetainfo` - Malformed torrent-file bytes
    pub fn info_hash(&self) -> Result<InfoHash, TorrentError> {
        match self {
            TorrentSource::MagnetUri(uri) => Ok(parse_magnet_link(uri)?.info_hash),
            TorrentSource::TorrentFile(bytes) => info_hash_from_bytes(bytes),
        }
    }

    /// Human-facing name carried by the source, if any.
    pub fn display_name(&self) -> Option<String> {
        match self {
            TorrentSource::MagnetUri(uri) => parse_magnet_link(uri).ok()?.display_name,
            TorrentSource::TorrentFile(bytes) => Some(parse_metainfo(bytes).ok()?.name),
        }
    }
}

/// Decodes complete metainfo from raw bencoded torrent-file bytes.
///
/// # Errors
/// - `TorrentError::InvalidMetainfo` - Malformed bencode or missing fields
pub fn parse_metainfo(bytes: &[u8]) -> Result<Metainfo, TorrentError> {
    let root = decode_root(bytes)?;
    let info_value = root
        .get(b"info".as_slice())
        .ok_or_else(|| invalid("missing 'info' dictionary"))?;
    let info_hash = hash_info_dict(info_value)?;

    let Value::Dict(info) = info_value else {
        return Err(invalid("'info' field must be a dictionary"));
    };

    let name = string_field(info, b"name")?;
    let (files, total_length) = if let Some(Value::Int(length)) = info.get(b"length".as_slice()) {
        let length = non_negative(*length, "length")?;
        let files = vec![MetainfoFile {
            path: vec![name.clone()],
            length,
        }];
        (files, length)
    } else if let Some(Value::List(entries)) = info.get(b"files".as_slice()) {
        parse_file_entries(entries)?
    } else {
        return Err(invalid("missing 'length' or 'files' field"));
    };

    Ok(Metainfo {
        info_hash,
        name,
        total_length,
        files,
    })
}

/// Computes the content identifier directly from raw torrent-file bytes.
///
/// Pure function with no engine involvement: decodes the bencoded structure
/// and hashes the canonical re-encoding of its info dictionary. Used by the
/// seed reconciler, which must not spin up sessions to learn identifiers.
///
/// # Errors
/// - `TorrentError::InvalidMetainfo` - Malformed bencode or missing info dict
pub fn info_hash_from_bytes(bytes: &[u8]) -> Result<InfoHash, TorrentError> {
    let root = decode_root(bytes)?;
    let info_value = root
        .get(b"info".as_slice())
        .ok_or_else(|| invalid("missing 'info' dictionary"))?;
    hash_info_dict(info_value)
}

/// Parses a magnet URI into its components.
///
/// # Errors
/// - `TorrentError::InvalidMagnetLink` - Malformed URI or missing btih hash
pub fn parse_magnet_link(uri: &str) -> Result<MagnetLink, TorrentError> {
    let magnet = magnet_url::Magnet::new(uri).map_err(|e| TorrentError::InvalidMagnetLink {
        reason: format!("{e}"),
    })?;

    let info_hash = extract_magnet_info_hash(&magnet.to_string())?;

    Ok(MagnetLink {
        info_hash,
        display_name: magnet.display_name().map(|s| s.to_string()),
        trackers: magnet.trackers().to_vec(),
    })
}

fn extract_magnet_info_hash(uri: &str) -> Result<InfoHash, TorrentError> {
    for param in uri.split(['?', '&']) {
        if let Some(hash) = param.strip_prefix("xt=urn:btih:") {
            return hash
                .parse::<InfoHash>()
                .map_err(|e| TorrentError::InvalidMagnetLink {
                    reason: e.to_string(),
                });
        }
    }
    Err(TorrentError::InvalidMagnetLink {
        reason: "missing xt=urn:btih parameter".to_string(),
    })
}

fn decode_root(bytes: &[u8]) -> Result<Dict, TorrentError> {
    let root: Value = serde_bencode::from_bytes(bytes).map_err(|e| TorrentError::InvalidMetainfo {
        reason: format!("bencode decoding failed: {e}"),
    })?;
    match root {
        Value::Dict(dict) => Ok(dict),
        _ => Err(invalid("root element must be a dictionary")),
    }
}

fn hash_info_dict(info: &Value) -> Result<InfoHash, TorrentError> {
    let encoded = serde_bencode::to_bytes(info).map_err(|e| TorrentError::InvalidMetainfo {
        reason: format!("re-encoding info dictionary failed: {e}"),
    })?;

    let mut hasher = Sha1::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest);
    Ok(InfoHash::new(hash))
}

fn parse_file_entries(entries: &[Value]) -> Result<(Vec<MetainfoFile>, u64), TorrentError> {
    let mut files = Vec::with_capacity(entries.len());
    let mut total_length = 0u64;

    for entry in entries {
        let Value::Dict(file) = entry else {
            return Err(invalid("file entry must be a dictionary"));
        };

        let length = match file.get(b"length".as_slice()) {
            Some(Value::Int(length)) => non_negative(*length, "file length")?,
            _ => return Err(invalid("missing 'length' in file entry")),
        };
        total_length += length;

        let Some(Value::List(components)) = file.get(b"path".as_slice()) else {
            return Err(invalid("missing 'path' in file entry"));
        };
        let mut path = Vec::with_capacity(components.len());
        for component in components {
            let Value::Bytes(component) = component else {
                return Err(invalid("path component must be a string"));
            };
            path.push(
                String::from_utf8(component.clone())
                    .map_err(|_| invalid("path component is not valid UTF-8"))?,
            );
        }

        files.push(MetainfoFile { path, length });
    }

    Ok((files, total_length))
}

fn string_field(dict: &Dict, key: &[u8]) -> Result<String, TorrentError> {
    match dict.get(key) {
        Some(Value::Bytes(bytes)) => String::from_utf8(bytes.clone()).map_err(|_| {
            invalid(&format!(
                "field '{}' is not valid UTF-8",
                String::from_utf8_lossy(key)
            ))
        }),
        _ => Err(invalid(&format!(
            "missing or invalid field '{}'",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn non_negative(value: i64, field: &str) -> Result<u64, TorrentError> {
    u64::try_from(value).map_err(|_| invalid(&format!("negative '{field}' value")))
}

fn invalid(reason: &str) -> TorrentError {
    TorrentError::InvalidMetainfo {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_FILE: &[u8] = b"d4:infod6:lengthi1000e4:name8:test.txtee";
    const MULTI_FILE: &[u8] = b"d4:infod5:filesld6:lengthi500e4:pathl5:a.txteed6:lengthi300e4:pathl5:b.txteee4:name5:mydiree";

    #[test]
    fn test_single_file_metainfo() {
        let metainfo = parse_metainfo(SINGLE_FILE).unwrap();
        assert_eq!(metainfo.name, "test.txt");
        assert_eq!(metainfo.total_length, 1000);
        assert_eq!(metainfo.files.len(), 1);
        assert_eq!(metainfo.relative_paths(), vec!["test.txt"]);
    }

    #[test]
    fn test_multi_file_metainfo() {
        let metainfo = parse_metainfo(MULTI_FILE).unwrap();
        assert_eq!(metainfo.name, "mydir");
        assert_eq!(metainfo.total_length, 800);
        assert_eq!(metainfo.files.len(), 2);
        assert_eq!(metainfo.relative_paths(), vec!["mydir/a.txt", "mydir/b.txt"]);
    }

    #[test]
    fn test_info_hash_is_deterministic() {
        let first = info_hash_from_bytes(SINGLE_FILE).unwrap();
        let second = info_hash_from_bytes(SINGLE_FILE).unwrap();
        assert_eq!(first, second);

        let other = info_hash_from_bytes(MULTI_FILE).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_info_hash_stable_across_re_encoding() {
        let original = info_hash_from_bytes(SINGLE_FILE).unwrap();

        let decoded: Value = serde_bencode::from_bytes(SINGLE_FILE).unwrap();
        let re_encoded = serde_bencode::to_bytes(&decoded).unwrap();
        let after_round_trip = info_hash_from_bytes(&re_encoded).unwrap();

        assert_eq!(original, after_round_trip);
    }

    #[test]
    fn test_info_hash_matches_parse() {
        let metainfo = parse_metainfo(MULTI_FILE).unwrap();
        assert_eq!(metainfo.info_hash, info_hash_from_bytes(MULTI_FILE).unwrap());
    }

    #[test]
    fn test_missing_info_dictionary() {
        let result = parse_metainfo(b"d4:name4:teste");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("info"));
    }

    #[test]
    fn test_malformed_bencode() {
        assert!(parse_metainfo(b"not bencode at all").is_err());
        assert!(info_hash_from_bytes(b"l4:teste").is_err());
    }

    #[test]
    fn test_magnet_link_parsing() {
        let uri = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=Test&tr=http://tracker.example.com/announce";
        let magnet = parse_magnet_link(uri).unwrap();

        assert_eq!(
            magnet.info_hash.to_string(),
            "0123456789abcdef0123456789abcdef01234567"
        );
        assert_eq!(magnet.display_name, Some("Test".to_string()));
        assert_eq!(magnet.trackers, vec!["http://tracker.example.com/announce"]);
    }

    #[test]
    fn test_magnet_link_without_info_hash() {
        let result = parse_magnet_link("magnet:?dn=Test");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_magnet_link() {
        assert!(parse_magnet_link("http://not-a-magnet").is_err());
    }

    #[test]
    fn test_torrent_source_info_hash() {
        let from_bytes = TorrentSource::TorrentFile(SINGLE_FILE.to_vec());
        assert_eq!(
            from_bytes.info_hash().unwrap(),
            info_hash_from_bytes(SINGLE_FILE).unwrap()
        );
        assert_eq!(from_bytes.display_name(), Some("test.txt".to_string()));

        let uri = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=Test";
        let from_magnet = TorrentSource::MagnetUri(uri.to_string());
        assert_eq!(
            from_magnet.info_hash().unwrap().to_string(),
            "0123456789abcdef0123456789abcdef01234567"
        );
        assert_eq!(from_magnet.display_name(), Some("Test".to_string()));
    }
}
