//! Centralized configuration for Swarmcast.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Swarmcast components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct SwarmcastConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub lifecycle: LifecycleConfig,
}

/// Directory layout and retention policy.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory downloaded payload is materialized into
    pub download_dir: PathBuf,
    /// Cache directory for fetched torrent files
    pub torrent_dir: PathBuf,
    /// Directory of persisted seed metainfo files
    pub seed_dir: PathBuf,
    /// Re-admit persisted seeds at startup
    pub auto_seed: bool,
    /// Keep downloaded payload when a session is torn down
    pub keep_downloaded_files: bool,
    /// Keep archived metainfo files when a session is torn down
    pub keep_torrent_files: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            torrent_dir: PathBuf::from("torrents"),
            seed_dir: PathBuf::from("seeds"),
            auto_seed: true,
            keep_downloaded_files: false,
            keep_torrent_files: false,
        }
    }
}

/// Per-session limits passed through to the swarm engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent peer connections per session
    pub max_connections: usize,
    /// Aggregate download limit in bytes per second
    pub download_limit: u64,
    /// Aggregate upload limit in bytes per second
    pub upload_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_connections: 50,
            download_limit: 20 * 1024 * 1024, // 20 MiB/s
            upload_limit: 1024 * 1024,        // 1 MiB/s
        }
    }
}

/// Session lifecycle timing.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Delay after the last consumer disconnects before a session's
    /// resources are reclaimed
    pub seed_grace_period: Duration,
    /// Deadline for metadata resolution against an ephemeral engine
    pub metadata_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            seed_grace_period: Duration::from_millis(60_000),
            metadata_timeout: Duration::from_millis(5_000),
        }
    }
}

impl SwarmcastConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Storage configuration overrides
        if let Ok(dir) = std::env::var("SWARMCAST_DOWNLOAD_DIR") {
            config.storage.download_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SWARMCAST_TORRENT_DIR") {
            config.storage.torrent_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SWARMCAST_SEED_DIR") {
            config.storage.seed_dir = PathBuf::from(dir);
        }

        if let Ok(enabled) = std::env::var("SWARMCAST_AUTO_SEED") {
            config.storage.auto_seed = enabled.parse().unwrap_or(config.storage.auto_seed);
        }

        if let Ok(keep) = std::env::var("SWARMCAST_KEEP_FILES") {
            config.storage.keep_downloaded_files = keep.parse().unwrap_or(false);
        }

        if let Ok(keep) = std::env::var("SWARMCAST_KEEP_TORRENTS") {
            config.storage.keep_torrent_files = keep.parse().unwrap_or(false);
        }

        // Engine configuration overrides
        if let Ok(connections) = std::env::var("SWARMCAST_MAX_CONNECTIONS") {
            if let Ok(count) = connections.parse::<usize>() {
                config.engine.max_connections = count;
            }
        }

        if let Ok(limit) = std::env::var("SWARMCAST_DOWNLOAD_LIMIT") {
            if let Ok(bytes) = limit.parse::<u64>() {
                config.engine.download_limit = bytes;
            }
        }

        if let Ok(limit) = std::env::var("SWARMCAST_UPLOAD_LIMIT") {
            if let Ok(bytes) = limit.parse::<u64>() {
                config.engine.upload_limit = bytes;
            }
        }

        // Lifecycle configuration overrides
        if let Ok(grace) = std::env::var("SWARMCAST_SEED_GRACE_MS") {
            if let Ok(millis) = grace.parse::<u64>() {
                config.lifecycle.seed_grace_period = Duration::from_millis(millis);
            }
        }

        if let Ok(timeout) = std::env::var("SWARMCAST_METADATA_TIMEOUT_MS") {
            if let Ok(millis) = timeout.parse::<u64>() {
                config.lifecycle.metadata_timeout = Duration::from_millis(millis);
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Grace period and metadata timeout are short enough for timer-driven
    /// tests to complete quickly.
    pub fn for_testing() -> Self {
        Self {
            lifecycle: LifecycleConfig {
                seed_grace_period: Duration::from_millis(100),
                metadata_timeout: Duration::from_millis(200),
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = SwarmcastConfig::default();

        assert_eq!(config.engine.max_connections, 50);
        assert_eq!(config.engine.download_limit, 20 * 1024 * 1024);
        assert_eq!(config.engine.upload_limit, 1024 * 1024);
        assert_eq!(
            config.lifecycle.seed_grace_period,
            Duration::from_millis(60_000)
        );
        assert_eq!(
            config.lifecycle.metadata_timeout,
            Duration::from_millis(5_000)
        );
        assert!(config.storage.auto_seed);
        assert!(!config.storage.keep_downloaded_files);
        assert!(!config.storage.keep_torrent_files);
    }

    #[test]
    fn test_testing_preset_shortens_timers() {
        let config = SwarmcastConfig::for_testing();
        assert!(config.lifecycle.seed_grace_period < Duration::from_secs(1));
        assert!(config.lifecycle.metadata_timeout < Duration::from_secs(1));
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("SWARMCAST_SEED_DIR", "/var/lib/swarmcast/seeds");
            std::env::set_var("SWARMCAST_MAX_CONNECTIONS", "100");
            std::env::set_var("SWARMCAST_SEED_GRACE_MS", "30000");
            std::env::set_var("SWARMCAST_AUTO_SEED", "false");
        }

        let config = SwarmcastConfig::from_env();

        assert_eq!(
            config.storage.seed_dir,
            PathBuf::from("/var/lib/swarmcast/seeds")
        );
        assert_eq!(config.engine.max_connections, 100);
        assert_eq!(
            config.lifecycle.seed_grace_period,
            Duration::from_millis(30_000)
        );
        assert!(!config.storage.auto_seed);

        // Cleanup
        unsafe {
            std::env::remove_var("SWARMCAST_SEED_DIR");
            std::env::remove_var("SWARMCAST_MAX_CONNECTIONS");
            std::env::remove_var("SWARMCAST_SEED_GRACE_MS");
            std::env::remove_var("SWARMCAST_AUTO_SEED");
        }
    }
}
