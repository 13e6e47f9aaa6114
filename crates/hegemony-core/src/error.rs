//! Error types for the `hegemony-core` crate.

use hegemony_factions::ProfileError;
use hegemony_world::WorldError;

use crate::config::ConfigError;

/// Errors raised while building or running the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Configuration could not be loaded or is out of range.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The campaign seed or the map rejected an operation.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A faction profile is invalid or unknown.
    #[error("profile error: {source}")]
    Profile {
        /// The underlying profile error.
        #[from]
        source: ProfileError,
    },

    /// No shard with this index exists.
    #[error("no shard {0}")]
    UnknownShard(usize),

    /// The coordinator's loops were already started.
    #[error("coordinator already running")]
    AlreadyRunning,

    /// A background task panicked or was cancelled.
    #[error("background task {task} failed: {reason}")]
    Task {
        /// Which task.
        task: &'static str,
        /// Join error text.
        reason: String,
    },
}
