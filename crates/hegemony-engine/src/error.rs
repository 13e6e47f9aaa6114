//! Error types for the coordinator binary.
//!
//! [`EngineError`] wraps every failure mode during startup and shutdown so
//! `main` can propagate with `?`.

/// Top-level error for the coordinator binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hegemony_core::ConfigError,
    },

    /// Connecting to or migrating a store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: hegemony_db::StoreError,
    },

    /// The coordinator could not be built, started, or stopped.
    #[error("coordinator error: {source}")]
    Coordinator {
        /// The underlying coordinator error.
        #[from]
        source: hegemony_core::CoordinatorError,
    },

    /// The control API failed to start.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: hegemony_hub::ServerError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {message}")]
    Signal {
        /// Description of the failure.
        message: String,
    },
}
