//! Error types shared by the engine, its workers and the feed driver.
//!
//! The `BoardError` enum unifies the few failure cases the pipeline can hit:
//! I/O and JSON when loading configuration or snapshots, invalid configuration,
//! worker threads that cannot be spawned, and channel communication. Per-field
//! number parsing never produces a `BoardError`; unparsable values simply
//! classify as neutral.
use std::io;

use thiserror::Error;

/// Failures surfaced by the board engine and the feed driver.
#[derive(Error, Debug)]
pub enum BoardError {
    /// Reading a config or snapshot file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A config or snapshot file is not valid JSON for its type.
    #[error("Malformed JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Engine configuration rejected by validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bounded cache was requested with limits it cannot honor.
    #[error("Cache configuration error: {0}")]
    CacheConfig(String),

    /// A background worker thread could not be started.
    #[error("Worker '{name}' failed to start: {source}")]
    WorkerSpawn {
        /// Thread name of the worker.
        name: &'static str,
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },

    /// A worker mailbox was closed when a command was posted; names the command.
    #[error("Worker mailbox closed: {0}")]
    ChannelSend(String),

    /// Ctrl-C handling for the feed could not be installed.
    #[error("Signal handler error: {0}")]
    Signal(String),
}
