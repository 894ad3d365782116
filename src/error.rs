//! Error types for the outer surfaces of the crate.
//!
//! The semaphore and the reader/writer locks never fail: a call either
//! proceeds or blocks until it can. Errors only arise around them, when a
//! workload is configured, started, or one of its participants panics.

use std::io;

use crate::config::ConfigError;
use crate::workload::Role;

/// Errors produced by configuration loading and the workload driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The workload configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A participant thread could not be spawned.
    #[error("failed to spawn {role} {id}: {source}")]
    Spawn {
        /// Role of the participant.
        role: Role,
        /// Participant index within its role.
        id: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A participant thread panicked.
    #[error("{role} {id} panicked")]
    ParticipantPanicked {
        /// Role of the participant.
        role: Role,
        /// Participant index within its role.
        id: usize,
    },
}

/// Result alias for fallible operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
