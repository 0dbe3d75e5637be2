use std::time::Duration;
use thiserror::Error;

use crate::subprocess::ProcessError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to launch {role}: {source}")]
    Launch {
        role: String,
        #[source]
        source: ProcessError,
    },

    #[error("{role} did not become ready within {timeout:?}")]
    NotReady { role: String, timeout: Duration },

    #[error("Rendezvous discovery failed: {0}")]
    RendezvousDiscovery(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
