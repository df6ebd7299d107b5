use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HosterError {
    #[error("failed to connect to docker at {socket}: {source}")]
    Connect {
        socket: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("failed to list containers: {0}")]
    Listing(#[source] bollard::errors::Error),

    #[error("failed to inspect container {id}: {source}")]
    Inspection {
        id: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("failed to {action} {}: {source}", .path.display())]
    HostsFile {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("docker events error: {0}")]
    Stream(#[source] bollard::errors::Error),
}

pub type Result<T> = std::result::Result<T, HosterError>;
