use std::path::PathBuf;

use command_dispatcher::CommandError;
use thiserror::Error;

/// Failure to read a configuration file
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("error while reading from '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure to write a configuration file
#[derive(Debug, Error)]
pub enum ConfigSaveError {
    #[error("failed to serialize the project configuration")]
    Serialize(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to replace '{}'", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors of [`ProjectSyncHandler`](crate::ProjectSyncHandler) operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configuration file exists but could not be read. The in-memory
    /// model was left untouched.
    #[error("found serialization errors when reading from '{}'", path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: ConfigLoadError,
    },

    #[error("failed to save the project configuration")]
    Save(#[from] ConfigSaveError),

    #[error(transparent)]
    Command(#[from] CommandError),
}
