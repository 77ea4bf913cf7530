//! Synchronizes the in-memory package lists of a project with the YAML
//! configuration file they are persisted in.

mod config;
mod error;
mod handler;
mod model;
mod store;

pub use config::{ConfigScope, ProjectConfig, ProjectSettings};
pub use error::{ConfigLoadError, ConfigSaveError, SyncError};
pub use handler::{PendingChanges, ProjectSyncHandler};
pub use model::ProjectModel;
pub use store::{ConfigStore, YamlConfigStore};
