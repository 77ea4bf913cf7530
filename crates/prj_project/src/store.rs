use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::ProjectConfig;
use crate::error::{ConfigLoadError, ConfigSaveError};

/// Reads and writes project configuration files
pub trait ConfigStore {
    /// Load the configuration at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds no document.
    fn load(&self, path: &Path) -> Result<Option<ProjectConfig>, ConfigLoadError>;

    /// Replace the file at `path` with `config`. Readers never observe a
    /// partially written file.
    fn save(&self, path: &Path, config: &ProjectConfig) -> Result<(), ConfigSaveError>;
}

/// Stores configurations as YAML files
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self, path: &Path) -> Result<Option<ProjectConfig>, ConfigLoadError> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs_err::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        serde_yaml::from_str::<Option<ProjectConfig>>(&contents).map_err(|source| {
            ConfigLoadError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn save(&self, path: &Path, config: &ProjectConfig) -> Result<(), ConfigSaveError> {
        let contents = serde_yaml::to_string(config)?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs_err::create_dir_all(dir)?;

        // Write next to the target so the final rename stays on one file system.
        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(contents.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(path)
            .map_err(|err| ConfigSaveError::Persist {
                path: path.to_path_buf(),
                source: err.error,
            })?;

        tracing::debug!(path = %path.display(), "Saved project configuration");
        Ok(())
    }
}
