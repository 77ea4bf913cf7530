use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// The persisted configuration of a project.
///
/// Only `assets_folder` and `plugins_folder` take part in change detection.
/// The remaining fields are carried along so saving never drops them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectConfig {
    /// Packages linked into the project's assets
    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub assets_folder: Vec<String>,

    /// Packages linked into the project's plugins folder
    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub plugins_folder: Vec<String>,

    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub solution_projects: Vec<String>,

    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub prebuilt: Vec<String>,

    /// Folder name to pattern pairs, in file order
    #[serde(default, with = "single_entry_maps", skip_serializing_if = "Vec::is_empty")]
    pub solution_folders: Vec<(String, String)>,
}

impl ProjectConfig {
    /// True if both package lists are empty
    pub fn has_no_packages(&self) -> bool {
        self.assets_folder.is_empty() && self.plugins_folder.is_empty()
    }

    /// Compare the package lists, ignoring their order
    pub fn same_packages(&self, other: &ProjectConfig) -> bool {
        same_items(&self.assets_folder, &other.assets_folder)
            && same_items(&self.plugins_folder, &other.plugins_folder)
    }
}

fn same_items(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stores `(key, value)` pairs as a list of single-entry maps.
mod single_entry_maps {
    use super::*;

    pub fn serialize<S: Serializer>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
        let maps: Vec<IndexMap<&str, &str>> = pairs
            .iter()
            .map(|(key, value)| IndexMap::from([(key.as_str(), value.as_str())]))
            .collect();
        maps.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let maps = Option::<Vec<IndexMap<String, String>>>::deserialize(deserializer)?;
        maps.unwrap_or_default()
            .into_iter()
            .map(|map| {
                if map.len() != 1 {
                    return Err(de::Error::invalid_length(map.len(), &"a map with exactly one entry"));
                }
                map.into_iter()
                    .next()
                    .ok_or_else(|| de::Error::invalid_length(0, &"a map with exactly one entry"))
            })
            .collect()
    }
}

/// Which configuration file a handler works on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConfigScope {
    /// The shared file of this project
    #[default]
    LocalProject,
    /// The per-user file of this project
    LocalProjectUser,
    /// The shared file of every project in the parent directory
    AllProjects,
    /// The per-user file of every project in the parent directory
    AllProjectsUser,
}

impl ConfigScope {
    pub fn is_user(self) -> bool {
        matches!(self, ConfigScope::LocalProjectUser | ConfigScope::AllProjectsUser)
    }
}

/// Locates the configuration files of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Directory of the project
    pub project_root: PathBuf,
    /// File name of the shared configuration
    pub config_file_name: String,
    /// File name of the per-user configuration
    pub user_config_file_name: String,
}

impl ProjectSettings {
    pub const DEFAULT_CONFIG_FILE_NAME: &'static str = "PrjProject.yaml";
    pub const DEFAULT_USER_CONFIG_FILE_NAME: &'static str = "PrjProjectCustom.yaml";

    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            config_file_name: Self::DEFAULT_CONFIG_FILE_NAME.to_string(),
            user_config_file_name: Self::DEFAULT_USER_CONFIG_FILE_NAME.to_string(),
        }
    }

    pub fn with_config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config_file_name = name.into();
        self
    }

    pub fn with_user_config_file_name(mut self, name: impl Into<String>) -> Self {
        self.user_config_file_name = name.into();
        self
    }

    /// Path of the configuration file for `scope`
    pub fn config_path(&self, scope: ConfigScope) -> PathBuf {
        let dir: &Path = match scope {
            ConfigScope::LocalProject | ConfigScope::LocalProjectUser => &self.project_root,
            ConfigScope::AllProjects | ConfigScope::AllProjectsUser => self
                .project_root
                .parent()
                .unwrap_or(self.project_root.as_path()),
        };
        let file_name = if scope.is_user() {
            &self.user_config_file_name
        } else {
            &self.config_file_name
        };
        dir.join(file_name)
    }
}
