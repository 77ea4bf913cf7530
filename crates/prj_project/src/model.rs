use crate::config::ProjectConfig;

/// The package lists a user edits, plus the project settings that are
/// saved with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectModel {
    asset_items: Vec<String>,
    plugin_items: Vec<String>,
    solution_projects: Vec<String>,
    prebuilt: Vec<String>,
    solution_folders: Vec<(String, String)>,
}

impl ProjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_items(&self) -> &[String] {
        &self.asset_items
    }

    pub fn plugin_items(&self) -> &[String] {
        &self.plugin_items
    }

    pub fn add_asset_item(&mut self, name: impl Into<String>) {
        self.asset_items.push(name.into());
    }

    pub fn add_plugin_item(&mut self, name: impl Into<String>) {
        self.plugin_items.push(name.into());
    }

    /// Remove `name` from both lists. Returns true if it was present.
    pub fn remove_item(&mut self, name: &str) -> bool {
        let before = self.asset_items.len() + self.plugin_items.len();
        self.asset_items.retain(|item| item != name);
        self.plugin_items.retain(|item| item != name);
        before != self.asset_items.len() + self.plugin_items.len()
    }

    pub fn clear_asset_items(&mut self) {
        self.asset_items.clear();
    }

    pub fn clear_plugin_items(&mut self) {
        self.plugin_items.clear();
    }

    /// Empty every list
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.asset_items.is_empty() && self.plugin_items.is_empty()
    }

    /// Project the model onto a configuration value
    pub fn to_config(&self) -> ProjectConfig {
        ProjectConfig {
            assets_folder: self.asset_items.clone(),
            plugins_folder: self.plugin_items.clone(),
            solution_projects: self.solution_projects.clone(),
            prebuilt: self.prebuilt.clone(),
            solution_folders: self.solution_folders.clone(),
        }
    }

    /// Replace every list with the ones from `config`, keeping their order
    pub fn populate(&mut self, config: ProjectConfig) {
        self.asset_items = config.assets_folder;
        self.plugin_items = config.plugins_folder;
        self.solution_projects = config.solution_projects;
        self.prebuilt = config.prebuilt;
        self.solution_folders = config.solution_folders;
    }
}
