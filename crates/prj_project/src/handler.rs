use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use command_dispatcher::{CommandEvent, CommandOrchestrator};
use futures::Stream;
use tracing::{debug, error, info};

use crate::config::{ConfigScope, ProjectConfig, ProjectSettings};
use crate::error::SyncError;
use crate::model::ProjectModel;
use crate::store::{ConfigStore, YamlConfigStore};

/// What to do with unsaved edits when switching to another configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingChanges {
    Save,
    Discard,
}

/// Keeps a [`ProjectModel`] in sync with the configuration file of the
/// active [`ConfigScope`].
///
/// The handler never merges. It either overwrites the file with the model or
/// replaces the model with the file.
pub struct ProjectSyncHandler<S = YamlConfigStore> {
    model: Rc<RefCell<ProjectModel>>,
    store: S,
    settings: ProjectSettings,
    scope: Cell<ConfigScope>,
}

impl ProjectSyncHandler<YamlConfigStore> {
    pub fn new(model: Rc<RefCell<ProjectModel>>, settings: ProjectSettings) -> Self {
        Self::with_store(model, YamlConfigStore, settings)
    }
}

impl<S: ConfigStore> ProjectSyncHandler<S> {
    pub fn with_store(model: Rc<RefCell<ProjectModel>>, store: S, settings: ProjectSettings) -> Self {
        Self {
            model,
            store,
            settings,
            scope: Cell::new(ConfigScope::default()),
        }
    }

    pub fn model(&self) -> &Rc<RefCell<ProjectModel>> {
        &self.model
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope.get()
    }

    /// Path of the configuration file of the active scope
    pub fn config_path(&self) -> PathBuf {
        self.settings.config_path(self.scope.get())
    }

    pub fn build_config_from_model(&self) -> ProjectConfig {
        self.model.borrow().to_config()
    }

    /// True if the package lists on disk differ from the model, ignoring
    /// order.
    ///
    /// A missing file differs iff the model has packages. A file that cannot
    /// be read counts as changed so the user can still overwrite it.
    pub fn has_config_changed(&self) -> bool {
        let current = self.build_config_from_model();
        let path = self.config_path();

        match self.store.load(&path) {
            Ok(None) => !current.has_no_packages(),
            Ok(Some(saved)) => !current.same_packages(&saved),
            Err(err) => {
                error!(path = %path.display(), error = %err, "Failed to read project configuration, assuming it changed");
                true
            }
        }
    }

    /// Replace the model with the configuration on disk.
    ///
    /// A missing or empty file clears the model. A file that cannot be read
    /// is an error and leaves the model untouched.
    pub fn reconcile_from_disk(&self) -> Result<(), SyncError> {
        let path = self.config_path();
        let loaded = self
            .store
            .load(&path)
            .map_err(|source| SyncError::Deserialization {
                path: path.clone(),
                source,
            })?;

        let mut model = self.model.borrow_mut();
        match loaded {
            Some(config) => {
                debug!(
                    path = %path.display(),
                    assets = config.assets_folder.len(),
                    plugins = config.plugins_folder.len(),
                    "Loaded project configuration"
                );
                model.populate(config);
            }
            None => {
                debug!(path = %path.display(), "No project configuration, clearing model");
                model.reset();
            }
        }
        Ok(())
    }

    /// Overwrite the configuration file with the model
    pub fn persist(&self) -> Result<(), SyncError> {
        let path = self.config_path();
        self.store.save(&path, &self.build_config_from_model())?;
        info!(path = %path.display(), "Saved project configuration");
        Ok(())
    }

    /// Make `scope` the active one and load its file.
    ///
    /// Unsaved edits to the current file are written first when `pending`
    /// is [`PendingChanges::Save`].
    pub fn switch_scope(&self, scope: ConfigScope, pending: PendingChanges) -> Result<(), SyncError> {
        if pending == PendingChanges::Save && self.has_config_changed() {
            self.persist()?;
        }

        self.scope.set(scope);
        self.reconcile_from_disk()
    }

    /// Save the model, then run the command created by `factory` through
    /// `orchestrator` so it picks up the saved file.
    pub async fn apply_changes<F, C, T>(
        &self,
        orchestrator: &CommandOrchestrator,
        label: impl Into<String>,
        factory: F,
    ) -> Result<T, SyncError>
    where
        F: FnOnce() -> C + 'static,
        C: Stream<Item = CommandEvent<T>> + 'static,
        T: 'static,
    {
        self.persist()?;
        Ok(orchestrator.run(label, factory).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use command_dispatcher::CommandError;
    use corun::{Scheduler, TaskError, TaskOptions};

    fn handler_in(dir: &Path) -> ProjectSyncHandler {
        let model = Rc::new(RefCell::new(ProjectModel::new()));
        ProjectSyncHandler::new(model, ProjectSettings::new(dir.join("game")))
    }

    fn write_config(handler: &ProjectSyncHandler, contents: &str) {
        let path = handler.config_path();
        fs_err::create_dir_all(path.parent().unwrap()).unwrap();
        fs_err::write(path, contents).unwrap();
    }

    #[test]
    fn test_build_config_from_model() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        handler.model().borrow_mut().add_asset_item("numpy");
        handler.model().borrow_mut().add_plugin_item("zenject");

        let config = handler.build_config_from_model();
        assert_eq!(config.assets_folder, vec!["numpy".to_string()]);
        assert_eq!(config.plugins_folder, vec!["zenject".to_string()]);
    }

    #[test]
    fn test_missing_file_changed_iff_model_has_packages() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        assert!(!handler.has_config_changed());

        handler.model().borrow_mut().add_asset_item("numpy");
        assert!(handler.has_config_changed());
    }

    #[test]
    fn test_comparison_ignores_order() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        write_config(&handler, "AssetsFolder:\n- A\n- B\n");

        handler.model().borrow_mut().add_asset_item("B");
        handler.model().borrow_mut().add_asset_item("A");
        assert!(!handler.has_config_changed());

        handler.model().borrow_mut().add_plugin_item("C");
        assert!(handler.has_config_changed());
    }

    #[test]
    fn test_invalid_file_fails_open_for_change_detection() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        write_config(&handler, "AssetsFolder: [unclosed\n");

        assert!(handler.has_config_changed());
    }

    #[test]
    fn test_invalid_file_fails_closed_for_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        handler.model().borrow_mut().add_asset_item("keep-me");
        write_config(&handler, "AssetsFolder: [unclosed\n");

        let err = handler.reconcile_from_disk().unwrap_err();
        assert!(matches!(err, SyncError::Deserialization { .. }));
        assert_eq!(handler.model().borrow().asset_items(), ["keep-me".to_string()]);
    }

    #[test]
    fn test_reconcile_clears_model_when_file_is_missing_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        handler.model().borrow_mut().add_asset_item("numpy");

        handler.reconcile_from_disk().unwrap();
        assert!(handler.model().borrow().is_empty());

        handler.model().borrow_mut().add_plugin_item("zenject");
        write_config(&handler, "");
        handler.reconcile_from_disk().unwrap();
        assert!(handler.model().borrow().is_empty());
    }

    #[test]
    fn test_reconcile_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        write_config(&handler, "AssetsFolder: [c, a, b]\nPluginsFolder: [z]\n");

        handler.reconcile_from_disk().unwrap();
        let model = handler.model().borrow();
        assert_eq!(model.asset_items(), ["c".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(model.plugin_items(), ["z".to_string()]);
    }

    #[test]
    fn test_persist_then_reconcile_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        {
            let mut model = handler.model().borrow_mut();
            model.add_asset_item("B");
            model.add_asset_item("A");
            model.add_plugin_item("zenject");
        }
        let before = handler.build_config_from_model();

        handler.persist().unwrap();
        assert!(!handler.has_config_changed());

        handler.model().borrow_mut().reset();
        handler.reconcile_from_disk().unwrap();
        assert!(handler.build_config_from_model().same_packages(&before));
    }

    #[test]
    fn test_extra_settings_survive_persist() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        write_config(
            &handler,
            "AssetsFolder: [a]\nPrebuilt: [Assembly-CSharp]\nSolutionFolders:\n- Tests: '*.Tests'\n",
        );

        handler.reconcile_from_disk().unwrap();
        handler.model().borrow_mut().add_asset_item("b");
        handler.persist().unwrap();

        let saved = YamlConfigStore.load(&handler.config_path()).unwrap().unwrap();
        assert_eq!(saved.assets_folder, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(saved.prebuilt, vec!["Assembly-CSharp".to_string()]);
        assert_eq!(saved.solution_folders, vec![("Tests".to_string(), "*.Tests".to_string())]);
    }

    #[test]
    fn test_switch_scope_saves_or_discards() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        write_config(&handler, "AssetsFolder: [shared]\n");
        handler.reconcile_from_disk().unwrap();

        handler.model().borrow_mut().add_asset_item("local-edit");
        handler
            .switch_scope(ConfigScope::LocalProjectUser, PendingChanges::Discard)
            .unwrap();
        assert_eq!(handler.scope(), ConfigScope::LocalProjectUser);
        assert!(handler.model().borrow().is_empty());

        handler.model().borrow_mut().add_plugin_item("user-plugin");
        handler
            .switch_scope(ConfigScope::LocalProject, PendingChanges::Save)
            .unwrap();
        assert_eq!(handler.model().borrow().asset_items(), ["shared".to_string()]);

        handler
            .switch_scope(ConfigScope::LocalProjectUser, PendingChanges::Discard)
            .unwrap();
        assert_eq!(handler.model().borrow().plugin_items(), ["user-plugin".to_string()]);
    }

    #[test]
    fn test_apply_changes_persists_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Rc::new(handler_in(dir.path()));
        handler.model().borrow_mut().add_asset_item("numpy");

        let scheduler = Scheduler::new();
        let orchestrator = CommandOrchestrator::new(scheduler.clone(), || {});
        let result = Rc::new(RefCell::new(None));

        let path = handler.config_path();
        let runner = handler.clone();
        let slot = result.clone();
        let _caller = scheduler.submit(
            async move {
                let outcome = runner
                    .apply_changes(&orchestrator, "Updating links", move || {
                        let saved = fs_err::read_to_string(&path).unwrap_or_default();
                        futures::stream::iter(vec![
                            CommandEvent::progress(["linking"]),
                            CommandEvent::succeeded(saved.contains("numpy")),
                        ])
                    })
                    .await;
                *slot.borrow_mut() = Some(outcome);
                Ok::<_, TaskError>(())
            },
            TaskOptions::background(),
        );

        while scheduler.is_running() {
            scheduler.tick().unwrap();
        }
        assert!(matches!(*result.borrow(), Some(Ok(true))));
    }

    #[test]
    fn test_apply_changes_surfaces_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Rc::new(handler_in(dir.path()));

        let scheduler = Scheduler::new();
        let orchestrator = CommandOrchestrator::new(scheduler.clone(), || {});
        let result = Rc::new(RefCell::new(None));

        let runner = handler.clone();
        let slot = result.clone();
        let _caller = scheduler.submit(
            async move {
                let outcome = runner
                    .apply_changes(&orchestrator, "Updating links", || {
                        futures::stream::iter(vec![CommandEvent::<()>::failed("link target missing")])
                    })
                    .await;
                *slot.borrow_mut() = Some(outcome);
                Ok::<_, TaskError>(())
            },
            TaskOptions::background(),
        );

        while scheduler.is_running() {
            scheduler.tick().unwrap();
        }
        let outcome = result.borrow();
        match &*outcome {
            Some(Err(SyncError::Command(err))) => {
                assert_eq!(err, &CommandError::failed("link target missing"))
            }
            other => panic!("expected a command failure, got {other:?}"),
        }
    }
}
