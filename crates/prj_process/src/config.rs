//! Configuration of the program the executor launches

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Program path must not be empty")]
    EmptyProgram,

    #[error("Invalid environment variable name: {name:?}")]
    InvalidEnvName { name: String },

    #[error("Working directory does not exist: {}", path.display())]
    MissingWorkingDir { path: PathBuf },
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid_env_name<S: Into<String>>(name: S) -> Self {
        ConfigError::InvalidEnvName { name: name.into() }
    }
}

/// Describes how to launch the command line tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandConfig {
    /// The executable to run
    pub program: PathBuf,

    /// Arguments placed before the arguments of every request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args_prefix: Vec<String>,

    /// Directory the program runs in, the current one if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for the program
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl CommandConfig {
    /// Create a configuration that runs `program` without extra arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args_prefix: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    /// Append an argument passed before every request's own arguments
    pub fn with_arg_prefix(mut self, arg: impl Into<String>) -> Self {
        self.args_prefix.push(arg.into());
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> ConfigResult<Self> {
        let name = name.into();
        if !is_valid_env_name(&name) {
            return Err(ConfigError::invalid_env_name(name));
        }
        self.env.insert(name, value.into());
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }

        if let Some(name) = self.env.keys().find(|name| !is_valid_env_name(name)) {
            return Err(ConfigError::invalid_env_name(name.clone()));
        }

        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(ConfigError::MissingWorkingDir { path: dir.clone() });
            }
        }

        Ok(())
    }
}

fn is_valid_env_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = CommandConfig::new("prj")
            .with_arg_prefix("--verbose")
            .with_working_dir(".")
            .with_env("PRJ_CONFIG", "ci")
            .unwrap();

        assert_eq!(config.program, PathBuf::from("prj"));
        assert_eq!(config.args_prefix, vec!["--verbose".to_string()]);
        assert_eq!(config.env.get("PRJ_CONFIG").map(String::as_str), Some("ci"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_env_name() {
        let err = CommandConfig::new("prj").with_env("A=B", "x").unwrap_err();
        assert_eq!(err, ConfigError::invalid_env_name("A=B"));
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            CommandConfig::new("").validate(),
            Err(ConfigError::EmptyProgram)
        );

        let missing = CommandConfig::new("prj").with_working_dir("/definitely/not/here");
        assert!(matches!(
            missing.validate(),
            Err(ConfigError::MissingWorkingDir { .. })
        ));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CommandConfig = serde_yaml::from_str("program: /usr/bin/prj\n").unwrap();
        assert_eq!(config, CommandConfig::new("/usr/bin/prj"));

        let config: CommandConfig =
            serde_yaml::from_str("program: prj\nargs-prefix: [--quiet]\nenv:\n  LANG: C\n").unwrap();
        assert_eq!(config.args_prefix, vec!["--quiet".to_string()]);
        assert_eq!(config.env.get("LANG").map(String::as_str), Some("C"));
    }
}
