// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Cstow is driven by one TOML file whose location is given through the
//! `CSTOW_CONFIG_PATH` environment variable. The file maps each target
//! directory to the stow directories whose contents should be symlinked into
//! it.
//!
//! # General Layout
//!
//! ```toml
//! # Optional, must reference ${action}, ${target}, and ${dir} exactly.
//! command_template = "stow --${action} --target=${target} --dir=${dir} ."
//!
//! # Optional, relative stow directories are placed under it.
//! root_dir = "~/dotfiles"
//!
//! [targets_dirs]
//! "~" = ["bash", "vim"]
//! "~/.config" = ["nvim"]
//! ```
//!
//! Unknown keys are rejected. Every path is shell expanded and must point to
//! an existing directory. Problems found while validating the file are all
//! reported together.

use crate::{
    command::{CommandTemplate, DEFAULT_COMMAND_TEMPLATE},
    path::{normalize, resolve_dir},
};

use indexmap::IndexMap;
use serde::Deserialize;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument, warn};

/// Environment variable that holds path to configuration file.
pub const CONFIG_PATH_ENV_VAR: &str = "CSTOW_CONFIG_PATH";

/// Raw configuration file layout.
///
/// Holds exactly what the user wrote. Use [`ConfigLayout::resolve`] to
/// validate it into a [`Config`].
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayout {
    /// Template to build stow commands from.
    #[serde(default = "default_command_template")]
    pub command_template: String,

    /// Directory that relative paths are placed under.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Target directories mapped to their stow directories.
    pub targets_dirs: IndexMap<String, Vec<String>>,
}

impl ConfigLayout {
    /// Validate raw layout into a [`Config`].
    ///
    /// Expands and checks every path, and validates the command template.
    /// Keeps going after the first problem so every offending field gets
    /// reported at once.
    ///
    /// # Errors
    ///
    /// - Return [`FieldErrors`] listing every offending field.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(self) -> Result<Config, FieldErrors> {
        let mut errors = FieldErrors::default();

        let root_dir = match resolve_dir(&self.root_dir, Path::new("/")) {
            Ok(root_dir) => Some(root_dir),
            Err(error) => {
                errors.push("root_dir", &self.root_dir, error);
                None
            }
        };

        if self.targets_dirs.is_empty() {
            warn!("no target directories to process");
        }

        let mut targets_dirs: IndexMap<PathBuf, Vec<PathBuf>> = IndexMap::new();
        if let Some(root_dir) = &root_dir {
            for (target, dirs) in &self.targets_dirs {
                let field = format!("targets_dirs[{target:?}]");
                // INVARIANT: Keys like "./" or "a/.." are the current directory too.
                if !target.is_empty() && normalize(target).as_os_str().is_empty() {
                    errors.push(&field, target, "target must not be '.'");
                    continue;
                }

                if dirs.is_empty() {
                    errors.push(&field, "[]", "stow directory list must not be empty");
                    continue;
                }

                let target = match resolve_dir(target, root_dir) {
                    Ok(target) => target,
                    Err(error) => {
                        errors.push(&field, target, error);
                        continue;
                    }
                };

                let mut resolved = Vec::with_capacity(dirs.len());
                for (index, dir) in dirs.iter().enumerate() {
                    match resolve_dir(dir, root_dir) {
                        Ok(dir) => resolved.push(dir),
                        Err(error) => errors.push(format!("{field}[{index}]"), dir, error),
                    }
                }

                // INVARIANT: Two keys that expand to the same directory share
                // one entry, keeping the position of the first key.
                targets_dirs.entry(target).or_default().extend(resolved);
            }
        } else if !self.targets_dirs.is_empty() {
            errors.push(
                "targets_dirs",
                "...",
                "cannot be resolved without a valid 'root_dir'",
            );
        }

        let command_template = match self.command_template.parse::<CommandTemplate>() {
            Ok(template) => Some(template),
            Err(error) => {
                errors.push("command_template", &self.command_template, error);
                None
            }
        };

        match (errors.is_empty(), command_template, root_dir) {
            (true, Some(command_template), Some(root_dir)) => Ok(Config {
                command_template,
                root_dir,
                targets_dirs,
            }),
            _ => Err(errors),
        }
    }
}

impl FromStr for ConfigLayout {
    type Err = toml::de::Error;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data)
    }
}

fn default_command_template() -> String {
    DEFAULT_COMMAND_TEMPLATE.into()
}

fn default_root_dir() -> String {
    "/".into()
}

/// Validated configuration.
///
/// # Invariants
///
/// - Every path is absolute, and pointed to an existing directory at load
///   time.
/// - Every target maps to at least one stow directory.
/// - Command template references exactly the required placeholders.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Config {
    command_template: CommandTemplate,
    root_dir: PathBuf,
    targets_dirs: IndexMap<PathBuf, Vec<PathBuf>>,
}

impl Config {
    /// Load configuration from file named by environment variable.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::EnvVarUnset`] if `env_var` is unset or empty.
    /// - Return any error of [`Config::from_path`].
    pub fn from_env_var(env_var: &str) -> Result<Self> {
        Self::from_path(config_path_from_env(env_var)?)
    }

    /// Load configuration from file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NotFound`] if file does not exist.
    /// - Return [`ConfigError::Read`] if file cannot be read otherwise.
    /// - Return [`ConfigError::Invalid`] if file is not valid TOML, or fails
    ///   validation.
    #[instrument(skip(path), level = "debug")]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("load configuration from {:?}", path.display());

        let data = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ConfigError::NotFound { path: path.into() },
            _ => ConfigError::Read {
                source: err,
                path: path.into(),
            },
        })?;

        let layout: ConfigLayout = data.parse().map_err(|err: toml::de::Error| {
            ConfigError::Invalid {
                path: path.into(),
                message: err.to_string(),
            }
        })?;

        let config = layout.resolve().map_err(|errors| ConfigError::Invalid {
            path: path.into(),
            message: errors.to_string(),
        })?;
        debug!("loaded configuration: {config:?}");

        Ok(config)
    }

    /// Template that stow commands are built from.
    pub fn command_template(&self) -> &CommandTemplate {
        &self.command_template
    }

    /// Directory that relative paths were placed under.
    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    /// Target directories mapped to their stow directories.
    pub fn targets_dirs(&self) -> &IndexMap<PathBuf, Vec<PathBuf>> {
        &self.targets_dirs
    }

    /// Iterate over every pair of target directory and stow directory.
    ///
    /// Targets come in the order they were written, and each target yields
    /// its stow directories in list order.
    pub fn each_target_and_dir(&self) -> impl Iterator<Item = Pair<'_>> {
        self.targets_dirs.iter().flat_map(|(target, dirs)| {
            dirs.iter().map(move |dir| Pair {
                target: target.as_path(),
                dir: dir.as_path(),
            })
        })
    }
}

/// One target directory with one of its stow directories.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Pair<'cfg> {
    /// Directory that symlinks get placed into.
    pub target: &'cfg Path,

    /// Directory that symlinks point into.
    pub dir: &'cfg Path,
}

/// Lookup configuration file path through environment variable.
///
/// # Errors
///
/// - Return [`ConfigError::EnvVarUnset`] if `env_var` is unset or empty.
pub fn config_path_from_env(env_var: &str) -> Result<PathBuf> {
    match std::env::var_os(env_var) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(ConfigError::EnvVarUnset {
            env_var: env_var.into(),
        }),
    }
}

/// Every offending field found while validating a [`ConfigLayout`].
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct FieldErrors {
    entries: Vec<FieldError>,
}

impl FieldErrors {
    fn push(
        &mut self,
        field: impl Into<String>,
        input: impl Into<String>,
        error: impl ToString,
    ) {
        self.entries.push(FieldError {
            field: field.into(),
            input: input.into(),
            error: error.to_string(),
        });
    }

    /// Check if no field failed validation.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of offending fields in the order they were found.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.field.as_str())
    }
}

impl Display for FieldErrors {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let blocks = self
            .entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        fmt.write_str(&blocks.join("\n\n"))
    }
}

impl std::error::Error for FieldErrors {}

#[derive(Debug, PartialEq, Eq, Clone)]
struct FieldError {
    field: String,
    input: String,
    error: String,
}

impl Display for FieldError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{}\n    input: {}\n    error: {}",
            self.field,
            self.input,
            self.error.replace('\n', "\n           ")
        )
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable holding configuration path is not set.
    #[error("Environment variable {env_var} is unset. Expected path to cstow_config.toml")]
    EnvVarUnset { env_var: String },

    /// Configuration file does not exist.
    #[error("No such file: {}\nExpected path to cstow_config.toml", path.display())]
    NotFound { path: PathBuf },

    /// Configuration file cannot be read.
    #[error("failed to read config file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration file is malformed, or fails validation.
    #[error("Invalid config: {}\n\n{message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
