// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Turn the path strings that a user writes into their configuration file
//! into absolute paths of directories that actually exist.

use std::{
    env::VarError,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument};

/// Resolve path string to an absolute path of an existing directory.
///
/// Performs shell expansion on `raw`, i.e., expands a leading `~` and any
/// environment variables. Relative results are joined under `root_dir`
/// unless `root_dir` is the file system root, in which case they are taken
/// relative to the current working directory. The `.` and `..` segments of the
/// resulting path are then collapsed lexically.
///
/// # Errors
///
/// - Return [`PathError::Empty`] if `raw` is empty.
/// - Return [`PathError::ShellExpansion`] if an environment variable is unset.
/// - Return [`PathError::CurrentDir`] if current working directory cannot be
///   determined.
/// - Return [`PathError::DirectoryNotFound`] if resolved path is not an
///   existing directory.
#[instrument(level = "debug")]
pub fn resolve_dir(raw: &str, root_dir: &Path) -> Result<PathBuf> {
    if raw.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(shellexpand::full(raw)?.into_owned());
    let path = if expanded.is_absolute() {
        expanded
    } else if root_dir != Path::new("/") {
        root_dir.join(expanded)
    } else {
        std::env::current_dir()
            .map_err(PathError::CurrentDir)?
            .join(expanded)
    };
    let path = normalize(path);
    debug!("resolved {raw:?} to {:?}", path.display());

    if !path.is_dir() {
        return Err(PathError::DirectoryNotFound { path });
    }

    Ok(path)
}

/// Collapse `.` and `..` segments of path without touching the file system.
///
/// A `..` at the root stays at the root.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match normal.components().next_back() {
                Some(Component::Normal(_)) => {
                    normal.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => continue,
                _ => normal.push(".."),
            },
            component => normal.push(component),
        }
    }

    normal
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Path string is empty.
    #[error("path must not be empty")]
    Empty,

    /// Shell expansion references an unset environment variable.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<VarError>),

    /// Current working directory cannot be determined.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),

    /// Resolved path is not an existing directory.
    #[error("directory {:?} does not exist", path.display())]
    DirectoryNotFound { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
