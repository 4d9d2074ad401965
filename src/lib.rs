// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch GNU Stow runner.
//!
//! Cstow reads a TOML table that maps target directories to stow directories,
//! renders a stow command for every pair from a user-supplied command
//! template, and runs each command through a shell. The symlink farm itself is
//! left entirely to GNU Stow.
//!
//! # See Also
//!
//! 1. [GNU Stow](https://www.gnu.org/software/stow/)

pub mod command;
pub mod config;
pub mod path;
pub mod stow;
pub mod view;

pub use command::{Action, CommandTemplate, InvalidActionError, Placeholder, TemplateError};
pub use config::{Config, ConfigError, ConfigLayout, Pair, CONFIG_PATH_ENV_VAR};
pub use stow::{CommandRunner, ProcessResult, ShellRunner, StowError, Stower};
pub use view::{PlainView, View};
