// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch stow command execution.
//!
//! Cstow never creates or removes symlinks itself. Instead, a stow command is
//! rendered from the user's command template for every pair of target
//! directory and stow directory, and handed off to a shell. Pairs are
//! processed one at a time, in the order the configuration lists them.
//!
//! A stow command that exits with a non-zero status is not an error of cstow.
//! Its result is shown to the user, and the batch moves on to the next pair.
//! Failing to launch a stow command at all aborts the batch.

use crate::{command::Action, config::Config, view::View};

use std::{
    ffi::OsString,
    process::{Command, Output},
};
use tracing::{debug, info, instrument, warn};

/// Captured result of one finished stow command.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ProcessResult {
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,

    /// Captured standard output.
    pub stdout: Vec<u8>,

    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    /// Check if command exited successfully.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for ProcessResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Layer of indirection for running rendered stow commands.
pub trait CommandRunner {
    /// Run command to completion, capturing its output.
    ///
    /// # Errors
    ///
    /// - Return [`StowError::Launch`] if command cannot be launched.
    fn run(&mut self, command: &str) -> Result<ProcessResult>;
}

/// Run commands through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRunner {
    shell: OsString,
}

impl ShellRunner {
    /// Construct new shell runner that uses `sh`.
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    /// Construct new shell runner that uses target shell.
    ///
    /// The shell must accept a command line through `-c`.
    pub fn with_shell(shell: impl Into<OsString>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    #[instrument(skip(self), level = "debug")]
    fn run(&mut self, command: &str) -> Result<ProcessResult> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|err| StowError::Launch {
                source: err,
                command: command.into(),
            })?;
        debug!("command exited with {:?}", output.status);

        Ok(output.into())
    }
}

/// Stow every pair of a configuration.
#[derive(Debug, Default)]
pub struct Stower<R = ShellRunner>
where
    R: CommandRunner,
{
    runner: R,
}

impl<R> Stower<R>
where
    R: CommandRunner,
{
    /// Construct new stower.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run action on every pair of target directory and stow directory.
    ///
    /// Pairs are handled strictly one after another. The view receives all
    /// output of a pair before the next pair starts.
    ///
    /// # Errors
    ///
    /// - Return [`StowError::Launch`] if a stow command cannot be launched.
    /// - Return [`StowError::View`] if view cannot show progress.
    #[instrument(skip(self, config, view), level = "debug")]
    pub fn stow(&mut self, config: &Config, action: Action, view: &mut impl View) -> Result<()> {
        info!("run {action} over {} target directories", config.targets_dirs().len());
        view.show_action(action)?;

        for pair in config.each_target_and_dir() {
            view.show_dir(pair.dir)?;

            let command = config
                .command_template()
                .render(action, pair.target, pair.dir);
            let proc = self.runner.run(&command)?;
            if !proc.success() {
                warn!(
                    "stow command for {:?} exited with {:?}",
                    pair.dir.display(),
                    proc.code
                );
            }

            view.show_proc(&proc)?;
        }

        Ok(())
    }

    /// Access underlying command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

/// Batch execution error types.
#[derive(Debug, thiserror::Error)]
pub enum StowError {
    /// Command cannot be launched.
    #[error("failed to launch command {command:?}")]
    Launch {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// View cannot show progress.
    #[error(transparent)]
    View(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = StowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLayout;

    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{
        fs::create_dir_all,
        path::{Path, PathBuf},
    };

    #[derive(Debug, Default)]
    struct RecordRunner {
        commands: Vec<String>,
        codes: Vec<i32>,
        fail_launch_at: Option<usize>,
    }

    impl CommandRunner for RecordRunner {
        fn run(&mut self, command: &str) -> Result<ProcessResult> {
            if self.fail_launch_at == Some(self.commands.len()) {
                return Err(StowError::Launch {
                    source: std::io::Error::other("no shell"),
                    command: command.into(),
                });
            }

            let code = self.codes.get(self.commands.len()).copied().unwrap_or(0);
            self.commands.push(command.into());
            Ok(ProcessResult {
                code: Some(code),
                stdout: command.as_bytes().to_vec(),
                stderr: Vec::new(),
            })
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Action(Action),
        Dir(PathBuf),
        Proc(ProcessResult),
    }

    #[derive(Debug, Default)]
    struct RecordView {
        events: Vec<Event>,
    }

    impl View for RecordView {
        fn show_action(&mut self, action: Action) -> std::io::Result<()> {
            self.events.push(Event::Action(action));
            Ok(())
        }

        fn show_dir(&mut self, dir: &Path) -> std::io::Result<()> {
            self.events.push(Event::Dir(dir.into()));
            Ok(())
        }

        fn show_proc(&mut self, proc: &ProcessResult) -> std::io::Result<()> {
            self.events.push(Event::Proc(proc.clone()));
            Ok(())
        }
    }

    fn config(targets_dirs: &[(&str, Vec<&str>)]) -> anyhow::Result<Config> {
        let cwd = std::env::current_dir()?;
        let mut layout = ConfigLayout {
            command_template: "stow --${action} -t ${target} -d ${dir}".into(),
            root_dir: "/".into(),
            targets_dirs: IndexMap::new(),
        };

        for (target, dirs) in targets_dirs {
            create_dir_all(target)?;
            for dir in dirs.iter() {
                create_dir_all(dir)?;
            }
            layout.targets_dirs.insert(
                cwd.join(target).display().to_string(),
                dirs.iter().map(|dir| cwd.join(dir).display().to_string()).collect(),
            );
        }

        Ok(layout.resolve()?)
    }

    #[sealed_test]
    fn stow_single_pair() -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let config = config(&[("target", vec!["src"])])?;
        let mut stower = Stower::new(RecordRunner::default());
        let mut view = RecordView::default();

        stower.stow(&config, Action::Stow, &mut view)?;

        let command = format!(
            "stow --stow -t {} -d {}",
            cwd.join("target").display(),
            cwd.join("src").display()
        );
        assert_eq!(stower.runner().commands, vec![command.clone()]);
        assert_eq!(
            view.events,
            vec![
                Event::Action(Action::Stow),
                Event::Dir(cwd.join("src")),
                Event::Proc(ProcessResult {
                    code: Some(0),
                    stdout: command.into_bytes(),
                    stderr: Vec::new(),
                }),
            ]
        );

        Ok(())
    }

    #[sealed_test]
    fn stow_pairs_in_config_order() -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let config = config(&[("t1", vec!["s1", "s2"]), ("t2", vec!["s1", "s2"])])?;
        let mut stower = Stower::new(RecordRunner::default());
        let mut view = RecordView::default();

        stower.stow(&config, Action::Delete, &mut view)?;

        let result = stower.runner().commands.clone();
        let expect = [("t1", "s1"), ("t1", "s2"), ("t2", "s1"), ("t2", "s2")]
            .iter()
            .map(|(target, dir)| {
                format!(
                    "stow --delete -t {} -d {}",
                    cwd.join(target).display(),
                    cwd.join(dir).display()
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(result, expect);

        let dirs = view
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Dir(dir) => Some(dir.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        let expect = ["s1", "s2", "s1", "s2"]
            .iter()
            .map(|dir| cwd.join(dir))
            .collect::<Vec<_>>();
        assert_eq!(dirs, expect);

        Ok(())
    }

    #[sealed_test]
    fn stow_continues_after_failed_command() -> anyhow::Result<()> {
        let config = config(&[("target", vec!["s1", "s2", "s3"])])?;
        let mut stower = Stower::new(RecordRunner {
            codes: vec![0, 2, 0],
            ..Default::default()
        });
        let mut view = RecordView::default();

        stower.stow(&config, Action::Restow, &mut view)?;

        let codes = view
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Proc(proc) => Some(proc.code),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(codes, vec![Some(0), Some(2), Some(0)]);

        Ok(())
    }

    #[sealed_test]
    fn stow_aborts_when_launch_fails() -> anyhow::Result<()> {
        let config = config(&[("target", vec!["s1", "s2", "s3"])])?;
        let mut stower = Stower::new(RecordRunner {
            fail_launch_at: Some(1),
            ..Default::default()
        });
        let mut view = RecordView::default();

        let result = stower.stow(&config, Action::Stow, &mut view);
        assert!(matches!(result, Err(StowError::Launch { .. })));
        assert_eq!(stower.runner().commands.len(), 1);

        // INVARIANT: Second directory was announced, but never finished.
        let last = view.events.last();
        assert!(matches!(last, Some(Event::Dir(_))));

        Ok(())
    }

    #[sealed_test]
    fn stow_announces_dry_run() -> anyhow::Result<()> {
        let config = config(&[("target", vec!["src"])])?;
        let mut stower = Stower::new(RecordRunner::default());
        let mut view = RecordView::default();

        stower.stow(&config, Action::No, &mut view)?;
        assert_eq!(view.events.first(), Some(&Event::Action(Action::No)));
        assert!(stower.runner().commands[0].starts_with("stow --no "));

        Ok(())
    }

    #[test]
    fn shell_runner_captures_streams_separately() -> anyhow::Result<()> {
        let mut runner = ShellRunner::new();
        let result = runner.run("echo out; echo err >&2; exit 3")?;
        let expect = ProcessResult {
            code: Some(3),
            stdout: b"out\n".to_vec(),
            stderr: b"err\n".to_vec(),
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn shell_runner_refuses_command_with_nul() {
        let template: crate::CommandTemplate = "echo ${action} ${target} ${dir}".parse().unwrap();
        let command = template.render(Action::Stow, Path::new("/tmp/a\0b"), Path::new("/tmp"));
        let result = ShellRunner::new().run(&command);
        assert!(matches!(result, Err(StowError::Launch { .. })));
    }

    #[test]
    fn shell_runner_fails_to_launch_missing_shell() {
        let mut runner = ShellRunner::with_shell("/no/such/shell");
        let result = runner.run("true");
        assert!(matches!(result, Err(StowError::Launch { .. })));
    }
}
