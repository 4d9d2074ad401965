// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Show batch progress to the user.

use crate::{command::Action, stow::ProcessResult};

use std::{
    io::{self, Stderr, Stdout, Write},
    path::Path,
};

/// Receive events of a stow batch.
///
/// Events arrive in a fixed order: one call to [`View::show_action`] for the
/// batch, followed by [`View::show_dir`] and [`View::show_proc`] for each
/// pair of target directory and stow directory.
pub trait View {
    /// Batch started for action.
    fn show_action(&mut self, action: Action) -> io::Result<()>;

    /// Stow directory is about to be processed.
    fn show_dir(&mut self, dir: &Path) -> io::Result<()>;

    /// Stow command finished.
    fn show_proc(&mut self, proc: &ProcessResult) -> io::Result<()>;
}

/// Plain text view.
///
/// Captured standard output of a stow command goes to `out`, and captured
/// standard error goes to `err`. They are never mixed.
#[derive(Debug)]
pub struct PlainView<O = Stdout, E = Stderr>
where
    O: Write,
    E: Write,
{
    out: O,
    err: E,
}

impl PlainView {
    /// Construct new plain view over standard output and standard error.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O, E> PlainView<O, E>
where
    O: Write,
    E: Write,
{
    /// Construct new plain view over given writers.
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Take back the writers.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O, E> View for PlainView<O, E>
where
    O: Write,
    E: Write,
{
    fn show_action(&mut self, action: Action) -> io::Result<()> {
        writeln!(self.out, "@@@@@ {} @@@@@\n", action.title())?;
        self.out.flush()
    }

    fn show_dir(&mut self, dir: &Path) -> io::Result<()> {
        writeln!(self.out, "### {} ###\n", dir.display())?;
        self.out.flush()
    }

    fn show_proc(&mut self, proc: &ProcessResult) -> io::Result<()> {
        let stdout = String::from_utf8_lossy(&proc.stdout);
        if !stdout.is_empty() {
            writeln!(self.out, "{stdout}")?;
            self.out.flush()?;
        }

        let stderr = String::from_utf8_lossy(&proc.stderr);
        if !stderr.is_empty() {
            writeln!(self.err, "{stderr}")?;
            self.err.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_view_output() -> anyhow::Result<()> {
        let mut view = PlainView::new(Vec::new(), Vec::new());
        view.show_action(Action::No)?;
        view.show_dir(Path::new("/tmp/src"))?;
        view.show_proc(&ProcessResult {
            code: Some(0),
            stdout: b"LINK: file => ../src/file".to_vec(),
            stderr: Vec::new(),
        })?;
        view.show_dir(Path::new("/tmp/other"))?;
        view.show_proc(&ProcessResult {
            code: Some(1),
            stdout: Vec::new(),
            stderr: b"stow: cannot stow".to_vec(),
        })?;

        let (out, err) = view.into_inner();
        let expect_out = indoc! {"
            @@@@@ DRY RUN @@@@@

            ### /tmp/src ###

            LINK: file => ../src/file
            ### /tmp/other ###

        "};
        assert_eq!(String::from_utf8(out)?, expect_out);
        assert_eq!(String::from_utf8(err)?, "stow: cannot stow\n");

        Ok(())
    }
}
