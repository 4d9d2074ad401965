// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use cstow::{
    config::config_path_from_env, Action, Config, PlainView, ShellRunner, Stower,
    CONFIG_PATH_ENV_VAR,
};

use anyhow::Result;
use clap::Parser;
use std::{io::IsTerminal, path::PathBuf, process::exit};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Run GNU Stow over every target and stow directory in your configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "cstow [options] [action]",
    after_help = "The configuration file is read from $CSTOW_CONFIG_PATH unless --config is given.",
    version
)]
struct Cli {
    /// GNU Stow action to perform: no, stow, restow, delete.
    #[arg(value_name = "action", default_value = "no")]
    pub action: String,

    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,
}

impl Cli {
    fn run(self) -> Result<()> {
        // INVARIANT: Reject bad action before touching configuration.
        let action: Action = self.action.parse()?;
        let path = match self.config {
            Some(path) => path,
            None => config_path_from_env(CONFIG_PATH_ENV_VAR)?,
        };
        let config = Config::from_path(path)?;

        let mut stower = Stower::new(ShellRunner::new());
        stower.stow(&config, action, &mut PlainView::stdio())?;

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        debug!("{error:?}");
        // INVARIANT: Fatal diagnostic is shown no matter what the log filter is.
        eprintln!("ERROR:\n\n{error:#}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
