// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk — command-line OCR for scanned and photographed pages.
//
// Entry point. Initialises logging, parses arguments and dispatches to the
// command handlers.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => commands::run(cli.config.as_deref(), args),
        Command::Profile(cmd) => commands::profile(cli.config.as_deref(), cmd),
        Command::InitConfig { path } => commands::init_config(&path),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "pagewerk failed");
            ExitCode::FAILURE
        }
    }
}
