//! eyegrid command-line driver.

use anyhow::Context;
use clap::Parser;
use eyegrid::logging::{LogConfig, LogFormat, init_logging};
use eyegrid::{Dpi, Session, Side, UploadFile};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};

mod cli;
mod commands;

use crate::cli::{Cli, LogFormatArg};

fn main() {
    let cli = Cli::parse();
    init_logging(&log_config_from_cli(&cli));
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut session = Session::builder()
        .paper(cli.paper.into())
        .dpi(Dpi::parse(&cli.dpi))
        .download_dir(&cli.out_dir)
        .print_command(&cli.print_command)
        .build()
        .context("failed to start session")?;

    for path in &cli.left {
        session.upload(Side::Left, UploadFile::from_path(path));
    }
    for path in &cli.right {
        session.upload(Side::Right, UploadFile::from_path(path));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &cli.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open script {}", path.display()))?;
            commands::run(&mut session, BufReader::new(file), &mut out, false)?;
        }
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            commands::run(&mut session, stdin.lock(), &mut out, interactive)?;
        }
    }
    Ok(())
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        with_ansi: io::stderr().is_terminal(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
    }
}
