//! Sculpt 命令行程序入口

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;
mod config;
mod script;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(error) =
        tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(level).finish())
    {
        eprintln!("error: failed to initialize logging: {}", error);
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {:#}", error);
            if commands::is_bad_password(&error) {
                eprintln!("hint: the archive is encrypted, pass the right one with --password");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    debug!("Archive format: {}", config.archive.format);

    match &cli.command {
        Command::Pack(args) => commands::run_pack(args, &config),
        Command::Unpack(args) => commands::run_unpack(args, &config),
        Command::List(args) => commands::run_list(args, &config),
        Command::Lasso(args) => commands::run_lasso(args, &config),
    }
}
