// localfs-cli: command-line front end for localfs-core
// Config layering, logging setup, one storage operation per invocation

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use localfs_core::{
    ConfigError, ErrorKind, ListOptions, ReadOptions, Storage, StorageConfig, StorageError,
    WriteOptions,
};
use log::debug;
use serde::Serialize;

use crate::cli::{Cli, Command};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Layer the config sources: file, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<StorageConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    };
    config.merge(&StorageConfig::from_env());
    if let Some(dir) = &cli.work_dir {
        config.merge(&StorageConfig::with_work_dir(dir));
    }
    Ok(config)
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Unexpected => 1,
        ErrorKind::NotExist => 2,
        ErrorKind::PermissionDenied => 3,
        ErrorKind::ModeInvalid => 4,
    }
}

/// Print one value as a JSON line.
fn emit<T: Serialize>(out: &mut impl Write, value: &T) -> Result<(), StorageError> {
    let line = serde_json::to_string(value).map_err(|e| output_error(e.into()))?;
    writeln!(out, "{line}").map_err(output_error)
}

fn output_error(err: io::Error) -> StorageError {
    StorageError::new("output", err, &[])
}

fn run(command: Command, config: &StorageConfig) -> Result<(), StorageError> {
    let storage = Storage::new(config)?;
    debug!("{storage}");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Stat { path } => emit(&mut out, &storage.stat(&path)?)?,
        Command::Ls {
            dir,
            token,
            follow_links,
        } => {
            let options = ListOptions {
                continuation_token: token,
                follow_links: follow_links || config.follow_links(),
            };
            for object in storage.list(&dir, options) {
                emit(&mut out, &object?)?;
            }
        }
        Command::Cat { path, offset, size } => {
            let options = ReadOptions {
                offset,
                size,
                on_chunk: None,
            };
            storage.read(&path, &mut out, options)?;
        }
        Command::Put { path, size } => {
            let options = WriteOptions {
                size,
                on_chunk: None,
            };
            let n = storage.write(&path, io::stdin().lock(), options)?;
            debug!("stored {n} bytes at {path}");
        }
        Command::Rm { path } => storage.delete(&path)?,
        Command::Cp { src, dst } => storage.copy(&src, &dst)?,
        Command::Mv { src, dst } => storage.move_object(&src, &dst)?,
        Command::Meta => emit(&mut out, &storage.metadata())?,
    }
    out.flush().map_err(output_error)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_code(e.kind()))
        }
    }
}
