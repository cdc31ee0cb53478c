//! CLI argument parsing with clap.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// localfs - path-based object operations on a local directory
#[derive(Parser, Debug)]
#[command(name = "localfs", version)]
pub struct Cli {
    /// TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Work directory all relative paths resolve against (overrides config and LOCALFS_WORK_DIR)
    #[arg(short = 'w', long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Describe one entry
    Stat { path: String },
    /// List a directory, one JSON object per line
    Ls {
        #[arg(default_value = "")]
        dir: String,
        /// Resume after the entry with this name
        #[arg(long, value_name = "NAME")]
        token: Option<OsString>,
        /// Report symlinks as their targets instead of skipping them
        #[arg(short = 'L', long)]
        follow_links: bool,
    },
    /// Write the content of a file to stdout
    Cat {
        path: String,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        size: Option<u64>,
    },
    /// Store stdin into a file
    Put {
        path: String,
        /// Copy exactly this many bytes
        #[arg(long)]
        size: Option<u64>,
    },
    /// Remove one entry (directories must be empty)
    Rm { path: String },
    /// Copy a file
    Cp { src: String, dst: String },
    /// Move or rename an entry
    Mv { src: String, dst: String },
    /// Show the storage configuration
    Meta,
}
