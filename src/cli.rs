use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(
    name = "sweeper",
    about = "Reclaim disk space from git repositories, EDT workspaces and 1C databases",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run maintenance for every configured resource kind
    Run {
        /// Path to the JSON configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Suppress console output (errors are still printed)
        #[arg(short, long)]
        silent: bool,
    },

    /// Print the encoded form of a database password for the config file.
    /// This is base64 obfuscation, not encryption
    EncodePassword {
        password: String,
    },

    /// List the candidates each configured kind would process, without
    /// touching anything
    Locate {
        /// Path to the JSON configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}
