use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "m4bkit")]
#[command(author, version, about = "Audiobook metadata and chapter extraction")]
pub struct Cli {
    /// Config file (defaults to ./m4bkit.toml or ~/.config/m4bkit/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log every atom visited and every fallback taken
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe an audiobook and display its metadata and chapters
    Probe {
        /// M4B or MP4 file
        #[arg(required = true)]
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Write the embedded cover image to this path
        #[arg(long)]
        cover_out: Option<PathBuf>,
    },

    /// List the chapters of an audiobook
    Chapters {
        /// File to read
        #[arg(required = true)]
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a config file and print the effective limits
    Validate {
        /// Config file to check (the usual search applies when omitted)
        config: Option<PathBuf>,
    },

    /// Print the version
    Version,
}
