//! Command-line interface definitions.
//!
//! `stencil <directory> <build|serve|watch> [options]`

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Stencil static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Website directory (must contain `content/`)
    pub directory: PathBuf,

    /// What to do with the site
    #[arg(value_enum)]
    pub command: Command,

    /// Port for `serve` and `watch` (default: 3000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to bind for `serve` and `watch` (default: 127.0.0.1)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Detect changes by polling modification times instead of filesystem events
    #[arg(long)]
    pub poll: bool,
}

/// Available commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Delete the output directory and rebuild the site
    Build,
    /// Build once, then serve the output directory over HTTP
    Serve,
    /// Build, serve in the background and rebuild on every change
    Watch,
}
