//! Stencil - a tiny static site generator for plain HTML sites.

mod build;
mod cli;
mod config;
mod frontmatter;
mod generator;
mod log;
mod page;
mod route;
mod serve;
mod shutdown;
mod template;
mod watch;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Command};
use config::SiteConfig;
use serve::serve_site;
use shutdown::Shutdown;
use watch::watch_site;

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Leaked so the background server thread in `watch` can borrow it.
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::load(&cli)?));

    match cli.command {
        Command::Build => build_site(config).map(|_| ()),
        Command::Serve => {
            build_site(config)?;
            let shutdown = Shutdown::install()?;
            serve_site(config, &shutdown)
        }
        Command::Watch => {
            let shutdown = Shutdown::install()?;
            watch_site(config, &shutdown)
        }
    }
}
