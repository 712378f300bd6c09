//! hotserve - a static file server that reloads the browser on change.

mod cli;
mod config;
mod coordinator;
mod core;
mod embed;
mod logger;
mod reload;
mod serve;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::Config;
use coordinator::Coordinator;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Config::load(&cli).context("failed to load configuration")?;
    let open = config.serve.open;

    let mut coordinator = Coordinator::new(config);
    core::setup_shutdown_handler(coordinator.shutdown_trigger())?;

    let addr = coordinator.start().context("failed to start server")?;
    cli::banner::print_banner(addr, coordinator.config());
    if open {
        cli::banner::open_browser(&cli::banner::local_url(addr));
    }

    coordinator.wait();
    Ok(())
}
