//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::net::IpAddr;
use std::path::PathBuf;

/// Static file server with live reload for local development
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory to serve (default: config value, then current directory)
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path
    #[arg(short = 'C', long, default_value = "hotserve.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Port number to listen on (0 = any free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Document served for `/`
    #[arg(long)]
    pub index: Option<String>,

    /// Enable file watching and live reload
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub watch: Option<bool>,

    /// Open the default browser at startup
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub open: Option<bool>,

    /// Debounce window in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Extensions that trigger a reload (comma separated, e.g. `html,css,js`)
    #[arg(short, long = "ext", value_delimiter = ',', value_name = "EXT")]
    pub extensions: Option<Vec<String>>,

    /// Print debug output (ignored events, client connects, requests)
    #[arg(short, long)]
    pub verbose: bool,
}
