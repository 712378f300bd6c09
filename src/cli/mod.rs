//! Command-line interface module.

mod args;
pub mod banner;

pub use args::Cli;
