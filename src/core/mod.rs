//! Core process state shared across the codebase.

mod state;

pub use state::{ShutdownTrigger, setup_shutdown_handler};
