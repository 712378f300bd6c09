//! Reload Module
//!
//! The live-reload core: deciding which changes matter, coalescing bursts,
//! and fanning the resulting signal out to connected browsers.
//!
//! ```text
//! ChangeEvent -> PathClassifier -> Debouncer -> ReloadSignal -> ReloadBroadcaster -> clients
//! ```
//!
//! # Modules
//!
//! - `types` - Change events and reload signals
//! - `classify` - Extension-based relevance filter
//! - `debouncer` - Leading-edge debounce
//! - `broadcaster` - Client registry and fan-out
//! - `message` - JSON messages sent to browsers

pub mod broadcaster;
pub mod classify;
pub mod debouncer;
pub mod message;
pub mod types;

pub use broadcaster::{ClientConnection, ReloadBroadcaster};
pub use classify::PathClassifier;
pub use debouncer::Debouncer;
pub use message::ReloadMessage;
pub use types::{ChangeEvent, ChangeKind};
