//! `[serve]` and `[reload]` sections.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! root = "."                # Directory to serve
//! index = "index.html"      # Document for `/`
//! interface = "0.0.0.0"     # Network interface (127.0.0.1 = localhost only)
//! port = 0                  # HTTP port, 0 = any free port
//! open = true               # Open the browser at startup
//!
//! [reload]
//! enable = true             # Watch files and push reloads
//! debounce_ms = 500         # Minimum time between two reloads
//! extensions = ["html", "js", "css"]
//! # root = "src"            # Watch a different tree than the served one
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::reload::classify::DEFAULT_EXTENSIONS;
use crate::reload::debouncer::DEFAULT_WINDOW_MS;

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Served directory. Relative paths resolve against the config file.
    pub root: PathBuf,

    /// Document served for `/` and for directory URLs.
    pub index: String,

    /// Network interface to bind.
    /// - `0.0.0.0` (default): all interfaces (LAN accessible)
    /// - `127.0.0.1`: localhost only
    pub interface: IpAddr,

    /// HTTP port number, `0` lets the OS choose.
    pub port: u16,

    /// Open the default browser once the server is up.
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: "index.html".to_string(),
            interface: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            open: true,
        }
    }
}

/// Live reload settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Watch files and push reloads to connected browsers.
    pub enable: bool,

    /// Debounce window in milliseconds.
    pub debounce_ms: u64,

    /// Extensions whose changes trigger a reload.
    pub extensions: Vec<String>,

    /// Watch root, defaults to `serve.root`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enable: true,
            debounce_ms: DEFAULT_WINDOW_MS,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\nroot = \"public\"\ninterface = \"127.0.0.1\"\nport = 8080\nopen = false",
        );

        assert_eq!(config.serve.root, PathBuf::from("public"));
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.open);
    }

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.serve.root, PathBuf::from("."));
        assert_eq!(config.serve.index, "index.html");
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.serve.port, 0);
        assert!(config.serve.open);

        assert!(config.reload.enable);
        assert_eq!(config.reload.debounce_ms, 500);
        assert_eq!(config.reload.extensions, vec!["html", "js", "css"]);
        assert_eq!(config.reload.root, None);
    }

    #[test]
    fn test_interface_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(config.serve.interface, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_reload_config() {
        let config = test_parse_config(
            "[reload]\nenable = false\ndebounce_ms = 200\nextensions = [\"md\"]\nroot = \"src\"",
        );

        assert!(!config.reload.enable);
        assert_eq!(config.reload.debounce_ms, 200);
        assert_eq!(config.reload.extensions, vec!["md"]);
        assert_eq!(config.reload.root, Some(PathBuf::from("src")));
    }

    #[test]
    fn test_partial_override() {
        let config = test_parse_config("[serve]\nport = 3000");

        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.index, "index.html");
        assert!(config.reload.enable);
    }
}
