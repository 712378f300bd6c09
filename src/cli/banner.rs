//! Startup banner and browser launch.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

use crate::config::Config;
use crate::log;
use crate::utils::net::{display_host, local_ip};

/// The browser is opened at most once per process, restarts included
static BROWSER_OPENED: AtomicBool = AtomicBool::new(false);

/// URL for the loopback side of `addr`.
pub fn local_url(addr: SocketAddr) -> String {
    format!("http://{}", SocketAddr::new(display_host(addr.ip()), addr.port()))
}

/// URL other machines on the network can use, if the bind allows it.
fn network_url(addr: SocketAddr) -> Option<String> {
    if addr.ip().is_loopback() {
        return None;
    }

    let ip = if addr.ip().is_unspecified() {
        local_ip().unwrap_or_else(|e| {
            log!("warning"; "could not determine LAN address ({}), using localhost", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        })
    } else {
        addr.ip()
    };
    Some(format!("http://{}", SocketAddr::new(ip, addr.port())))
}

/// Print where the server can be reached.
pub fn print_banner(addr: SocketAddr, config: &Config) {
    log!("serve"; "serving {}", config.serve_root().display());
    println!("  {} {}", "Local:  ".dimmed(), local_url(addr).bold());
    if let Some(url) = network_url(addr) {
        println!("  {} {}", "Network:".dimmed(), url.bold());
    }

    if config.reload.enable {
        log!(
            "reload";
            "hot reloading enabled, watching {} ({})",
            config.watch_root().display(),
            config.classifier().extensions().join(", ")
        );
    }
}

/// Open `url` in the default browser, once.
pub fn open_browser(url: &str) {
    if BROWSER_OPENED.swap(true, Ordering::SeqCst) {
        return;
    }

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => crate::debug!("serve"; "opened browser at {}", url),
        Err(e) => log!("warning"; "failed to open browser: {}", e),
    }
}
