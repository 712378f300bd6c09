//! Terminal output with colored module prefixes.
//!
//! - `log!(module; fmt, ..)` always prints
//! - `debug!(module; fmt, ..)` prints only with `--verbose`
//! - `status_success` / `status_warning` print the timestamped lines shown
//!   when a reload fires or the watch degrades
//!
//! ```ignore
//! log!("serve"; "http://{}", addr);
//! debug!("reload"; "client {} connected", id);
//! logger::status_success("modified style.css, reloading 1 client(s)");
//! ```

use std::io::{Write, stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use owo_colors::OwoColorize;

/// Set from `--verbose`
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Print a line with a colored `[module]` prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, but only with `--verbose`. Arguments are not evaluated otherwise.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut out = stdout().lock();
    // Overwrite whatever partial line the terminal still shows
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "reload" => prefix.bright_magenta().bold().to_string(),
        "debug" => prefix.bright_cyan().bold().to_string(),
        "warning" | "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// timestamped status lines
// ============================================================================

/// Green check mark line.
pub fn status_success(message: &str) {
    status_line(&"✓".green().to_string(), message);
}

/// Yellow warning line.
pub fn status_warning(message: &str) {
    status_line(&"⚠".yellow().to_string(), message);
}

fn status_line(symbol: &str, message: &str) {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let clock = format!("[{}]", format_clock(secs));

    let mut out = stdout().lock();
    writeln!(out, "{} {symbol} {message}", clock.dimmed()).ok();
    out.flush().ok();
}

/// `HH:MM:SS` (UTC) for seconds since the epoch.
fn format_clock(secs: u64) -> String {
    let (hours, minutes, seconds) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3661), "01:01:01");
        // Wraps at midnight
        assert_eq!(format_clock(86400 + 59), "00:00:59");
    }

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_prefix_keeps_module_name() {
        assert!(colorize_prefix("Serve").contains("[Serve]"));
        assert!(colorize_prefix("custom").contains("[custom]"));
    }
}
