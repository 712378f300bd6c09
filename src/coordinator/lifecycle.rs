//! Server lifecycle helpers.

use std::net::{IpAddr, SocketAddr};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tiny_http::Server;

use super::ServeError;
use crate::log;

/// Maximum number of port binding attempts.
pub const MAX_PORT_RETRIES: u32 = 10;

/// Poll step while waiting for a thread to finish.
const JOIN_POLL: Duration = Duration::from_millis(50);

/// Bind to `interface:port`, falling back to an OS-assigned port.
///
/// The first attempt uses the configured port; every retry asks for port 0.
pub fn bind_with_retry(interface: IpAddr, port: u16) -> Result<(Server, SocketAddr), ServeError> {
    let mut last_error = None;

    for attempt in 0..MAX_PORT_RETRIES {
        let requested = if attempt == 0 { port } else { 0 };
        let addr = SocketAddr::new(interface, requested);

        match Server::http(addr) {
            Ok(server) => {
                let bound = server.server_addr().to_ip().unwrap_or(addr);
                if fell_back(port, requested) {
                    log!("serve"; "port {} in use, using {} instead", port, bound.port());
                }
                return Ok((server, bound));
            }
            Err(e) => {
                crate::debug!("serve"; "bind {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(ServeError::Bind {
        interface,
        attempts: MAX_PORT_RETRIES,
        source: last_error.unwrap_or_else(|| "no bind attempt made".into()),
    })
}

/// A specific port was asked for and a retry had to take another one.
fn fell_back(port: u16, requested: u16) -> bool {
    port != 0 && requested != port
}

/// Join `handle` if it finishes within `timeout`.
///
/// Returns `false` and leaves the thread detached otherwise.
pub fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if handle.is_finished() {
            let _ = handle.join();
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpListener};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn test_bind_any_port() {
        let (_server, addr) = bind_with_retry(LOCALHOST, 0).unwrap();
        assert_eq!(addr.ip(), LOCALHOST);
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_bind_falls_back_when_port_taken() {
        let taken = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        let (_server, addr) = bind_with_retry(LOCALHOST, port).unwrap();
        assert_ne!(addr.port(), port);
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_fallback_only_for_explicit_port() {
        assert!(fell_back(8080, 0));
        assert!(!fell_back(8080, 8080));
        // Port 0 retries stay on port 0: nothing to report
        assert!(!fell_back(0, 0));
    }

    #[test]
    fn test_join_with_timeout() {
        let quick = thread::spawn(|| {});
        assert!(join_with_timeout(quick, Duration::from_secs(2)));

        let slow = thread::spawn(|| thread::sleep(Duration::from_millis(400)));
        assert!(!join_with_timeout(slow, Duration::from_millis(60)));
    }
}
