//! End-to-end tests against a real server on a loopback port.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::time::Instant;

use tempfile::TempDir;
use tungstenite::Message;
use tungstenite::stream::MaybeTlsStream;

use super::*;
use super::relay::POLL_INTERVAL;
use crate::reload::ReloadMessage;
use crate::reload::types::ReloadSignal;

const INDEX: &str = "<html><body><h1>hello</h1></body></html>";
const NO_CACHE: [(&str, &str); 3] = [
    ("cache-control", "no-store, must-revalidate"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];
const TIMEOUT: Duration = Duration::from_secs(5);

struct HttpResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl HttpResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn site() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("index.html"), INDEX).unwrap();
    temp
}

fn config(root: &Path, live_reload: bool) -> Config {
    let mut config = Config::default();
    config.serve.root = root.to_path_buf();
    config.serve.interface = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.serve.port = 0;
    config.serve.open = false;
    config.reload.enable = live_reload;
    config
}

fn started(root: &Path, live_reload: bool) -> (Coordinator, SocketAddr) {
    let mut coordinator = Coordinator::new(config(root, live_reload));
    let addr = coordinator.start().unwrap();
    (coordinator, addr)
}

/// Minimal HTTP/1.1 client: one request per connection.
fn request(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> HttpResponse {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    write!(
        stream,
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .unwrap();
    stream.write_all(body).unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let mut lines = head.split("\r\n");

    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("malformed status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    HttpResponse {
        status,
        headers,
        body: raw[split + 4..].to_vec(),
    }
}

fn get(addr: SocketAddr, path: &str) -> HttpResponse {
    request(addr, "GET", path, b"")
}

fn assert_no_cache(response: &HttpResponse) {
    for (name, value) in NO_CACHE {
        assert_eq!(response.header(name), Some(value), "header {name}");
    }
}

type Socket = tungstenite::WebSocket<MaybeTlsStream<TcpStream>>;

fn connect_ws(addr: SocketAddr) -> Socket {
    let (socket, response) = tungstenite::connect(format!("ws://{addr}/__livereload")).unwrap();
    assert_eq!(response.status().as_u16(), 101);
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    }
    socket
}

/// Next text frame, skipping control frames.
fn next_text(socket: &mut Socket) -> String {
    loop {
        match socket.read().unwrap() {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

// ============================================================================
// static serving
// ============================================================================

#[test]
fn test_root_document_served_verbatim() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    let response = get(addr, "/");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, INDEX.as_bytes());
    assert!(response.header("content-type").unwrap().starts_with("text/html"));
    assert_no_cache(&response);
}

#[test]
fn test_missing_file_and_traversal_are_404() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    let missing = get(addr, "/nope.html");
    assert_eq!(missing.status, 404);
    assert_eq!(missing.text(), "404 Not Found");
    assert_no_cache(&missing);

    assert_eq!(get(addr, "/%2e%2e/%2e%2e/etc/passwd").status, 404);
}

#[test]
fn test_nested_file_with_query_and_encoding() {
    let temp = site();
    fs::create_dir(temp.path().join("my css")).unwrap();
    fs::write(temp.path().join("my css/site.css"), "body{}").unwrap();
    let (_coordinator, addr) = started(temp.path(), false);

    let response = get(addr, "/my%20css/site.css?v=3");
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "body{}");
    assert!(response.header("content-type").unwrap().starts_with("text/css"));
}

#[test]
fn test_directory_without_index_is_listed() {
    let temp = site();
    fs::create_dir(temp.path().join("assets")).unwrap();
    fs::write(temp.path().join("assets/a&b.css"), "").unwrap();
    let (_coordinator, addr) = started(temp.path(), true);

    let response = get(addr, "/assets");
    assert_eq!(response.status, 200);
    assert!(response.header("content-type").unwrap().starts_with("text/html"));
    assert_no_cache(&response);

    let page = response.text();
    assert!(page.contains("<a href=\"/assets/a%26b%2Ecss\">a&amp;b.css</a>"));
    assert!(page.contains(&crate::embed::serve::script_tag()));

    let file = get(addr, "/assets/a%26b%2Ecss");
    assert_eq!(file.status, 200);
}

#[test]
fn test_head_has_headers_without_body() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    let response = request(addr, "HEAD", "/", b"");
    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());
    assert_eq!(
        response.header("content-length"),
        Some(INDEX.len().to_string().as_str())
    );
    assert_no_cache(&response);
}

#[test]
fn test_other_methods_not_allowed() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    let delete = request(addr, "DELETE", "/", b"");
    assert_eq!(delete.status, 405);
    assert_eq!(delete.text(), "Method Not Allowed");
    assert_no_cache(&delete);

    assert_eq!(request(addr, "POST", "/index.html", b"{}").status, 405);
}

#[test]
fn test_html_gets_client_script_when_reload_enabled() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), true);

    let page = get(addr, "/").text();
    let tag = crate::embed::serve::script_tag();
    assert!(page.contains(&format!("{tag}</body>")));

    let script = get(addr, "/__livereload.js");
    assert_eq!(script.status, 200);
    assert!(script.text().contains("/__livereload"));
    assert!(script.header("content-type").unwrap().contains("javascript"));
}

#[test]
fn test_client_script_absent_when_reload_disabled() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    assert_eq!(get(addr, "/__livereload.js").status, 404);
    assert_eq!(get(addr, "/__livereload").status, 404);
}

#[test]
fn test_reload_endpoint_rejects_other_methods() {
    let temp = site();
    let (coordinator, addr) = started(temp.path(), true);

    for method in ["DELETE", "PUT", "POST"] {
        let response = request(addr, method, "/__livereload", b"");
        assert_eq!(response.status, 405, "{method}");
        assert_eq!(response.text(), "Method Not Allowed");
        assert_no_cache(&response);
    }

    // A plain GET is still answered as a failed upgrade
    assert_eq!(get(addr, "/__livereload").status, 400);
    assert!(coordinator.broadcaster().is_empty());
}

// ============================================================================
// /debug
// ============================================================================

#[test]
fn test_debug_accepts_valid_json() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    let response = request(addr, "POST", "/debug", br#"{"x":1}"#);
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "OK");
    assert_no_cache(&response);
}

#[test]
fn test_debug_rejects_malformed_json() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), false);

    let response = request(addr, "POST", "/debug", b"not json");
    assert_eq!(response.status, 400);
    assert_eq!(response.text(), "Invalid JSON");
}

// ============================================================================
// live reload
// ============================================================================

#[test]
fn test_only_relevant_changes_signal_once() {
    let temp = site();
    let (coordinator, _addr) = started(temp.path(), true);
    let client = coordinator.broadcaster().register();
    let window = coordinator.config().debounce();

    fs::write(temp.path().join("notes.txt"), "draft").unwrap();
    assert!(client.recv_timeout(window + POLL_INTERVAL * 3).is_err());

    fs::write(temp.path().join("style.css"), "body{color:red}").unwrap();
    assert!(client.recv_timeout(TIMEOUT).is_ok());
    // Follow-up events of the same write fall inside the window
    assert!(client.recv_timeout(window + POLL_INTERVAL).is_err());
}

#[test]
fn test_websocket_session_lifecycle() {
    let temp = site();
    let (mut coordinator, addr) = started(temp.path(), true);

    let mut socket = connect_ws(addr);
    let hello = ReloadMessage::from_json(&next_text(&mut socket)).unwrap();
    assert!(matches!(hello, ReloadMessage::Connected { .. }));
    assert_eq!(coordinator.broadcaster().len(), 1);

    assert_eq!(coordinator.broadcaster().broadcast(ReloadSignal::now()), 1);
    assert_eq!(
        ReloadMessage::from_json(&next_text(&mut socket)).unwrap(),
        ReloadMessage::Reload
    );

    coordinator.shutdown();
    assert!(coordinator.broadcaster().is_empty());

    // Server closes the channel with a close frame
    let frame = loop {
        match socket.read() {
            Ok(Message::Ping(_)) => continue,
            other => break other,
        }
    };
    assert!(matches!(frame, Ok(Message::Close(_))), "got {frame:?}");
}

#[test]
fn test_file_change_reaches_websocket_client() {
    let temp = site();
    let (_coordinator, addr) = started(temp.path(), true);

    let mut socket = connect_ws(addr);
    next_text(&mut socket);

    fs::write(temp.path().join("app.js"), "console.log(2)").unwrap();
    assert_eq!(
        ReloadMessage::from_json(&next_text(&mut socket)).unwrap(),
        ReloadMessage::Reload
    );
}

// ============================================================================
// lifecycle
// ============================================================================

#[test]
fn test_state_transitions_and_second_run() {
    let temp = site();
    let mut coordinator = Coordinator::new(config(temp.path(), true));
    assert_eq!(coordinator.state(), ServerState::Stopped);
    assert_eq!(coordinator.addr(), None);

    let addr = coordinator.start().unwrap();
    assert_eq!(coordinator.state(), ServerState::Running);
    assert_eq!(coordinator.addr(), Some(addr));
    assert!(matches!(
        coordinator.start(),
        Err(ServeError::InvalidState { state: ServerState::Running, .. })
    ));

    coordinator.shutdown();
    assert_eq!(coordinator.state(), ServerState::Stopped);
    let addr = coordinator.start().unwrap();
    assert_eq!(coordinator.state(), ServerState::Running);
    assert_eq!(get(addr, "/").status, 200);

    coordinator.shutdown();
    coordinator.shutdown();
    assert_eq!(coordinator.state(), ServerState::Stopped);
    assert_eq!(coordinator.addr(), None);
}

#[test]
fn test_wait_returns_after_trigger() {
    let temp = site();
    let (mut coordinator, _addr) = started(temp.path(), true);
    let trigger = coordinator.shutdown_trigger();

    let fired = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        trigger.fire()
    });

    let began = Instant::now();
    coordinator.wait();
    assert!(fired.join().unwrap());
    assert_eq!(coordinator.state(), ServerState::Stopped);
    assert!(began.elapsed() < SHUTDOWN_TIMEOUT * 3);
}

#[test]
fn test_invalid_root_fails_at_start() {
    let temp = TempDir::new().unwrap();
    let mut coordinator = Coordinator::new(config(&temp.path().join("missing"), true));

    assert!(matches!(coordinator.start(), Err(ServeError::Root(_))));
    assert_eq!(coordinator.state(), ServerState::Stopped);

    fs::write(temp.path().join("file"), "x").unwrap();
    let mut coordinator = Coordinator::new(config(&temp.path().join("file"), false));
    assert!(matches!(coordinator.start(), Err(ServeError::Root(_))));
}

#[test]
fn test_invalid_watch_root_rolls_back() {
    let temp = site();
    let mut config = config(temp.path(), true);
    config.reload.root = Some(temp.path().join("missing"));
    let mut coordinator = Coordinator::new(config);

    assert!(matches!(coordinator.start(), Err(ServeError::WatchRoot(_))));
    assert_eq!(coordinator.state(), ServerState::Stopped);
    assert_eq!(coordinator.addr(), None);
}

#[test]
fn test_port_fallback_when_taken() {
    let temp = site();
    let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = taken.local_addr().unwrap().port();

    let mut config = config(temp.path(), false);
    config.serve.port = port;
    let mut coordinator = Coordinator::new(config);

    let addr = coordinator.start().unwrap();
    assert_ne!(addr.port(), port);
    assert_eq!(get(addr, "/").status, 200);
}

#[test]
fn test_not_degraded_while_healthy() {
    let temp = site();
    let (coordinator, _addr) = started(temp.path(), true);
    assert!(!coordinator.is_reload_degraded());
}
