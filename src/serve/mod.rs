//! Static file server with live reload injection.
//!
//! # Module Structure
//!
//! ```text
//! serve/
//! ├── content.rs    # <script> injection into HTML
//! ├── debug.rs      # POST /debug
//! ├── error.rs      # RequestError → status code
//! ├── listing.rs    # HTML index for directories
//! ├── path.rs       # URL → file under the served root
//! ├── response.rs   # Reply + no-cache headers
//! └── websocket.rs  # /__livereload sessions
//! ```
//!
//! The accept loop handles WebSocket upgrades itself and hands every other
//! request to a small `rayon` pool.

mod content;
mod debug;
mod error;
mod listing;
mod path;
mod response;
mod websocket;

pub use error::RequestError;
pub use response::Reply;
pub use websocket::SessionSet;

use std::any::Any;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use tiny_http::{Method, Request, Server};

use self::path::Target;
use crate::embed::serve::{LIVERELOAD_JS, SCRIPT_PATH};
use crate::reload::ReloadBroadcaster;
use crate::log;
use crate::utils::mime;

/// Everything a request handler needs, shared across the pool.
pub struct ServeContext {
    /// Canonical served root
    pub root: PathBuf,
    pub index: String,
    pub live_reload: bool,
    pub broadcaster: Arc<ReloadBroadcaster>,
    pub sessions: SessionSet,
}

/// Accept requests until the server is unblocked.
pub fn run_request_loop(server: &Server, ctx: &Arc<ServeContext>, pool: &rayon::ThreadPool) {
    for request in server.incoming_requests() {
        if ctx.live_reload && websocket::is_endpoint(&request) {
            websocket::accept(request, ctx);
            continue;
        }

        let ctx = Arc::clone(ctx);
        pool.spawn(move || handle_request(request, &ctx));
    }
    crate::debug!("serve"; "request loop finished");
}

/// Handle a single HTTP request. Never panics past this point.
fn handle_request(mut request: Request, ctx: &ServeContext) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let result = catch_unwind(AssertUnwindSafe(|| route(&mut request, ctx)))
        .unwrap_or_else(|payload| Err(RequestError::Internal(panic_message(&*payload))));

    let reply = match result {
        Ok(reply) => reply,
        Err(e) if e.is_client_error() => {
            crate::debug!("serve"; "{} {}: {:?}", method, url, e);
            e.into_reply()
        }
        Err(e) => {
            log!("serve"; "{} {}: {}", method, url, e);
            e.into_reply()
        }
    };

    crate::debug!("serve"; "{} {} -> {}", method, url, reply.status());
    if let Err(e) = reply.send(request) {
        crate::debug!("serve"; "failed to send response: {}", e);
    }
}

fn route(request: &mut Request, ctx: &ServeContext) -> Result<Reply, RequestError> {
    let method = request.method().clone();
    let path = path::url_path(request.url()).to_string();

    match method {
        Method::Get | Method::Head if ctx.live_reload && path == SCRIPT_PATH => {
            let js = LIVERELOAD_JS.as_bytes().to_vec();
            Ok(Reply::new(200, mime::types::JAVASCRIPT, js))
        }
        Method::Post if path == "/debug" => debug::receive(request.as_reader()),
        Method::Get | Method::Head => serve_file(request.url(), ctx),
        _ => Ok(Reply::method_not_allowed()),
    }
}

fn serve_file(url: &str, ctx: &ServeContext) -> Result<Reply, RequestError> {
    let (content_type, body) = match path::resolve_path(url, &ctx.root, &ctx.index) {
        Some(Target::File(file)) => (mime::from_path(&file), fs::read(&file)?),
        Some(Target::Listing(dir)) => {
            let html = listing::render(&dir, &ctx.root)?;
            (mime::types::HTML, html.into_bytes())
        }
        None => return Ok(Reply::not_found()),
    };

    let body = content::maybe_inject_client(body, content_type, ctx.live_reload);

    Ok(Reply::new(200, content_type, body))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "request handler panicked".to_string())
}
