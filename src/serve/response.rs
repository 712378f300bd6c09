//! HTTP responses.
//!
//! Every response built here carries the no-cache headers so the browser
//! always refetches after a reload.

use std::io;

use tiny_http::{Header, Request, Response, StatusCode};

use crate::utils::mime::types::PLAIN;

/// Cache-disabling headers attached to every non-upgrade response.
pub const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// A response waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// Plain-text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, PLAIN, body.into().into_bytes())
    }

    pub fn ok() -> Self {
        Self::text(200, "OK")
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::text(405, "Method Not Allowed")
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Write the response. For `HEAD` requests tiny_http drops the body
    /// but keeps `Content-Length`.
    pub fn send(self, request: Request) -> io::Result<()> {
        let mut response =
            Response::from_data(self.body).with_status_code(StatusCode(self.status));

        let headers = std::iter::once(("Content-Type", self.content_type))
            .chain(NO_CACHE_HEADERS)
            .filter_map(|(key, value)| make_header(key, value));
        for header in headers {
            response.add_header(header);
        }

        request.respond(response)
    }
}

/// Build a header, `None` if it is not valid ASCII.
pub fn make_header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_replies() {
        assert_eq!(Reply::ok().body(), b"OK");
        assert_eq!(Reply::not_found().status(), 404);

        let reply = Reply::method_not_allowed();
        assert_eq!(reply.status(), 405);
        assert_eq!(reply.body(), b"Method Not Allowed");
        assert_eq!(reply.content_type(), PLAIN);
    }

    #[test]
    fn test_make_header() {
        let header = make_header("Cache-Control", "no-store, must-revalidate").unwrap();
        assert!(header.field.equiv("cache-control"));
        assert_eq!(header.value.as_str(), "no-store, must-revalidate");

        assert!(make_header("Bäd", "x").is_none());
    }
}
