//! `POST /debug` sink: pages send JSON, the terminal shows it.

use std::io::Read;

use super::error::RequestError;
use super::response::Reply;

/// Read a request body and process it.
pub fn receive(body: &mut dyn Read) -> Result<Reply, RequestError> {
    let mut buf = Vec::new();
    body.read_to_end(&mut buf)?;
    process(&buf)
}

/// Validate the JSON body and log it pretty-printed.
pub fn process(body: &[u8]) -> Result<Reply, RequestError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(RequestError::Malformed)?;
    let pretty = serde_json::to_string_pretty(&value)
        .map_err(|e| RequestError::Internal(e.to_string()))?;

    crate::log!("debug"; "message received:\n{}", pretty);
    Ok(Reply::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn test_valid_json() {
        let reply = process(br#"{"x":1}"#).unwrap();
        assert_eq!(reply.status(), 200);
        assert_eq!(reply.body(), b"OK");
    }

    #[test]
    fn test_invalid_json() {
        for body in [&b"not json"[..], b"", b"{\"x\":", b"\xff\xfe"] {
            let err = process(body).unwrap_err();
            assert!(matches!(err, RequestError::Malformed(_)));
            assert_eq!(err.into_reply(), Reply::text(400, "Invalid JSON"));
        }
    }

    #[test]
    fn test_any_json_value_accepted() {
        for body in [&b"[1,2,3]"[..], b"\"text\"", b"null", b" {\"nested\":{\"a\":[true]}} "] {
            assert_eq!(process(body).unwrap().status(), 200);
        }
    }

    #[test]
    fn test_read_failure_is_internal() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
            }
        }

        let err = receive(&mut Broken).unwrap_err();
        let reply = err.into_reply();
        assert_eq!(reply.status(), 500);
        assert_eq!(reply.body(), b"connection reset");

        let ok = receive(&mut Cursor::new(br#"{"x":1}"#.to_vec())).unwrap();
        assert_eq!(ok.status(), 200);
    }
}
