//! Live reload client injection into served HTML.

use crate::embed::serve::{SCRIPT_PATH, script_tag};
use crate::utils::mime;

/// Inject the client script if live reload is on and the content is HTML.
pub fn maybe_inject_client(body: Vec<u8>, content_type: &str, live_reload: bool) -> Vec<u8> {
    if !live_reload || !mime::is_html(content_type) || references_client(&body) {
        return body;
    }
    inject_script(&body, script_tag().as_bytes())
}

/// Page already loads the client itself
fn references_client(content: &[u8]) -> bool {
    let needle = SCRIPT_PATH.as_bytes();
    content.windows(needle.len()).any(|w| w == needle)
}

/// Inject script before the last `</body>` tag
fn inject_script(content: &[u8], script: &[u8]) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + script.len());

    // Reverse search for </body> using byte windows
    if let Some(pos) = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        result.extend_from_slice(&content[..pos]);
        result.extend_from_slice(script);
        result.extend_from_slice(&content[pos..]);
        return result;
    }

    // No </body> found, append to end (browsers handle this gracefully)
    result.extend_from_slice(content);
    result.extend_from_slice(script);
    result
}
