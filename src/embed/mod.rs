//! Embedded static resources.
//!
//! Only the dev server assets live here: the live reload client script and
//! the URLs it is reached through.

pub mod serve {
    use std::sync::LazyLock;

    /// WebSocket endpoint the client script connects to.
    pub const WS_PATH: &str = "/__livereload";

    /// URL the client script is served from.
    pub const SCRIPT_PATH: &str = "/__livereload.js";

    const LIVERELOAD_SOURCE: &str = include_str!("serve/livereload.js");
    const WS_PATH_PLACEHOLDER: &str = "__HOTSERVE_WS_PATH__";

    /// Live reload client: reloads on `reload`, reconnects with backoff.
    pub static LIVERELOAD_JS: LazyLock<String> = LazyLock::new(|| livereload_js(WS_PATH));

    /// Client script pointed at `ws_path`.
    pub fn livereload_js(ws_path: &str) -> String {
        LIVERELOAD_SOURCE.replace(WS_PATH_PLACEHOLDER, ws_path)
    }

    /// `<script>` tag injected into served HTML.
    pub fn script_tag() -> String {
        format!(r#"<script src="{SCRIPT_PATH}"></script>"#)
    }
}
