//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// What a request URL maps to under the served root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    /// Directory without an index document
    Listing(PathBuf),
}

/// Resolve URL to a file under `serve_root`, serving `index` for directories.
///
/// `serve_root` must already be canonical. Returns `None` for anything that
/// does not exist or escapes the root.
pub fn resolve_path(url: &str, serve_root: &Path, index: &str) -> Option<Target> {
    let clean = normalize_url(url)?;

    // Reject traversal segments early
    if clean.split(['/', '\\']).any(|segment| segment == "..") {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    if !canonical.starts_with(serve_root) {
        return None;
    }

    if canonical.is_file() {
        return Some(Target::File(canonical));
    }

    if canonical.is_dir() {
        let index = canonical.join(index);
        if index.is_file() {
            return Some(Target::File(index));
        }
        return Some(Target::Listing(canonical));
    }

    None
}

/// Path component of a request URL, without query string or fragment.
pub fn url_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Normalize URL: strip query string, decode, trim slashes.
///
/// `None` when the path does not decode to valid UTF-8.
fn normalize_url(url: &str) -> Option<String> {
    let decoded = percent_decode_str(url_path(url)).decode_utf8().ok()?;
    Some(decoded.trim_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site");
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.join("docs/index.html"), "<h1>docs</h1>").unwrap();
        fs::write(root.join("my page.html"), "spaced").unwrap();
        fs::write(temp.path().join("secret.txt"), "nope").unwrap();
        let root = root.canonicalize().unwrap();
        (temp, root)
    }

    #[test]
    fn test_root_serves_index() {
        let (_temp, root) = site();
        assert_eq!(
            resolve_path("/", &root, "index.html"),
            Some(Target::File(root.join("index.html")))
        );
    }

    #[test]
    fn test_directory_serves_index() {
        let (_temp, root) = site();
        let expected = Some(Target::File(root.join("docs/index.html")));
        assert_eq!(resolve_path("/docs", &root, "index.html"), expected);
        assert_eq!(resolve_path("/docs/", &root, "index.html"), expected);
    }

    #[test]
    fn test_directory_without_index_is_listed() {
        let (_temp, root) = site();
        let expected = Some(Target::Listing(root.join("empty")));
        assert_eq!(resolve_path("/empty", &root, "index.html"), expected);
        assert_eq!(resolve_path("/empty/", &root, "index.html"), expected);
        assert_eq!(
            resolve_path("/", &root, "missing.html"),
            Some(Target::Listing(root.clone()))
        );
    }

    #[test]
    fn test_custom_index() {
        let (_temp, root) = site();
        fs::write(root.join("home.html"), "home").unwrap();
        assert_eq!(
            resolve_path("/", &root, "home.html"),
            Some(Target::File(root.join("home.html")))
        );
    }

    #[test]
    fn test_query_and_encoding() {
        let (_temp, root) = site();
        assert_eq!(
            resolve_path("/index.html?v=3", &root, "index.html"),
            Some(Target::File(root.join("index.html")))
        );
        assert_eq!(
            resolve_path("/my%20page.html", &root, "index.html"),
            Some(Target::File(root.join("my page.html")))
        );
        assert_eq!(resolve_path("/%FF%FE", &root, "index.html"), None);
    }

    #[test]
    fn test_traversal_rejected() {
        let (_temp, root) = site();
        assert_eq!(resolve_path("/../secret.txt", &root, "index.html"), None);
        assert_eq!(resolve_path("/%2e%2e/secret.txt", &root, "index.html"), None);
        assert_eq!(resolve_path("/docs/../../secret.txt", &root, "index.html"), None);
    }

    #[test]
    fn test_missing_file() {
        let (_temp, root) = site();
        assert_eq!(resolve_path("/nope.css", &root, "index.html"), None);
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("/debug?x=1"), "/debug");
        assert_eq!(url_path("/__livereload"), "/__livereload");
        assert_eq!(url_path("/a#frag"), "/a");
    }
}
