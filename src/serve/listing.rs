//! HTML index for directories without an index document.

use std::fs;
use std::io;
use std::path::Path;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::utils::html::escape;

struct Entry {
    name: String,
    is_dir: bool,
}

/// Render the entries of `dir`, which must lie under the canonical `root`.
///
/// Links are absolute, so the page works with or without a trailing slash
/// in the request URL.
pub fn render(dir: &Path, root: &Path) -> io::Result<String> {
    let segments: Vec<String> = dir
        .strip_prefix(root)
        .unwrap_or(Path::new(""))
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let mut entries = read_entries(dir)?;
    entries.sort_by_cached_key(|entry| entry.name.to_lowercase());

    let shown: String = segments.iter().map(|s| format!("{s}/")).collect();
    let title = escape(&format!("Index of /{shown}")).into_owned();

    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );

    if let Some((_, parent)) = segments.split_last() {
        html.push_str(&format!("<li><a href=\"{}\">../</a></li>\n", href(parent)));
    }

    let base = href(&segments);
    for entry in &entries {
        let encoded = utf8_percent_encode(&entry.name, NON_ALPHANUMERIC);
        let slash = if entry.is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{base}{encoded}{slash}\">{}{slash}</a></li>\n",
            escape(&entry.name)
        ));
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(html)
}

fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let entries = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            // Follows symlinks, like the file lookup does
            is_dir: entry.path().is_dir(),
        })
        .collect();
    Ok(entries)
}

/// `/a/b/` with every segment percent-encoded.
fn href(segments: &[String]) -> String {
    let mut out = String::from("/");
    for segment in segments {
        out.extend(utf8_percent_encode(segment, NON_ALPHANUMERIC));
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root() -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        (temp, root)
    }

    #[test]
    fn test_root_listing() {
        let (_temp, root) = root();
        fs::write(root.join("b.css"), "").unwrap();
        fs::write(root.join("A.html"), "").unwrap();
        fs::create_dir(root.join("assets")).unwrap();

        let html = render(&root, &root).unwrap();
        assert!(html.contains("<title>Index of /</title>"));
        assert!(!html.contains("../"));

        let a = html.find(">A.html<").unwrap();
        let assets = html.find(">assets/<").unwrap();
        let b = html.find(">b.css<").unwrap();
        assert!(a < assets && assets < b);
        assert!(html.contains("<a href=\"/assets/\">assets/</a>"));
        assert!(html.contains("<a href=\"/b%2Ecss\">b.css</a>"));
    }

    #[test]
    fn test_nested_listing_escapes_names() {
        let (_temp, root) = root();
        let dir = root.join("my docs");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("<b>&.txt"), "").unwrap();

        let html = render(&dir, &root).unwrap();
        assert!(html.contains("<h1>Index of /my docs/</h1>"));
        assert!(html.contains("<a href=\"/\">../</a>"));
        assert!(html.contains(
            "<a href=\"/my%20docs/%3Cb%3E%26%2Etxt\">&lt;b&gt;&amp;.txt</a>"
        ));
        assert!(!html.contains("<b>&"));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let (_temp, root) = root();
        assert!(render(&root.join("gone"), &root).is_err());
    }
}
