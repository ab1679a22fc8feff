//! MIME inference from fragment paths.

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TABLE: &[(&str, &str)] = &[
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("css", "text/css"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("svg", "image/svg+xml"),
    ("wasm", "application/wasm"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

/// Look up the MIME type for a path by its extension.
pub fn lookup(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_CONTENT_TYPE,
    };
    TABLE
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Preferred file extension (with the dot) for a MIME type, or `""`.
pub fn extension(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence {
        "application/javascript" | "text/javascript" => ".js",
        "text/css" => ".css",
        "text/html" => ".html",
        "application/json" => ".json",
        "text/plain" => ".txt",
        "application/xml" => ".xml",
        "image/svg+xml" => ".svg",
        "application/wasm" => ".wasm",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("/srv/app/a.js"), "application/javascript");
        assert_eq!(lookup("styles/SITE.CSS"), "text/css");
        assert_eq!(lookup("index.html"), "text/html");
    }

    #[test]
    fn test_lookup_unknown_and_bare() {
        assert_eq!(lookup("README"), DEFAULT_CONTENT_TYPE);
        assert_eq!(lookup("archive.xyz"), DEFAULT_CONTENT_TYPE);
        assert_eq!(lookup("dir.d/.hidden"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("application/javascript"), ".js");
        assert_eq!(extension("text/css; charset=utf-8"), ".css");
        assert_eq!(extension(DEFAULT_CONTENT_TYPE), "");
    }
}
