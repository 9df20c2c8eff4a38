use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Number of hex characters of the URL hash added to query-string file names
const QUERY_HASH_LEN: usize = 8;

/// Maps a URL to the local file its mirrored copy is written to
///
/// # Mapping Rules
///
/// 1. An empty path or a path ending in `/` gets `index.html` appended
/// 2. A final segment without a `.` is treated as a directory: `/index.html`
///    is appended
/// 3. A non-empty query string adds a `-<hash>` suffix to the file name,
///    before the extension if there is one. The hash is derived from the full
///    URL, so distinct queries on one path land in distinct files
/// 4. The leading `/` is dropped and the rest is joined onto `root`
///
/// Each segment is percent-decoded, so `/my%20logo.png` is written as
/// `my logo.png`. A segment that decodes to invalid UTF-8, a separator or a
/// dot segment keeps its encoded form. URL parsing has already removed dot
/// segments, so the result never leaves `root`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use url::Url;
/// use site_mirror::url::local_path;
///
/// let root = Path::new("/mirror/example.com");
/// let url = Url::parse("https://example.com/about").unwrap();
/// assert_eq!(local_path(root, &url), root.join("about").join("index.html"));
/// ```
pub fn local_path(root: &Path, url: &Url) -> PathBuf {
    let mut path = url.path().to_string();

    if path.is_empty() || path.ends_with('/') {
        path.push_str("index.html");
    }

    let base = path.rsplit('/').next().unwrap_or_default();
    if !base.contains('.') {
        path.push_str("/index.html");
    }

    if matches!(url.query(), Some(q) if !q.is_empty()) {
        path = with_hash_suffix(&path, &short_hash(url.as_str()));
    }

    let mut local = root.to_path_buf();
    for segment in path.trim_start_matches('/').split('/') {
        if !segment.is_empty() {
            local.push(&*decode_segment(segment));
        }
    }
    local
}

/// Percent-decodes one path segment, falling back to the raw text when the
/// decoded form is not a plain file name
fn decode_segment(segment: &str) -> Cow<'_, str> {
    match urlencoding::decode(segment) {
        Ok(decoded)
            if decoded != "."
                && decoded != ".."
                && !decoded.contains(['/', '\\', '\0']) =>
        {
            decoded
        }
        _ => Cow::Borrowed(segment),
    }
}

/// Computes the `/`-separated relative reference from `from_dir` to `to`
///
/// Both paths are expected to come from [`local_path`] with the same root.
/// File and directory names are percent-encoded again, so the reference
/// resolves back to the decoded name on disk. Returns None if they share no common prefix or either contains components
/// that cannot be expressed relatively.
pub fn relative_reference(from_dir: &Path, to: &Path) -> Option<String> {
    let from: Vec<Component> = from_dir.components().collect();
    let target: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return None;
    }

    let mut parts = Vec::new();
    for component in &from[common..] {
        match component {
            Component::Normal(_) => parts.push("..".to_string()),
            _ => return None,
        }
    }
    for component in &target[common..] {
        match component {
            Component::Normal(name) => {
                parts.push(urlencoding::encode(&name.to_string_lossy()).into_owned())
            }
            _ => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// First `QUERY_HASH_LEN` hex characters of SHA-256 over `input`
fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(QUERY_HASH_LEN);
    encoded
}

/// Inserts `-<hash>` before the extension of the last path segment
fn with_hash_suffix(path: &str, hash: &str) -> String {
    let (dir, file) = match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    };

    let file = match file.rfind('.') {
        Some(dot) => format!("{}-{}{}", &file[..dot], hash, &file[dot..]),
        None => format!("{}-{}", file, hash),
    };

    format!("{}{}", dir, file)
}
