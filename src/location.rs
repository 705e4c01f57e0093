//! Location parsing and URL normalization.
//!
//! Accepts filesystem paths (including Windows drive letters and UNC paths),
//! `file:` URLs, `http(s):` URLs, and bare `#` fragments, and normalizes them
//! to absolute [`Url`]s. Relative inputs are joined against a working
//! directory expressed as a `file:` URL ending in `/`.

use url::Url;

use crate::error::Error;

/// Check if a string looks like an HTTP(S) URL.
pub fn is_http(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Check if a string is a filesystem path rather than a URL.
///
/// Anything without a scheme is a path, as are `file:` URLs and Windows
/// drive-letter paths (a single letter followed by `:` is a drive, not a
/// scheme).
pub fn is_filesystem_path(s: &str) -> bool {
    if is_windows_drive_path(s) || s.starts_with(r"\\") {
        return true;
    }
    match s.split_once(':') {
        Some((scheme, _)) => {
            !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                || scheme.is_empty()
                || scheme.eq_ignore_ascii_case("file")
        }
        None => true,
    }
}

fn is_windows_drive_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/' || bytes[2] == b'\\')
}

/// The current working directory as a `file:` URL ending in `/`.
pub fn cwd_url() -> Result<Url, Error> {
    let dir = std::env::current_dir().map_err(|_| Error::InvalidUrl {
        input: ".".into(),
        source: url::ParseError::RelativeUrlWithoutBase,
    })?;
    Url::from_directory_path(&dir).map_err(|_| Error::InvalidUrl {
        input: dir.display().to_string(),
        source: url::ParseError::RelativeUrlWithoutBase,
    })
}

/// Parse a location string into an absolute URL.
///
/// Relative paths and bare fragments are joined against `cwd`. Windows
/// drive-letter paths become `file:///C:/...`; backslash separators are
/// normalized to `/`. Percent-encoding already present on the path is
/// preserved.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] when the input cannot be turned into an
/// absolute URL.
pub fn parse_location(s: &str, cwd: &Url) -> Result<Url, Error> {
    if is_http(s) {
        return Url::parse(s).map_err(|source| Error::InvalidUrl {
            input: s.to_string(),
            source,
        });
    }
    if s.starts_with("file:") {
        return Url::parse(s).map_err(|source| Error::InvalidUrl {
            input: s.to_string(),
            source,
        });
    }
    if is_windows_drive_path(s) {
        let forward = s.replace('\\', "/");
        let input = format!("file:///{forward}");
        return Url::parse(&input).map_err(|source| Error::InvalidUrl {
            input: s.to_string(),
            source,
        });
    }
    if let Some(unc) = s.strip_prefix(r"\\") {
        // UNC path: \\server\share\doc.yaml -> file://server/share/doc.yaml
        let input = format!("file://{}", unc.replace('\\', "/"));
        return Url::parse(&input).map_err(|source| Error::InvalidUrl {
            input: s.to_string(),
            source,
        });
    }
    // Relative path, absolute POSIX path, or bare fragment.
    cwd.join(s).map_err(|source| Error::InvalidUrl {
        input: s.to_string(),
        source,
    })
}

/// RFC 3986 reference resolution of `reference` against `base`.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, Error> {
    if is_windows_drive_path(reference) {
        let forward = reference.replace('\\', "/");
        let input = format!("file:///{forward}");
        return Url::parse(&input).map_err(|source| Error::InvalidUrl {
            input: reference.to_string(),
            source,
        });
    }
    base.join(reference).map_err(|source| Error::InvalidUrl {
        input: reference.to_string(),
        source,
    })
}

/// Returns the `#...` tail of a location, or `"#"` if it has none.
pub fn get_hash(s: &str) -> &str {
    match s.find('#') {
        Some(idx) => &s[idx..],
        None => "#",
    }
}

/// Returns everything before the `#`.
pub fn strip_hash(s: &str) -> &str {
    match s.find('#') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

/// The canonical form of a URL: serialized without its fragment.
///
/// This is the key used by the document catalog; two URLs that differ only
/// in fragment address the same document.
pub fn canonical(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.to_string()
}

/// Lowercased suffix of the path segment (`".yaml"`, `".json"`, `""`).
///
/// Query and fragment are ignored.
pub fn get_extension(s: &str) -> String {
    let path = strip_hash(s);
    let path = match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    };
    let segment = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match segment.rfind('.') {
        Some(idx) if idx > 0 => segment[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Split an absolute target URL into its canonical document URL and its
/// fragment pointer (without the leading `#`, empty when absent).
pub fn split_fragment(url: &Url) -> (String, String) {
    let fragment = url.fragment().unwrap_or("").to_string();
    (canonical(url), fragment)
}
