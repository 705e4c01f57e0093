//! Resolver registry: fetches raw bytes for a location.
//!
//! Candidates that declare they can read a file are tried in `order`; the
//! first successful read wins. The built-ins cover `file:` and `http(s):`
//! URLs; callers can add their own through
//! [`ResolveOptions::custom`](crate::options::ResolveOptions).

use tracing::debug;
use url::Url;

use crate::error::{Error, ResolverError};
use crate::location;
use crate::options::{Options, ResolveOptions};

/// Input to resolvers and parsers.
///
/// `data` is populated by the resolver that reads the file and consumed by
/// the parser that turns it into a value.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Absolute URL of the document (fragment already stripped).
    pub url: Url,
    /// Lowercased suffix of the path (`".yaml"`, `".json"`, `""`).
    pub extension: String,
    /// Raw bytes as read.
    pub data: Vec<u8>,
}

impl FileDescriptor {
    pub(crate) fn new(url: Url) -> Self {
        let extension = location::get_extension(url.as_str());
        Self {
            url,
            extension,
            data: Vec::new(),
        }
    }
}

/// A caller-supplied resolver.
///
/// Plain function pointers keep the options record `Clone` and keep resolver
/// selection data-driven, matching how the registry treats the built-ins.
#[derive(Debug, Clone, Copy)]
pub struct CustomResolver {
    /// Position in the registry; lower runs first.
    pub order: i32,
    /// Whether this resolver wants the file.
    pub can_read: fn(&FileDescriptor) -> bool,
    /// Fetch the file's bytes. Receives the resolve options so resolvers
    /// that run their own transport see `headers`, `timeout`, `redirects`,
    /// and `with_credentials`.
    pub read: fn(&FileDescriptor, &ResolveOptions) -> Result<Vec<u8>, ResolverError>,
}

enum Candidate<'a> {
    File,
    #[cfg(feature = "remote")]
    Http,
    Custom(&'a CustomResolver),
}

/// Read the descriptor's bytes through the registry, populating `data`.
///
/// # Errors
///
/// [`Error::UnmatchedResolver`] when no resolver wants the URL; otherwise
/// the last resolver failure, wrapped with the URL.
pub(crate) fn read(file: &mut FileDescriptor, options: &Options) -> Result<(), Error> {
    let mut candidates: Vec<(i32, Candidate)> = Vec::new();
    if file.url.scheme() == "file" {
        candidates.push((options.resolve.file.order, Candidate::File));
    }
    #[cfg(feature = "remote")]
    if matches!(file.url.scheme(), "http" | "https") {
        candidates.push((options.resolve.http.order, Candidate::Http));
    }
    for custom in &options.resolve.custom {
        if (custom.can_read)(file) {
            candidates.push((custom.order, Candidate::Custom(custom)));
        }
    }
    // Stable sort: equal orders keep registration order.
    candidates.sort_by_key(|(order, _)| *order);

    if candidates.is_empty() {
        return Err(Error::UnmatchedResolver {
            url: file.url.to_string(),
        });
    }

    let mut last_error = None;
    for (order, candidate) in &candidates {
        let result = match candidate {
            Candidate::File => read_file(&file.url),
            #[cfg(feature = "remote")]
            Candidate::Http => read_http(&file.url, options),
            Candidate::Custom(custom) => (custom.read)(file, &options.resolve),
        };
        match result {
            Ok(data) => {
                debug!(url = %file.url, order, bytes = data.len(), "resolved");
                file.data = data;
                return Ok(());
            }
            Err(err) => {
                debug!(url = %file.url, order, error = %err, "resolver failed");
                last_error = Some(err);
            }
        }
    }

    Err(Error::Resolver {
        url: file.url.to_string(),
        source: last_error.expect("at least one candidate ran"),
    })
}

fn read_file(url: &Url) -> Result<Vec<u8>, ResolverError> {
    let path = url.to_file_path().map_err(|_| ResolverError::NotAFile {
        url: url.to_string(),
    })?;
    if !path.exists() {
        return Err(ResolverError::FileNotFound { path });
    }
    std::fs::read(&path).map_err(|source| ResolverError::Read { path, source })
}

/// GET with manual redirect following so the chain can be reported.
#[cfg(feature = "remote")]
fn read_http(url: &Url, options: &Options) -> Result<Vec<u8>, ResolverError> {
    let http = &options.resolve.http;
    let client = reqwest::blocking::Client::builder()
        .timeout(http.timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|source| ResolverError::Network {
            url: url.to_string(),
            source,
        })?;

    let mut current = url.clone();
    let mut chain = vec![current.to_string()];
    loop {
        let mut request = client.get(current.as_str());
        for (name, value) in &http.headers {
            request = request.header(name, value);
        }
        let response = request.send().map_err(|source| ResolverError::Network {
            url: current.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ResolverError::MissingLocation {
                    url: current.to_string(),
                })?;
            let next = current
                .join(location)
                .map_err(|_| ResolverError::MissingLocation {
                    url: current.to_string(),
                })?;
            chain.push(next.to_string());
            if chain.len() as u32 - 1 > http.redirects {
                return Err(ResolverError::RedirectLimit {
                    limit: http.redirects,
                    chain,
                });
            }
            debug!(from = %current, to = %next, "following redirect");
            current = next;
            continue;
        }
        if status.as_u16() >= 400 {
            return Err(ResolverError::HttpStatus {
                url: current.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|source| ResolverError::Network {
                url: current.to_string(),
                source,
            })?;
        return Ok(bytes.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn file_resolver_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "type: object").unwrap();
        let url = Url::from_file_path(file.path()).unwrap();

        let mut descriptor = FileDescriptor::new(url);
        read(&mut descriptor, &Options::default()).unwrap();
        assert_eq!(descriptor.data, b"type: object");
    }

    #[test]
    fn missing_file_is_a_resolver_error() {
        let url = Url::parse("file:///no/such/file.yaml").unwrap();
        let mut descriptor = FileDescriptor::new(url);
        let err = read(&mut descriptor, &Options::default()).unwrap_err();
        match err {
            Error::Resolver { url, source } => {
                assert_eq!(url, "file:///no/such/file.yaml");
                assert!(matches!(source, ResolverError::FileNotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_scheme_is_unmatched() {
        let url = Url::parse("mem://host/doc.yaml").unwrap();
        let mut descriptor = FileDescriptor::new(url);
        let err = read(&mut descriptor, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::UnmatchedResolver { .. }));
    }

    static FIRST_CALLS: AtomicUsize = AtomicUsize::new(0);
    static SECOND_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn accepts_mem(file: &FileDescriptor) -> bool {
        file.url.scheme() == "mem"
    }

    fn failing_read(
        _file: &FileDescriptor,
        _resolve: &ResolveOptions,
    ) -> Result<Vec<u8>, ResolverError> {
        FIRST_CALLS.fetch_add(1, Ordering::SeqCst);
        Err(ResolverError::Custom {
            message: "backend offline".into(),
        })
    }

    fn succeeding_read(
        _file: &FileDescriptor,
        _resolve: &ResolveOptions,
    ) -> Result<Vec<u8>, ResolverError> {
        SECOND_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(b"{}".to_vec())
    }

    #[test]
    fn lower_order_is_consulted_first_and_error_falls_through() {
        let mut options = Options::default();
        options.resolve.custom.push(CustomResolver {
            order: 200,
            can_read: accepts_mem,
            read: succeeding_read,
        });
        options.resolve.custom.push(CustomResolver {
            order: 100,
            can_read: accepts_mem,
            read: failing_read,
        });

        let url = Url::parse("mem://host/doc.json").unwrap();
        let mut descriptor = FileDescriptor::new(url);
        read(&mut descriptor, &options).unwrap();

        // Order 100 ran (and failed) before order 200 produced the bytes.
        assert_eq!(FIRST_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(descriptor.data, b"{}");
    }

    fn credential_gated_read(
        _file: &FileDescriptor,
        resolve: &ResolveOptions,
    ) -> Result<Vec<u8>, ResolverError> {
        if resolve.http.with_credentials {
            Ok(br#"{"authed": true}"#.to_vec())
        } else {
            Err(ResolverError::Custom {
                message: "credentials required".into(),
            })
        }
    }

    #[test]
    fn custom_resolvers_see_the_credentials_flag() {
        let mut options = Options::default();
        options.resolve.http.with_credentials = true;
        options.resolve.custom.push(CustomResolver {
            order: 50,
            can_read: accepts_mem,
            read: credential_gated_read,
        });

        let url = Url::parse("mem://host/doc.json").unwrap();
        let mut descriptor = FileDescriptor::new(url);
        read(&mut descriptor, &options).unwrap();
        assert_eq!(descriptor.data, br#"{"authed": true}"#);

        options.resolve.http.with_credentials = false;
        let mut descriptor = FileDescriptor::new(Url::parse("mem://host/doc.json").unwrap());
        assert!(read(&mut descriptor, &options).is_err());
    }

    #[test]
    fn extension_comes_from_the_url_path() {
        let url = Url::parse("https://example.com/specs/Doc.YAML?v=2#/a").unwrap();
        let descriptor = FileDescriptor::new(url);
        assert_eq!(descriptor.extension, ".yaml");
    }
}
