//! Error types for reference resolution, parsing, and dereferencing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the resolver registry while fetching document bytes.
#[derive(Debug, Error)]
pub enum ResolverError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} is not a local file")]
    NotAFile { url: String },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[cfg(feature = "remote")]
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[cfg(feature = "remote")]
    #[error("redirect from {url} carries no Location header")]
    MissingLocation { url: String },

    #[cfg(feature = "remote")]
    #[error("exceeded {limit} redirects: {}", chain.join(" -> "))]
    RedirectLimit { limit: u32, chain: Vec<String> },

    /// Reported by caller-supplied resolvers.
    #[error("{message}")]
    Custom { message: String },
}

/// Errors raised by the parser registry while turning bytes into a value.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("invalid JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    Yaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("empty document")]
    Empty,

    #[error("contents are not valid UTF-8")]
    Utf8,

    /// Reported by caller-supplied parsers.
    #[error("{message}")]
    Custom { message: String },
}

/// Top-level error type for every engine operation.
///
/// Resolver and parser failures are wrapped with the offending URL so the
/// cause chain always names the document that failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error resolving {url}: {source}")]
    Resolver {
        url: String,
        #[source]
        source: ResolverError,
    },

    #[error("error parsing {url}: {source}")]
    Parser {
        url: String,
        #[source]
        source: ParserError,
    },

    #[error("no resolver matched {url}")]
    UnmatchedResolver { url: String },

    #[error("no parser could handle {url}")]
    UnmatchedParser { url: String },

    #[error("token \"{token}\" of pointer \"{pointer}\" not found in {url}")]
    MissingPointer {
        url: String,
        pointer: String,
        token: String,
    },

    #[error("invalid JSON pointer \"{pointer}\": {reason}")]
    InvalidPointer { pointer: String, reason: String },

    #[error("circular $ref at {pointer} targeting {target}")]
    Circular { pointer: String, target: String },

    #[error("invalid URL \"{input}\": {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

impl Error {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Resolver { .. } | Error::UnmatchedResolver { .. } => 3, // IO
            // A structurally valid document rejected under the circular
            // policy, not a parse defect.
            Error::Circular { .. } => 1,
            _ => 2, // parse / pointer error
        }
    }
}
