//! Typed options record for parse, resolve, dereference, and bundle.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::parser::CustomParser;
use crate::resolver::CustomResolver;

/// Default timeout for HTTP requests (10 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum number of HTTP redirects to follow.
const HTTP_REDIRECTS: u32 = 5;

/// Per-parser configuration shared by the built-in parsers.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Position in the registry; lower runs first.
    pub order: i32,
    /// Whether a zero-byte document is acceptable.
    pub allow_empty: bool,
}

/// Configuration of the parser registry.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// YAML/JSON parser (`.yaml`, `.yml`, `.json`).
    pub yaml: ParserConfig,
    /// Plain-text parser for known text extensions.
    pub text: ParserConfig,
    /// Binary fallback parser.
    pub binary: ParserConfig,
    /// Caller-supplied parsers, matched alongside the built-ins.
    pub custom: Vec<CustomParser>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            yaml: ParserConfig {
                order: 100,
                allow_empty: true,
            },
            text: ParserConfig {
                order: 300,
                allow_empty: true,
            },
            binary: ParserConfig {
                order: 400,
                allow_empty: true,
            },
            custom: Vec::new(),
        }
    }
}

/// Per-resolver configuration shared by the built-in resolvers.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Position in the registry; lower runs first.
    pub order: i32,
}

/// HTTP resolver configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub order: i32,
    /// Extra request headers sent with every GET.
    pub headers: Vec<(String, String)>,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of redirects to follow before failing.
    pub redirects: u32,
    /// Credentials flag, handed to caller-supplied resolvers through their
    /// `read` options argument; the built-in resolver keeps no ambient
    /// credentials to toggle.
    pub with_credentials: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            order: 200,
            headers: Vec::new(),
            timeout: HTTP_TIMEOUT,
            redirects: HTTP_REDIRECTS,
            with_credentials: false,
        }
    }
}

/// Configuration of the resolver registry.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// When false, `$ref`s to other documents are left untouched and only
    /// the root document is resolved.
    pub external: bool,
    /// Filesystem resolver.
    pub file: ResolverConfig,
    /// HTTP(S) resolver.
    pub http: HttpConfig,
    /// Caller-supplied resolvers, matched alongside the built-ins.
    pub custom: Vec<CustomResolver>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            external: true,
            file: ResolverConfig { order: 100 },
            http: HttpConfig::default(),
            custom: Vec::new(),
        }
    }
}

/// What the dereferencer does when a `$ref` re-enters a node currently on
/// its traversal stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularPolicy {
    /// Emit a shared back-edge to the in-progress node.
    #[default]
    Share,
    /// Fail the whole operation.
    Error,
    /// Leave the `$ref` node in place.
    Ignore,
}

/// Configuration of the dereferencer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DereferenceOptions {
    pub circular: CircularPolicy,
}

/// Options for a top-level operation.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub parse: ParseOptions,
    pub resolve: ResolveOptions,
    pub dereference: DereferenceOptions,
    /// Attach non-fatal errors to the catalog entry and keep going instead
    /// of failing on the first one. The root document must still resolve.
    pub continue_on_error: bool,
    /// Working directory for relative locations, as a `file:` URL ending in
    /// `/`. Defaults to the process working directory.
    pub cwd: Option<Url>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the circular-reference policy.
    pub fn circular(mut self, policy: CircularPolicy) -> Self {
        self.dereference.circular = policy;
        self
    }

    /// Set whether external documents are resolved.
    pub fn external(mut self, external: bool) -> Self {
        self.resolve.external = external;
        self
    }

    /// Set the working directory used for relative locations.
    pub fn cwd(mut self, cwd: Url) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Aggregate non-fatal errors instead of failing fast.
    pub fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }
}
