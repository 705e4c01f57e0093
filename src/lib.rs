//! # refbundle
//!
//! Resolve, dereference, and bundle `$ref` graphs across JSON and YAML
//! documents (JSON Schema, OpenAPI, or any JSON Reference graph).
//!
//! Given a root document named by a filesystem path or URL, the engine
//! produces one of four outputs:
//!
//! - [`parse`] — the root document as a single tree, `$ref` nodes intact.
//! - [`resolve`] — a [`Catalog`] mapping every transitively reachable
//!   document URL to its parsed contents.
//! - [`dereference`] — a tree in which every `$ref` has been replaced by
//!   its target. Shared targets stay shared (the output is an arena of
//!   nodes; sharing is node-id equality) and circular chains become
//!   back-edges.
//! - [`bundle`] — a single self-contained tree with every external target
//!   inlined under `#/definitions/<name>` and refs rewritten to local
//!   pointers.
//!
//! # Example
//!
//! ```no_run
//! use refbundle::{dereference, Options};
//!
//! let options = Options::default();
//! let out = dereference("specs/root.yaml", &options).unwrap();
//!
//! // Every $ref in the root is now expanded in place.
//! let tree = out.graph.to_value();
//! assert!(tree.get("$ref").is_none());
//!
//! // The catalog keeps per-document state and circular bookkeeping.
//! for url in out.catalog.paths(None) {
//!     println!("resolved {url}");
//! }
//! ```
//!
//! Documents are read through an ordered resolver registry (filesystem and
//! HTTP built in; HTTP behind the default-on `remote` feature) and parsed
//! through an ordered parser registry (YAML/JSON, text, binary). Both
//! registries accept caller-supplied entries through [`Options`].

mod bundle;
mod catalog;
mod crawl;
mod dereference;
mod error;
mod location;
mod options;
mod parser;
mod pointer;
mod resolver;

use serde_json::Value;

pub use bundle::{bundle, Bundled};
pub use catalog::{Catalog, DocumentEntry, DocumentStatus, PathType};
pub use crawl::{parse, resolve};
pub use dereference::{dereference, DerefGraph, Dereferenced, Node, NodeId};
pub use error::{Error, ParserError, ResolverError};
pub use options::{
    CircularPolicy, DereferenceOptions, HttpConfig, Options, ParseOptions, ParserConfig,
    ResolveOptions, ResolverConfig,
};
pub use parser::CustomParser;
pub use resolver::{CustomResolver, FileDescriptor};

/// Input to a top-level operation: a location string, or an already-parsed
/// value plus the base URL it should be considered to live at.
#[derive(Debug, Clone)]
pub enum Source {
    /// Filesystem path or URL of the root document.
    Location(String),
    /// An in-memory root document.
    Document {
        /// Location the value is treated as living at; relative `$ref`s
        /// resolve against it.
        base: String,
        value: Value,
    },
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Location(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Location(s)
    }
}

impl From<(&str, Value)> for Source {
    fn from((base, value): (&str, Value)) -> Self {
        Source::Document {
            base: base.to_string(),
            value,
        }
    }
}

impl From<(String, Value)> for Source {
    fn from((base, value): (String, Value)) -> Self {
        Source::Document { base, value }
    }
}
