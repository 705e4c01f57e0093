//! Crawler: discovers `$ref` targets and reads documents to fixpoint.
//!
//! Traversal is depth-first in document order. Each newly discovered
//! document URL gets a pending catalog entry before its read starts, so
//! repeat discoveries of the same URL share the entry and every document is
//! read at most once.

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::{ref_target, Catalog};
use crate::error::Error;
use crate::location;
use crate::options::Options;
use crate::parser;
use crate::resolver::{self, FileDescriptor};
use crate::Source;

/// Parse the root document and return its value, `$ref` nodes intact.
///
/// No external document is touched; the catalog identifies exactly one
/// resolved document, the root.
///
/// # Errors
///
/// Any resolver or parser failure on the root document.
pub fn parse(src: impl Into<Source>, options: &Options) -> Result<Value, Error> {
    let catalog = bootstrap(src.into(), options)?;
    let root = catalog.root().to_string();
    Ok(catalog
        .get(&root)
        .cloned()
        .unwrap_or(Value::Null))
}

/// Resolve the root document and everything transitively reachable from it.
///
/// # Errors
///
/// The first resolver/parser failure, unless `continue_on_error` parks
/// failures on their catalog entries instead.
pub fn resolve(src: impl Into<Source>, options: &Options) -> Result<Catalog, Error> {
    resolve_catalog(src.into(), options)
}

pub(crate) fn resolve_catalog(src: Source, options: &Options) -> Result<Catalog, Error> {
    let mut catalog = bootstrap(src, options)?;
    let root = catalog.root().to_string();
    crawl_document(&mut catalog, options, &root)?;
    Ok(catalog)
}

/// Create the catalog and resolve the root entry. The root must resolve
/// even under `continue_on_error`.
fn bootstrap(src: Source, options: &Options) -> Result<Catalog, Error> {
    let cwd = match &options.cwd {
        Some(cwd) => cwd.clone(),
        None => location::cwd_url()?,
    };
    match src {
        Source::Location(s) => {
            let url = location::parse_location(&s, &cwd)?;
            let mut catalog = Catalog::new(&url);
            let canonical = location::canonical(&url);
            read_document(&mut catalog, options, &canonical, true)?;
            Ok(catalog)
        }
        Source::Document { base, value } => {
            let url = location::parse_location(&base, &cwd)?;
            let mut catalog = Catalog::new(&url);
            let canonical = location::canonical(&url);
            catalog.mark_resolved(&canonical, value);
            Ok(catalog)
        }
    }
}

/// Read and parse one document into its catalog entry.
///
/// Returns whether the entry reached `Resolved`. Failures on non-root
/// documents are parked on the entry under `continue_on_error`.
fn read_document(
    catalog: &mut Catalog,
    options: &Options,
    canonical: &str,
    is_root: bool,
) -> Result<bool, Error> {
    let url = Url::parse(canonical).map_err(|source| Error::InvalidUrl {
        input: canonical.to_string(),
        source,
    })?;
    let mut file = FileDescriptor::new(url);
    let outcome = resolver::read(&mut file, options).and_then(|()| parser::parse(&file, options));
    match outcome {
        Ok(value) => {
            debug!(url = canonical, "document resolved");
            catalog.mark_resolved(canonical, value);
            Ok(true)
        }
        Err(err) if !is_root && options.continue_on_error => {
            warn!(url = canonical, error = %err, "continuing past failed document");
            catalog.mark_errored(canonical, err);
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Crawl one resolved document: discover its refs and pull in the documents
/// they reach.
fn crawl_document(catalog: &mut Catalog, options: &Options, url: &str) -> Result<(), Error> {
    let refs = {
        let Some(value) = catalog.get(url) else {
            return Ok(()); // errored entry, nothing to walk
        };
        let mut refs = Vec::new();
        collect_refs(value, &mut refs);
        refs
    };
    if refs.is_empty() {
        return Ok(());
    }

    let base = Url::parse(url).map_err(|source| Error::InvalidUrl {
        input: url.to_string(),
        source,
    })?;
    for ref_str in refs {
        let target = match location::resolve(&base, &ref_str) {
            Ok(target) => target,
            Err(err) if options.continue_on_error => {
                warn!(url, reference = %ref_str, "skipping malformed $ref");
                catalog.push_orphan_error(err);
                continue;
            }
            Err(err) => return Err(err),
        };
        let canonical = location::canonical(&target);
        if catalog.exists(&canonical) {
            continue; // shared entry; possibly still mid-crawl higher up the stack
        }
        if !options.resolve.external {
            continue;
        }
        catalog.insert_pending(&target);
        if read_document(catalog, options, &canonical, false)? {
            crawl_document(catalog, options, &canonical)?;
        }
    }
    Ok(())
}

/// Collect `$ref` strings in document order. Sibling keys of a `$ref` are
/// inert and not traversed.
fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = ref_target(value) {
                out.push(target.to_string());
                return;
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_refs(child, out);
            }
        }
        _ => {}
    }
}
