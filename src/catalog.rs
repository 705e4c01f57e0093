//! Catalog of resolved documents, keyed by canonical URL.
//!
//! The catalog owns every parsed document tree. Values are immutable once
//! their entry reaches `Resolved`; the dereferencer and bundler read them
//! through [`Catalog::resolve_pointer`], which follows nested `$ref`s
//! encountered mid-path.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::Error;
use crate::location;
use crate::pointer;

/// Scheme classification of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    File,
    Http,
    Https,
}

impl PathType {
    fn from_url(url: &Url) -> Self {
        match url.scheme() {
            "http" => PathType::Http,
            "https" => PathType::Https,
            _ => PathType::File,
        }
    }
}

/// Lifecycle state of a document entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Resolved,
    Errored,
}

/// One document in the catalog.
#[derive(Debug)]
pub struct DocumentEntry {
    /// Absolute canonical URL (no fragment).
    pub url: String,
    pub path_type: PathType,
    /// Parsed tree, present once `Resolved`.
    pub value: Option<Value>,
    pub status: DocumentStatus,
    /// Populated when `Errored`.
    pub error: Option<Error>,
}

/// Map from canonical URL to document entry.
///
/// Exactly one entry exists per canonical URL; the root document is always
/// present. The `circular` bookkeeping is written only by the dereferencer.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: BTreeMap<String, DocumentEntry>,
    root: String,
    circular: bool,
    circular_refs: Vec<String>,
    /// Errors with no entry to carry them (malformed `$ref` URLs found
    /// under `continue_on_error`).
    orphan_errors: Vec<Error>,
}

impl Catalog {
    pub(crate) fn new(root: &Url) -> Self {
        let mut catalog = Self::default();
        catalog.root = location::canonical(root);
        catalog.insert_pending(root);
        catalog
    }

    /// Canonical URL of the root document.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether the dereferencer found any circular reference.
    pub fn circular(&self) -> bool {
        self.circular
    }

    /// Output-tree pointers of every circular `$ref` site.
    pub fn circular_refs(&self) -> &[String] {
        &self.circular_refs
    }

    pub(crate) fn set_circular(&mut self, refs: Vec<String>) {
        self.circular = !refs.is_empty();
        self.circular_refs = refs;
    }

    pub(crate) fn insert_pending(&mut self, url: &Url) {
        let canonical = location::canonical(url);
        self.entries
            .entry(canonical.clone())
            .or_insert_with(|| DocumentEntry {
                url: canonical,
                path_type: PathType::from_url(url),
                value: None,
                status: DocumentStatus::Pending,
                error: None,
            });
    }

    pub(crate) fn mark_resolved(&mut self, url: &str, value: Value) {
        if let Some(entry) = self.entries.get_mut(url) {
            entry.value = Some(value);
            entry.status = DocumentStatus::Resolved;
        }
    }

    pub(crate) fn mark_errored(&mut self, url: &str, error: Error) {
        if let Some(entry) = self.entries.get_mut(url) {
            entry.status = DocumentStatus::Errored;
            entry.error = Some(error);
        }
    }

    pub(crate) fn push_orphan_error(&mut self, error: Error) {
        self.orphan_errors.push(error);
    }

    /// Whether a document exists in the catalog. Any fragment on `url` is
    /// ignored.
    pub fn exists(&self, url: &str) -> bool {
        self.entries.contains_key(location::strip_hash(url))
    }

    /// The parsed value of a resolved document.
    pub fn get(&self, url: &str) -> Option<&Value> {
        self.entries
            .get(location::strip_hash(url))
            .and_then(|entry| entry.value.as_ref())
    }

    /// Replace a document's value. The entry must already exist.
    pub fn set(&mut self, url: &str, value: Value) -> bool {
        match self.entries.get_mut(location::strip_hash(url)) {
            Some(entry) => {
                entry.value = Some(value);
                entry.status = DocumentStatus::Resolved;
                true
            }
            None => false,
        }
    }

    /// Canonical URLs of all documents, optionally filtered by path type.
    pub fn paths(&self, filter: Option<&[PathType]>) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| filter.map_or(true, |kinds| kinds.contains(&e.path_type)))
            .map(|e| e.url.clone())
            .collect()
    }

    /// URL/value pairs of all resolved documents, optionally filtered.
    pub fn values(&self, filter: Option<&[PathType]>) -> Vec<(&str, &Value)> {
        self.entries
            .values()
            .filter(|e| filter.map_or(true, |kinds| kinds.contains(&e.path_type)))
            .filter_map(|e| e.value.as_ref().map(|v| (e.url.as_str(), v)))
            .collect()
    }

    /// All entries, in URL order.
    pub fn entries(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries.values()
    }

    /// Errors captured under `continue_on_error`.
    pub fn errors(&self) -> Vec<&Error> {
        self.entries
            .values()
            .filter_map(|e| e.error.as_ref())
            .chain(self.orphan_errors.iter())
            .collect()
    }

    /// Walk `pointer` into the document at `url`, following nested `$ref`
    /// values encountered mid-path through the catalog.
    ///
    /// Returns the home coordinate of the targeted value (the document URL
    /// and in-document pointer where it actually lives) together with the
    /// value itself. A value that is itself a ref node is returned as-is;
    /// only refs crossed while tokens remain are followed.
    ///
    /// # Errors
    ///
    /// [`Error::MissingPointer`] when the pointer or a mid-path document is
    /// absent, [`Error::Circular`] when following mid-path refs loops.
    pub fn resolve_pointer(
        &self,
        url: &str,
        ptr: &str,
    ) -> Result<(String, String, &Value), Error> {
        let mut doc_url = location::strip_hash(url).to_string();
        let mut remaining = pointer::parse(ptr)?;
        remaining.reverse(); // consume from the back
        let mut home: Vec<String> = Vec::new();
        let mut current = self.document_value(&doc_url, ptr)?;
        let mut seen: HashSet<(String, String, usize)> = HashSet::new();

        loop {
            if let Some(target) = ref_target(current) {
                if !remaining.is_empty() {
                    let base = Url::parse(&doc_url).map_err(|source| Error::InvalidUrl {
                        input: doc_url.clone(),
                        source,
                    })?;
                    let resolved = location::resolve(&base, target)?;
                    let (next_url, fragment) = location::split_fragment(&resolved);
                    if !seen.insert((next_url.clone(), fragment.clone(), remaining.len())) {
                        return Err(Error::Circular {
                            pointer: format!("#{}", pointer::join(&home)),
                            target: format!("{next_url}#{fragment}"),
                        });
                    }
                    let mut fragment_tokens = pointer::parse(&fragment)?;
                    fragment_tokens.reverse();
                    remaining.extend(fragment_tokens);
                    doc_url = next_url;
                    home.clear();
                    current = self.document_value(&doc_url, ptr)?;
                    continue;
                }
            }
            let Some(token) = remaining.pop() else {
                return Ok((doc_url, pointer::join(&home), current));
            };
            current = pointer::step(current, &token, ptr, &doc_url)?;
            home.push(token);
        }
    }

    fn document_value(&self, url: &str, ptr: &str) -> Result<&Value, Error> {
        self.get(url).ok_or_else(|| Error::MissingPointer {
            url: url.to_string(),
            pointer: ptr.to_string(),
            token: String::new(),
        })
    }
}

/// The `$ref` string of a ref node, if `value` is one.
pub(crate) fn ref_target(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}
