//! Bundler: produces a single self-contained document.
//!
//! External `$ref` targets are grafted into the root under
//! `#/definitions/<name>` and the refs rewritten to local pointers. Each
//! distinct target gets exactly one body; later refs to it reuse the first
//! insertion, so circular chains stay as plain local `$ref`s and no cycles
//! are created.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::catalog::Catalog;
use crate::crawl;
use crate::error::Error;
use crate::location;
use crate::options::Options;
use crate::pointer;
use crate::Source;

/// Result of [`bundle`]: the self-contained tree plus the catalog it was
/// produced from.
#[derive(Debug)]
pub struct Bundled {
    pub value: Value,
    pub catalog: Catalog,
}

/// Resolve every reachable document and inline all external targets into
/// the root.
///
/// # Errors
///
/// Any resolution or parse failure; pointer failures while grafting.
pub fn bundle(src: impl Into<Source>, options: &Options) -> Result<Bundled, Error> {
    let mut catalog = crawl::resolve_catalog(src.into(), options)?;
    let root_url = catalog.root().to_string();
    let mut out = catalog
        .get(&root_url)
        .cloned()
        .ok_or_else(|| Error::MissingPointer {
            url: root_url.clone(),
            pointer: String::new(),
            token: String::new(),
        })?;

    let errors = {
        let mut bundler = Bundler {
            catalog: &catalog,
            continue_on_error: options.continue_on_error,
            root_url: root_url.clone(),
            inlined: HashMap::new(),
            used: existing_definition_names(&out),
            pending: VecDeque::new(),
            errors: Vec::new(),
        };
        bundler.rewrite(&mut out, &root_url)?;
        while let Some((name, mut body, base)) = bundler.pending.pop_front() {
            bundler.rewrite(&mut body, &base)?;
            debug!(name = %name, from = %base, "inlined external target");
            let at = format!("/definitions/{}", pointer::escape(&name));
            pointer::set(&mut out, &at, body, &root_url)?;
        }
        bundler.errors
    };
    for error in errors {
        catalog.push_orphan_error(error);
    }

    Ok(Bundled {
        value: out,
        catalog,
    })
}

fn existing_definition_names(root: &Value) -> BTreeSet<String> {
    root.get("definitions")
        .and_then(Value::as_object)
        .map(|defs| defs.keys().cloned().collect())
        .unwrap_or_default()
}

struct Bundler<'a> {
    catalog: &'a Catalog,
    continue_on_error: bool,
    root_url: String,
    /// Home coordinate of an inlined target -> its local pointer.
    inlined: HashMap<(String, String), String>,
    used: BTreeSet<String>,
    /// Bodies waiting to be grafted: (name, body, base URL for its refs).
    pending: VecDeque<(String, Value, String)>,
    errors: Vec<Error>,
}

impl Bundler<'_> {
    fn rewrite(&mut self, value: &mut Value, base_url: &str) -> Result<(), Error> {
        match value {
            Value::Object(map) => {
                let ref_str = map.get("$ref").and_then(Value::as_str).map(str::to_string);
                if let Some(ref_str) = ref_str {
                    if let Some(local) = self.local_pointer(base_url, &ref_str)? {
                        map.insert("$ref".to_string(), Value::String(local));
                    }
                    return Ok(()); // siblings of $ref are inert
                }
                for child in map.values_mut() {
                    self.rewrite(child, base_url)?;
                }
            }
            Value::Array(items) => {
                for child in items {
                    self.rewrite(child, base_url)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The local pointer a ref should be rewritten to, or `None` when it is
    /// already internal to the root and stays untouched.
    fn local_pointer(
        &mut self,
        base_url: &str,
        ref_str: &str,
    ) -> Result<Option<String>, Error> {
        let base = Url::parse(base_url).map_err(|source| Error::InvalidUrl {
            input: base_url.to_string(),
            source,
        })?;
        let target = match location::resolve(&base, ref_str) {
            Ok(target) => target,
            Err(err) => return self.defer(err),
        };
        let (doc_url, fragment) = location::split_fragment(&target);

        if doc_url == self.root_url {
            if base_url == self.root_url && ref_str.starts_with('#') {
                return Ok(None);
            }
            // Absolute self-ref, or a ref back to the root from an inlined
            // subtree: make it local.
            return Ok(Some(format!("#{fragment}")));
        }

        let (home_url, home_ptr, body) =
            match self.catalog.resolve_pointer(&doc_url, &fragment) {
                Ok(resolved) => resolved,
                Err(err) => return self.defer(err),
            };
        if home_url == self.root_url {
            // An alias chain that lands back inside the root document.
            return Ok(Some(format!("#{home_ptr}")));
        }

        let key = (home_url.clone(), home_ptr.clone());
        if let Some(local) = self.inlined.get(&key) {
            return Ok(Some(local.clone()));
        }
        let name = self.synthesize(&home_url, &home_ptr);
        let local = format!("#/definitions/{}", pointer::escape(&name));
        self.inlined.insert(key, local.clone());
        self.pending.push_back((name, body.clone(), home_url));
        Ok(Some(local))
    }

    /// Stable synthetic definition name for a target: last pointer token,
    /// else the file stem; deduplicated in first-visit order.
    fn synthesize(&mut self, home_url: &str, home_ptr: &str) -> String {
        let tokens = pointer::parse(home_ptr).unwrap_or_default();
        let base = match tokens.last() {
            Some(token) if !token.is_empty() => token.clone(),
            _ => file_stem(home_url),
        };
        let mut name: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if name.is_empty() {
            name = "definition".to_string();
        }
        if !self.used.insert(name.clone()) {
            let mut n = 2;
            loop {
                let candidate = format!("{name}_{n}");
                if self.used.insert(candidate.clone()) {
                    name = candidate;
                    break;
                }
                n += 1;
            }
        }
        name
    }

    fn defer(&mut self, err: Error) -> Result<Option<String>, Error> {
        if self.continue_on_error {
            self.errors.push(err);
            Ok(None)
        } else {
            Err(err)
        }
    }
}

fn file_stem(url: &str) -> String {
    let path = location::strip_hash(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let stem = match segment.rfind('.') {
        Some(idx) if idx > 0 => &segment[..idx],
        _ => segment,
    };
    stem.to_string()
}
