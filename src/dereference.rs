//! Dereferencer: builds a tree in which every `$ref` is replaced by its
//! target.
//!
//! The output is an arena of nodes keyed by integer ids. Two `$ref`s to the
//! same target yield the same node id, so sharing is observable as id
//! equality; a circular chain becomes a back-edge to an in-progress node.
//! Nodes are memoized by home coordinate: the document URL and in-document
//! pointer where the value actually lives.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Number, Value};
use url::Url;

use crate::catalog::{ref_target, Catalog};
use crate::crawl;
use crate::error::Error;
use crate::location;
use crate::options::{CircularPolicy, Options};
use crate::pointer;
use crate::Source;

/// Identity of a node in a [`DerefGraph`].
pub type NodeId = usize;

/// One node of the dereferenced tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<NodeId>),
    /// Keys in document order.
    Object(Vec<(String, NodeId)>),
}

/// Arena holding the dereferenced tree.
#[derive(Debug)]
pub struct DerefGraph {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DerefGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Navigate a JSON Pointer from the root and return the node id there.
    ///
    /// This is how sharing is asserted: two pointers to the same target
    /// return the same id.
    pub fn node_at(&self, ptr: &str) -> Option<NodeId> {
        let tokens = pointer::parse(ptr).ok()?;
        let mut id = self.root;
        for token in &tokens {
            id = match &self.nodes[id] {
                Node::Object(fields) => fields
                    .iter()
                    .find(|(key, _)| key == token)
                    .map(|(_, child)| *child)?,
                Node::Array(items) => items.get(token.parse::<usize>().ok()?).copied()?,
                _ => return None,
            };
        }
        Some(id)
    }

    /// Flatten the arena into a plain value tree.
    ///
    /// Shared acyclic nodes are duplicated (JSON has no sharing); a cycle
    /// back-edge is re-emitted as a `$ref` to the pointer of its first
    /// occurrence.
    pub fn to_value(&self) -> Value {
        let mut path = Vec::new();
        let mut on_stack = HashMap::new();
        self.value_of(self.root, &mut path, &mut on_stack)
    }

    fn value_of(
        &self,
        id: NodeId,
        path: &mut Vec<String>,
        on_stack: &mut HashMap<NodeId, String>,
    ) -> Value {
        if let Some(ptr) = on_stack.get(&id) {
            let mut map = Map::new();
            map.insert("$ref".to_string(), Value::String(ptr.clone()));
            return Value::Object(map);
        }
        match &self.nodes[id] {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Array(items) => {
                on_stack.insert(id, format!("#{}", pointer::join(path)));
                let out = items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| {
                        path.push(index.to_string());
                        let value = self.value_of(*child, path, on_stack);
                        path.pop();
                        value
                    })
                    .collect();
                on_stack.remove(&id);
                Value::Array(out)
            }
            Node::Object(fields) => {
                on_stack.insert(id, format!("#{}", pointer::join(path)));
                let mut map = Map::new();
                for (key, child) in fields {
                    path.push(key.clone());
                    let value = self.value_of(*child, path, on_stack);
                    path.pop();
                    map.insert(key.clone(), value);
                }
                on_stack.remove(&id);
                Value::Object(map)
            }
        }
    }
}

/// Result of [`dereference`]: the arena plus the catalog with its circular
/// bookkeeping filled in.
#[derive(Debug)]
pub struct Dereferenced {
    pub graph: DerefGraph,
    pub catalog: Catalog,
}

impl Dereferenced {
    /// Shorthand for `self.graph.to_value()`.
    pub fn value(&self) -> Value {
        self.graph.to_value()
    }
}

/// Resolve every reachable document and replace each `$ref` with the node
/// it targets.
///
/// # Errors
///
/// Any resolution or parse failure, or [`Error::Circular`] when a circular
/// chain is found under [`CircularPolicy::Error`].
pub fn dereference(src: impl Into<Source>, options: &Options) -> Result<Dereferenced, Error> {
    let mut catalog = crawl::resolve_catalog(src.into(), options)?;
    let root_url = catalog.root().to_string();

    let built = {
        let root_value = catalog.get(&root_url).ok_or_else(|| Error::MissingPointer {
            url: root_url.clone(),
            pointer: String::new(),
            token: String::new(),
        })?;
        let mut builder = Builder {
            catalog: &catalog,
            policy: options.dereference.circular,
            continue_on_error: options.continue_on_error,
            nodes: Vec::new(),
            memo: HashMap::new(),
            circular_refs: Vec::new(),
            errors: Vec::new(),
        };
        let root = builder.build_at(&root_url, String::new(), root_value, &mut Vec::new())?;
        (builder.nodes, root, builder.circular_refs, builder.errors)
    };
    let (nodes, root, circular_refs, errors) = built;

    catalog.set_circular(circular_refs);
    for error in errors {
        catalog.push_orphan_error(error);
    }
    Ok(Dereferenced {
        graph: DerefGraph { nodes, root },
        catalog,
    })
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Placeholder allocated; `None` while a ref chain is still resolving.
    InProgress(Option<NodeId>),
    Done(NodeId),
}

enum Target {
    Node(NodeId),
    /// Emit the ref node literally (circular under `Ignore`, a ref chain
    /// with no concrete node, or a deferred error).
    Literal,
}

struct Builder<'a> {
    catalog: &'a Catalog,
    policy: CircularPolicy,
    continue_on_error: bool,
    nodes: Vec<Node>,
    memo: HashMap<(String, String), Slot>,
    circular_refs: Vec<String>,
    errors: Vec<Error>,
}

impl<'a> Builder<'a> {
    fn build_at(
        &mut self,
        url: &str,
        ptr: String,
        value: &'a Value,
        out_path: &mut Vec<String>,
    ) -> Result<NodeId, Error> {
        let coord = (url.to_string(), ptr);
        match self.memo.get(&coord) {
            Some(Slot::Done(id)) | Some(Slot::InProgress(Some(id))) => return Ok(*id),
            Some(Slot::InProgress(None)) | None => {}
        }

        if let Some(ref_str) = ref_target(value) {
            // Sibling keys of $ref are inert and dropped.
            self.memo.insert(coord.clone(), Slot::InProgress(None));
            let id = match self.resolve_target(url, ref_str, out_path)? {
                Target::Node(id) => id,
                Target::Literal => self.literal(value),
            };
            self.memo.insert(coord, Slot::Done(id));
            return Ok(id);
        }

        let id = self.nodes.len();
        self.nodes.push(Node::Null); // placeholder until children exist
        self.memo
            .insert(coord.clone(), Slot::InProgress(Some(id)));

        let node = match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => Node::Number(n.clone()),
            Value::String(s) => Node::String(s.clone()),
            Value::Array(items) => {
                let mut children = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let child_ptr = format!("{}/{index}", coord.1);
                    out_path.push(index.to_string());
                    let child = self.build_at(url, child_ptr, item, out_path)?;
                    out_path.pop();
                    children.push(child);
                }
                Node::Array(children)
            }
            Value::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (key, item) in map {
                    let child_ptr = format!("{}/{}", coord.1, pointer::escape(key));
                    out_path.push(key.clone());
                    let child = self.build_at(url, child_ptr, item, out_path)?;
                    out_path.pop();
                    fields.push((key.clone(), child));
                }
                Node::Object(fields)
            }
        };
        self.nodes[id] = node;
        self.memo.insert(coord, Slot::Done(id));
        Ok(id)
    }

    /// Resolve a `$ref` string to a node, detecting circular chains.
    fn resolve_target(
        &mut self,
        base_url: &str,
        ref_str: &str,
        out_path: &mut Vec<String>,
    ) -> Result<Target, Error> {
        let catalog = self.catalog;
        let mut coord = match self.target_coord(base_url, ref_str) {
            Ok(coord) => coord,
            Err(err) => return self.defer(err),
        };
        let mut chain: HashSet<(String, String)> = HashSet::new();
        let mut recorded = false;

        loop {
            let (home_url, home_ptr, value) =
                match catalog.resolve_pointer(&coord.0, &coord.1) {
                    Ok(resolved) => resolved,
                    Err(err @ Error::Circular { .. }) => {
                        // A mid-path ref loop is a circular chain too.
                        self.record_circular(out_path, &mut recorded);
                        match self.policy {
                            CircularPolicy::Error => return Err(err),
                            _ => return Ok(Target::Literal),
                        }
                    }
                    Err(err) => return self.defer(err),
                };

            match self.memo.get(&(home_url.clone(), home_ptr.clone())) {
                Some(Slot::Done(id)) => return Ok(Target::Node(*id)),
                Some(Slot::InProgress(state)) => {
                    let state = *state;
                    self.record_circular(out_path, &mut recorded);
                    match self.policy {
                        CircularPolicy::Error => {
                            return Err(Error::Circular {
                                pointer: format!("#{}", pointer::join(out_path)),
                                target: format!("{}#{}", coord.0, coord.1),
                            });
                        }
                        CircularPolicy::Ignore => return Ok(Target::Literal),
                        CircularPolicy::Share => match state {
                            Some(id) => return Ok(Target::Node(id)),
                            None => {
                                // A chain of refs with no concrete node yet:
                                // step through it looking for one.
                                let Some(next) = ref_target(value) else {
                                    return Ok(Target::Literal);
                                };
                                let next_coord = match self.target_coord(&home_url, next) {
                                    Ok(coord) => coord,
                                    Err(err) => return self.defer(err),
                                };
                                if !chain.insert(next_coord.clone()) {
                                    return Ok(Target::Literal);
                                }
                                coord = next_coord;
                            }
                        },
                    }
                }
                None => {
                    let id = self.build_at(&home_url, home_ptr, value, out_path)?;
                    return Ok(Target::Node(id));
                }
            }
        }
    }

    fn target_coord(&self, base_url: &str, ref_str: &str) -> Result<(String, String), Error> {
        let base = Url::parse(base_url).map_err(|source| Error::InvalidUrl {
            input: base_url.to_string(),
            source,
        })?;
        let target = location::resolve(&base, ref_str)?;
        Ok(location::split_fragment(&target))
    }

    fn record_circular(&mut self, out_path: &[String], recorded: &mut bool) {
        if !*recorded {
            self.circular_refs
                .push(format!("#{}", pointer::join(out_path)));
            *recorded = true;
        }
    }

    fn defer(&mut self, err: Error) -> Result<Target, Error> {
        if self.continue_on_error {
            self.errors.push(err);
            Ok(Target::Literal)
        } else {
            Err(err)
        }
    }

    /// Allocate a sub-tree verbatim, without memoization or ref handling.
    fn literal(&mut self, value: &Value) -> NodeId {
        let node = match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => Node::Number(n.clone()),
            Value::String(s) => Node::String(s.clone()),
            Value::Array(items) => Node::Array(items.iter().map(|v| self.literal(v)).collect()),
            Value::Object(map) => Node::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.literal(v)))
                    .collect(),
            ),
        };
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }
}
