//! Nested containers that may hold tensors, and the walk that finds them.
//!
//! Containers live in an [`ObjectGraph`] arena and refer to each other by
//! [`NodeId`], so a list can hold a reference to one of its ancestors without
//! leaking. The walk visits each node once and reports each tensor once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::trace;

use crate::{Result, Tensor, TensorError, TensorId};

/// Node handle, valid only in the graph that created it (or a clone of that
/// graph). Graphs reject ids minted by another graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    graph: u64,
    index: usize,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Tensor(Tensor),
    Ref(NodeId),
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Value::Tensor(t)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Ref(id)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

#[derive(Clone, Debug)]
pub enum Node {
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

#[derive(Clone, Debug)]
pub struct ObjectGraph {
    id: u64,
    nodes: Vec<Node>,
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_list(&mut self) -> NodeId {
        self.add(Node::List(Vec::new()))
    }

    pub fn add_map(&mut self) -> NodeId {
        self.add(Node::Map(IndexMap::new()))
    }

    fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId {
            graph: self.id,
            index: self.nodes.len() - 1,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.graph == self.id && id.index < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.graph != self.id {
            return None;
        }
        self.nodes.get(id.index)
    }

    pub fn push(&mut self, list: NodeId, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_ref(&value)?;
        match self.node_mut(list)? {
            Node::List(items) => {
                items.push(value);
                Ok(())
            }
            Node::Map(_) => Err(TensorError::NodeKind {
                id: list.index,
                expected: "list",
            }),
        }
    }

    /// Inserting an existing key replaces its value in place.
    pub fn insert(
        &mut self,
        map: NodeId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let value = value.into();
        self.check_ref(&value)?;
        match self.node_mut(map)? {
            Node::Map(entries) => {
                entries.insert(key.into(), value);
                Ok(())
            }
            Node::List(_) => Err(TensorError::NodeKind {
                id: map.index,
                expected: "map",
            }),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        if id.graph != self.id {
            return Err(TensorError::UnknownNode(id.index));
        }
        self.nodes
            .get_mut(id.index)
            .ok_or(TensorError::UnknownNode(id.index))
    }

    fn check_ref(&self, value: &Value) -> Result<()> {
        match value {
            Value::Ref(id) if !self.contains(*id) => Err(TensorError::UnknownNode(id.index)),
            _ => Ok(()),
        }
    }
}

/// Nodes and tensors already reached by a walk.
#[derive(Debug, Default)]
pub struct Seen {
    nodes: HashSet<NodeId>,
    tensors: HashSet<TensorId>,
}

impl Seen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_tensor(&self, id: TensorId) -> bool {
        self.tensors.contains(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }
}

/// Appends every not-yet-seen tensor reachable from `root` to `list`, in
/// depth-first element order. Sharing `seen` across calls skips anything an
/// earlier walk already reported.
pub fn walk_tensor_container(
    graph: &ObjectGraph,
    root: &Value,
    list: &mut Vec<Tensor>,
    seen: &mut Seen,
) {
    let mut stack: Vec<&Value> = vec![root];
    let mut visited_nodes = 0usize;

    while let Some(value) = stack.pop() {
        match value {
            Value::Tensor(t) => {
                if seen.tensors.insert(t.id) {
                    list.push(t.clone());
                }
            }
            Value::Ref(id) => {
                if !seen.nodes.insert(*id) {
                    continue;
                }
                let Some(node) = graph.get(*id) else {
                    continue;
                };
                visited_nodes += 1;
                match node {
                    Node::List(items) => stack.extend(items.iter().rev()),
                    Node::Map(entries) => stack.extend(entries.values().rev()),
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_) => {}
        }
    }

    trace!(nodes = visited_nodes, tensors = list.len(), "walked tensor container");
}

pub fn get_tensors_in_container(graph: &ObjectGraph, root: &Value) -> Vec<Tensor> {
    let mut list = Vec::new();
    let mut seen = Seen::new();
    walk_tensor_container(graph, root, &mut list, &mut seen);
    list
}
