// Retained-mode nodes (DOM elements, SVG filters) created by engines.
// Every create has exactly one destroy: OwnedNode is released by value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Handle to a node inside a NodeHost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Where a new node is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "at", content = "id", rename_all = "snake_case")]
pub enum NodeParent {
    /// The mount's visible content layer.
    Layer,
    /// The mount's SVG `<defs>` block.
    Defs,
    Node(NodeId),
}

/// Description of a node to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub tag: String,
    pub parent: NodeParent,
    pub attrs: Vec<(String, String)>,
}

impl NodeSpec {
    pub fn new(tag: &str, parent: NodeParent) -> Self {
        NodeSpec {
            tag: tag.to_string(),
            parent,
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }
}

/// Retained-mode backend.
pub trait NodeHost {
    fn create(&mut self, spec: NodeSpec) -> NodeId;

    /// Names prefixed `style.` address CSS properties. Unknown ids are ignored.
    fn set_attr(&mut self, id: NodeId, name: &str, value: String);

    /// Remove a node and its whole subtree. Unknown ids are ignored.
    fn destroy(&mut self, id: NodeId);

    fn live_count(&self) -> usize;
}

/// Exclusive ownership of a node subtree.
#[derive(Debug)]
#[must_use = "an OwnedNode must be released back to its host"]
pub struct OwnedNode {
    id: NodeId,
}

impl OwnedNode {
    pub fn create(host: &mut dyn NodeHost, spec: NodeSpec) -> Self {
        OwnedNode {
            id: host.create(spec),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn set(&self, host: &mut dyn NodeHost, name: &str, value: String) {
        host.set_attr(self.id, name, value);
    }

    /// Destroy the subtree. Consumes the handle so it cannot run twice.
    pub fn release(self, host: &mut dyn NodeHost) {
        host.destroy(self.id);
        std::mem::forget(self);
    }
}

impl Drop for OwnedNode {
    fn drop(&mut self) {
        log::warn!("node {} dropped without release; it leaks in the host", self.id.0);
    }
}

/// Patch op for the host to mirror the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NodePatch {
    Create {
        id: NodeId,
        tag: String,
        parent: NodeParent,
        attrs: Vec<(String, String)>,
    },
    Set {
        id: NodeId,
        name: String,
        value: String,
    },
    Destroy {
        id: NodeId,
    },
}

/// Structure of a subtree with ids stripped, for comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeShape {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<NodeShape>,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    tag: String,
    attrs: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: NodeParent,
}

/// In-memory node tree that records patches for the host.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, NodeRecord>,
    next_id: u32,
    patches: Vec<NodePatch>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry::default()
    }

    pub fn take_patches(&mut self) -> Vec<NodePatch> {
        std::mem::take(&mut self.patches)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(&id)?.attrs.get(name).map(String::as_str)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn shape(&self, id: NodeId) -> Option<NodeShape> {
        let record = self.nodes.get(&id)?;
        Some(NodeShape {
            tag: record.tag.clone(),
            attrs: record.attrs.clone(),
            children: record
                .children
                .iter()
                .filter_map(|child| self.shape(*child))
                .collect(),
        })
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(record) = self.nodes.get(&id) {
            for child in &record.children {
                self.collect_subtree(*child, out);
            }
        }
    }
}

impl NodeHost for NodeRegistry {
    fn create(&mut self, spec: NodeSpec) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        if let NodeParent::Node(parent) = spec.parent {
            if let Some(record) = self.nodes.get_mut(&parent) {
                record.children.push(id);
            }
        }
        self.nodes.insert(
            id,
            NodeRecord {
                tag: spec.tag.clone(),
                attrs: spec.attrs.iter().cloned().collect(),
                children: Vec::new(),
                parent: spec.parent,
            },
        );
        self.patches.push(NodePatch::Create {
            id,
            tag: spec.tag,
            parent: spec.parent,
            attrs: spec.attrs,
        });
        id
    }

    fn set_attr(&mut self, id: NodeId, name: &str, value: String) {
        let Some(record) = self.nodes.get_mut(&id) else {
            return;
        };
        if record.attrs.get(name) == Some(&value) {
            return;
        }
        record.attrs.insert(name.to_string(), value.clone());
        self.patches.push(NodePatch::Set {
            id,
            name: name.to_string(),
            value,
        });
    }

    fn destroy(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(&id).map(|r| r.parent) else {
            return;
        };
        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);
        for node in doomed {
            self.nodes.remove(&node);
        }
        if let NodeParent::Node(parent) = parent {
            if let Some(record) = self.nodes.get_mut(&parent) {
                record.children.retain(|c| *c != id);
            }
        }
        self.patches.push(NodePatch::Destroy { id });
    }

    fn live_count(&self) -> usize {
        self.nodes.len()
    }
}
