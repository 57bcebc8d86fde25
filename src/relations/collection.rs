//! Node/link accumulator for relationship graphs.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::{GraphData, GraphLink, GraphNode, RelationshipRecord};

#[derive(Debug, Clone)]
struct NodeEntry {
    name: String,
    count: u64,
}

#[derive(Debug, Clone)]
struct LinkEntry {
    source: usize,
    target: usize,
    weight: u64,
}

/// A collection of graph nodes and undirected, weighted links.
///
/// Node ids are assigned sequentially in first-seen order and never change
/// for the lifetime of the collection, so `nodes[i]` in [`as_graph_data`]
/// is always node `i`. Links are kept in first-observed order.
///
/// [`as_graph_data`]: RelationsCollection::as_graph_data
#[derive(Debug, Clone, Default)]
pub struct RelationsCollection {
    nodes: Vec<NodeEntry>,
    node_ids: HashMap<String, usize>,
    links: Vec<LinkEntry>,
    link_index: HashMap<(usize, usize), usize>,
}

/// Order two `(id, name)` endpoints so that (a, b) and (b, a) share a key.
/// Ids are unique per name, so comparing ids alone is a total order.
fn canonical_endpoints<'a>(
    a: (usize, &'a str),
    b: (usize, &'a str),
) -> ((usize, &'a str), (usize, &'a str)) {
    match a.0.cmp(&b.0) {
        Ordering::Greater => (b, a),
        Ordering::Less | Ordering::Equal => (a, b),
    }
}

impl RelationsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relationship record. Records missing either description are
    /// skipped; returns whether the record was added.
    pub fn add_relationship_object(&mut self, rel: &RelationshipRecord) -> bool {
        if rel.subject_desc.is_empty() || rel.object_desc.is_empty() {
            return false;
        }
        self.add_single_relationship(&rel.subject_desc, &rel.object_desc);
        true
    }

    /// Add the nodes and link for a single subject-object pair.
    /// Links are undirected; a name related to itself forms a self-loop.
    pub fn add_single_relationship(&mut self, subject: &str, object: &str) {
        let subject_node = (self.get_or_create_node_id(subject), subject);
        let object_node = (self.get_or_create_node_id(object), object);
        let (first, second) = canonical_endpoints(subject_node, object_node);

        let key = (first.0, second.0);
        match self.link_index.get(&key) {
            Some(&idx) => self.links[idx].weight += 1,
            None => {
                self.link_index.insert(key, self.links.len());
                self.links.push(LinkEntry {
                    source: first.0,
                    target: second.0,
                    weight: 1,
                });
            }
        }
    }

    /// Get the id of the node with the given name, creating it with the next
    /// sequential id if necessary. Increments the node's reference count.
    pub fn get_or_create_node_id(&mut self, name: &str) -> usize {
        if let Some(&id) = self.node_ids.get(name) {
            self.nodes[id].count += 1;
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(NodeEntry {
            name: name.to_string(),
            count: 1,
        });
        self.node_ids.insert(name.to_string(), id);
        id
    }

    /// Number of distinct node names
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct unordered pairs
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flatten into the `{nodes, links}` structure used by the graph page.
    pub fn as_graph_data(&self) -> GraphData {
        let nodes = self
            .nodes
            .iter()
            .map(|n| GraphNode {
                name: n.name.clone(),
                value: n.count,
            })
            .collect();

        let links = self
            .links
            .iter()
            .map(|l| GraphLink {
                source: l.source,
                source_name: self.nodes[l.source].name.clone(),
                target: l.target,
                target_name: self.nodes[l.target].name.clone(),
                value: l.weight,
            })
            .collect();

        GraphData { nodes, links }
    }
}
