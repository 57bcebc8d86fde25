//! Relationship graphs: aggregation of subject/object pairs into a weighted,
//! undirected node/link structure, plus the relational queries that feed it.
//!
//! Records come either from the `relationships` table (optionally filtered on
//! categorical columns) or from semantic triplets in the SPARQL store
//! (see [`crate::events::triplets`]).

mod collection;
mod filter;
mod queries;

pub use collection::RelationsCollection;
pub use filter::{FilterFields, RelationFilter, DEFAULT_FILTER_FIELDS};
pub use queries::{
    event_lookup, filter_choices, load_relationships, relationship_graph, story_url, word_cloud,
    EventAppearance, FilterChoice, WordCount,
};

use serde::{Deserialize, Serialize};

/// A flat relationship row: who did something to whom, in which story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub id: i64,
    pub story_id: Option<i64>,
    pub subject_desc: String,
    pub object_desc: String,
}

impl RelationshipRecord {
    pub fn new(subject_desc: impl Into<String>, object_desc: impl Into<String>) -> Self {
        Self {
            subject_desc: subject_desc.into(),
            object_desc: object_desc.into(),
            ..Default::default()
        }
    }
}

/// Serialized graph, consumed by the force-directed graph page.
///
/// The field names are read directly by the client-side renderer, which
/// indexes `nodes` with the integer ids found in `links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    /// Number of times the name appeared as either endpoint
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: usize,
    pub source_name: String,
    pub target: usize,
    pub target_name: String,
    /// Number of records observed for this unordered pair
    pub value: u64,
}
