//! Event data held in the SPARQL store: semantic triplets and the macro
//! events an actor took part in.
//!
//! Resources come from the PC-ACE export, whose predicates are numbered
//! cross-reference columns (`sxcxcx:rNN`) rather than readable names.

pub mod actors;
pub mod triplets;

pub use actors::{get_macroevents, MacroEventLink};
pub use triplets::{load_triplets, subject_object_pairs, triplet_graph, Individual, Participant, Triplet};

/// Prefixes shared by every query against the PC-ACE data
pub(crate) const PREFIXES: &str = "\
PREFIX dcx:<http://galyn.example.com/source_data_files/data_Complex.csv#>
PREFIX sxcxcx:<http://galyn.example.com/source_data_files/setup_xref_Complex-Complex.csv#>
";
