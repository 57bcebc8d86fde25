//! Semantic triplets as an alternate source of relationship pairs.
//!
//! A triplet links subject participants to object participants; each
//! participant groups one or more individual actors. Every subject
//! individual is paired with every object individual of the same triplet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relations::{GraphData, RelationsCollection};
use crate::sparql::{value, Binding, SparqlStore};

use super::PREFIXES;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub uri: String,
    pub actor_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub uri: String,
    pub individuals: Vec<Individual>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triplet {
    pub uri: String,
    /// Subject-role participants
    pub participant_s: Vec<Participant>,
    /// Object-role participants
    pub participant_o: Vec<Participant>,
}

/// All (subject individual, object individual) pairs of all triplets.
///
/// Full cross product per triplet: subject participants x object
/// participants x their individuals. Nothing is cached; call again to
/// restart from the first triplet.
pub fn subject_object_pairs(triplets: &[Triplet]) -> impl Iterator<Item = (&Individual, &Individual)> + '_ {
    triplets.iter().flat_map(|tr| {
        tr.participant_s.iter().flat_map(move |ps| {
            tr.participant_o.iter().flat_map(move |po| {
                ps.individuals
                    .iter()
                    .flat_map(move |s| po.individuals.iter().map(move |o| (s, o)))
            })
        })
    })
}

/// Relationship graph between named actors of the given triplets.
/// Pairs where either individual has no actor name are skipped.
pub fn triplet_graph(triplets: &[Triplet]) -> GraphData {
    let mut rels = RelationsCollection::new();
    for (subj, obj) in subject_object_pairs(triplets) {
        match (subj.actor_name.as_deref(), obj.actor_name.as_deref()) {
            (Some(s), Some(o)) if !s.is_empty() && !o.is_empty() => {
                rels.add_single_relationship(s, o);
            }
            _ => {}
        }
    }
    rels.as_graph_data()
}

/// Every triplet/participant/individual row. Subject participants hang off
/// `r63` and reach their actor via `r30`; object participants use `r65`/`r35`.
const TRIPLET_QUERY: &str = "
SELECT ?triplet ?role ?participant ?individual ?actorname
WHERE {
  {
    ?triplet sxcxcx:r63 ?participant .
    ?participant sxcxcx:r30 ?actor .
    BIND(\"subject\" AS ?role)
  } UNION {
    ?triplet sxcxcx:r65 ?participant .
    ?participant sxcxcx:r35 ?actor .
    BIND(\"object\" AS ?role)
  }
  ?actor sxcxcx:r31 ?individual .
  OPTIONAL { ?individual dcx:Identifier ?actorname }
}
ORDER BY ?triplet ?role ?participant ?individual
";

/// Fetch all triplets with their participants and individuals.
pub async fn load_triplets(store: &SparqlStore) -> Result<Vec<Triplet>> {
    let query = format!("{}{}", PREFIXES, TRIPLET_QUERY);
    let rows = store.query(&query, &[]).await?;
    let triplets = group_triplet_rows(&rows);
    log::debug!("Loaded {} triplets from {} rows", triplets.len(), rows.len());
    Ok(triplets)
}

/// Rebuild the nested structure from flat rows, keeping first-seen order.
fn group_triplet_rows(rows: &[Binding]) -> Vec<Triplet> {
    let mut triplets: Vec<Triplet> = Vec::new();
    let mut triplet_index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let (Some(triplet_uri), Some(role), Some(participant_uri), Some(individual_uri)) = (
            value(row, "triplet"),
            value(row, "role"),
            value(row, "participant"),
            value(row, "individual"),
        ) else {
            log::debug!("Skipping incomplete triplet row: {:?}", row);
            continue;
        };

        let idx = *triplet_index.entry(triplet_uri.to_string()).or_insert_with(|| {
            triplets.push(Triplet {
                uri: triplet_uri.to_string(),
                ..Default::default()
            });
            triplets.len() - 1
        });
        let triplet = &mut triplets[idx];

        let participants = match role {
            "subject" => &mut triplet.participant_s,
            "object" => &mut triplet.participant_o,
            other => {
                log::warn!("Unknown participant role {:?} in triplet {}", other, triplet_uri);
                continue;
            }
        };

        let pos = match participants.iter().position(|p| p.uri == participant_uri) {
            Some(pos) => pos,
            None => {
                participants.push(Participant {
                    uri: participant_uri.to_string(),
                    individuals: Vec::new(),
                });
                participants.len() - 1
            }
        };
        let participant = &mut participants[pos];

        if !participant.individuals.iter().any(|i| i.uri == individual_uri) {
            participant.individuals.push(Individual {
                uri: individual_uri.to_string(),
                actor_name: value(row, "actorname").map(str::to_string),
            });
        }
    }

    triplets
}
