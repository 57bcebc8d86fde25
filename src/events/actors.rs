//! Macro events associated with an actor.

use serde::{Deserialize, Serialize};

use crate::error::{GalynError, Result};
use crate::sparql::{value, Binding, SparqlStore, Term};

use super::PREFIXES;

/// One triplet an actor takes part in, with its event and macro event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroEventLink {
    pub actorlabel: String,
    pub triplet: String,
    /// "subject" or "object"
    pub role: String,
    pub trlabel: String,
    pub event: String,
    pub evlabel: String,
    #[serde(rename = "macro")]
    pub macro_event: String,
    pub melabel: String,
}

impl MacroEventLink {
    fn from_binding(row: &Binding) -> Option<Self> {
        let get = |var: &str| value(row, var).map(str::to_string);
        Some(Self {
            actorlabel: get("actorlabel")?,
            triplet: get("triplet")?,
            role: get("role")?,
            trlabel: get("trlabel")?,
            event: get("event")?,
            evlabel: get("evlabel")?,
            macro_event: get("macro")?,
            melabel: get("melabel")?,
        })
    }
}

const MACROEVENT_QUERY: &str = "
SELECT ?actorlabel ?triplet ?role ?trlabel ?event ?evlabel ?macro ?melabel
WHERE {
  ?individual ^sxcxcx:r31 ?actor;
        dcx:Identifier ?actorlabel.
  {
    ?actor ^sxcxcx:r30 ?participant.
    ?triplet sxcxcx:r63 ?participant.
    BIND(\"subject\" AS ?role)
  } UNION {
    ?actor ^sxcxcx:r35 ?participant.
    ?triplet sxcxcx:r65 ?participant.
    BIND(\"object\" AS ?role)
  }
  ?triplet dcx:Identifier ?trlabel.
  ?event sxcxcx:r62 ?triplet;
         dcx:Identifier ?evlabel.
  ?macro sxcxcx:r61 ?event;
         dcx:Identifier ?melabel.
}
";

/// All macro events associated with the individual actor at `individual_uri`,
/// through every triplet in which the actor is a subject or object participant.
pub async fn get_macroevents(store: &SparqlStore, individual_uri: &str) -> Result<Vec<MacroEventLink>> {
    let parsed = url::Url::parse(individual_uri)
        .map_err(|e| GalynError::InvalidInput(format!("Invalid actor URI {:?}: {}", individual_uri, e)))?;
    let individual = Term {
        kind: "uri".to_string(),
        value: parsed.to_string(),
    };

    let query = format!("{}{}", PREFIXES, MACROEVENT_QUERY);
    let rows = store.query(&query, &[("individual", individual.n3())]).await?;

    let links: Vec<MacroEventLink> = rows.iter().filter_map(MacroEventLink::from_binding).collect();
    if links.len() < rows.len() {
        log::warn!(
            "{} macro event rows for {} were missing bindings",
            rows.len() - links.len(),
            individual_uri
        );
    }
    Ok(links)
}
