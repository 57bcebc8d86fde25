//! Minimal client for the SPARQL 1.1 protocol.
//!
//! Queries are POSTed form-encoded and results are requested in the
//! `application/sparql-results+json` format. Rows come back as maps from
//! variable name to [`Term`].

use crate::config::SparqlConfig;
use crate::error::{GalynError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A bound RDF term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// "uri", "literal", "typed-literal" or "bnode"
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Term {
    /// The term in N-Triples syntax, suitable for splicing into a query
    pub fn n3(&self) -> String {
        match self.kind.as_str() {
            "uri" => format!("<{}>", self.value),
            "bnode" => format!("_:{}", self.value),
            _ => format!("\"{}\"", escape_literal(&self.value)),
        }
    }
}

/// One solution: variable name -> bound term. Unbound variables are absent.
pub type Binding = HashMap<String, Term>;

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

fn escape_literal(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Value of a variable in a binding, if bound
pub fn value<'a>(binding: &'a Binding, var: &str) -> Option<&'a str> {
    binding.get(var).map(|t| t.value.as_str())
}

/// Inject a `VALUES` block binding each variable to a fixed term, so
/// `?individual` in the query body is pre-bound to one resource.
fn with_initial_bindings(query: &str, initial_bindings: &[(&str, String)]) -> String {
    if initial_bindings.is_empty() {
        return query.to_string();
    }
    let vars: Vec<String> = initial_bindings.iter().map(|(v, _)| format!("?{}", v)).collect();
    let terms: Vec<&str> = initial_bindings.iter().map(|(_, t)| t.as_str()).collect();
    let values = format!("VALUES ({}) {{ ({}) }}", vars.join(" "), terms.join(" "));

    // Inject right after the opening brace of the WHERE clause
    match query.find("WHERE").and_then(|w| query[w..].find('{').map(|b| w + b)) {
        Some(brace) => format!("{}{{\n  {}\n{}", &query[..brace], values, &query[brace + 1..]),
        None => format!("{}\n{}", query, values),
    }
}

/// HTTP client for the triple store
#[derive(Debug, Clone)]
pub struct SparqlStore {
    client: Client,
    endpoint: String,
}

impl SparqlStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GalynError::Sparql(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &SparqlConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run a SELECT query. `initial_bindings` pairs a variable name (without
    /// `?`) with a term in N-Triples syntax, see [`Term::n3`].
    pub async fn query(&self, sparql: &str, initial_bindings: &[(&str, String)]) -> Result<Vec<Binding>> {
        let query = with_initial_bindings(sparql, initial_bindings);
        log::debug!("SPARQL query against {}:\n{}", self.endpoint, query);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/sparql-results+json")
            .form(&[("query", query.as_str())])
            .send()
            .await
            .map_err(|e| GalynError::Sparql(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GalynError::Sparql(format!("Store returned {}: {}", status, body)));
        }

        let result: SparqlResponse = response
            .json()
            .await
            .map_err(|e| GalynError::Sparql(format!("Failed to parse results: {}", e)))?;
        Ok(result.results.bindings)
    }
}
