//! SPARQL SELECT endpoints the ledger is read through
//!
//! - HttpEndpoint: the store's HTTP endpoint (`?query=`, JSON results)
//! - oxigraph `Store`: in-memory stores, used by tests and local tooling

use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::errors::{MigrateError, Result};
use crate::ontology::query::QueryResult;

/// Read-only SPARQL access
pub trait SparqlEndpoint {
    /// Run a SELECT query; each row maps variable name to the bound value
    fn select(&self, query: &str) -> Result<Vec<QueryResult>>;
}

/// `application/sparql-results+json` body
#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

/// HTTP SPARQL endpoint queried with GET
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    url: String,
    timeout: Option<Duration>,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SparqlEndpoint for HttpEndpoint {
    fn select(&self, query: &str) -> Result<Vec<QueryResult>> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        debug!(url = %self.url, "querying sparql endpoint");
        let response = client
            .get(&self.url)
            .query(&[("query", query)])
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .send()
            .map_err(|e| MigrateError::Connection(format!("{} ({})", self.url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MigrateError::Connection(format!(
                "{} answered {}: {}",
                self.url, status, body
            )));
        }

        let body = response.text()?;
        let results: SparqlResults = serde_json::from_str(&body)?;
        Ok(results
            .results
            .bindings
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (k, v.value)).collect())
            .collect())
    }
}

impl SparqlEndpoint for Store {
    fn select(&self, query: &str) -> Result<Vec<QueryResult>> {
        let results = self
            .query(query)
            .map_err(|e| MigrateError::Query(e.to_string()))?;

        let solutions = match results {
            QueryResults::Solutions(solutions) => solutions,
            _ => {
                return Err(MigrateError::Query(format!(
                    "Expected solutions for: {}",
                    query
                )))
            }
        };

        let mut rows = Vec::new();
        for solution in solutions {
            let solution = solution.map_err(|e| MigrateError::Query(e.to_string()))?;
            let row = solution
                .iter()
                .map(|(variable, value)| (variable.as_str().to_string(), raw_value(value)))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Lexical value of a term, as the JSON results format reports it
fn raw_value(term: &Term) -> String {
    #[allow(unreachable_patterns)]
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        Term::Literal(lit) => lit.value().to_string(),
        other => other.to_string(),
    }
}
