/**
 * query.rs
 * Query types and builders for SPARQL
 */

use std::collections::HashMap;

use crate::ontology::term;

pub type QueryResult = HashMap<String, String>;

pub struct SparqlQuery {
    query: String,
}

impl SparqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// Does the opposite graph hold a node structure matching `pattern`?
    ///
    /// Every blank node of the structure is a variable shared by the whole
    /// pattern, so all nodes must match within one structure.
    pub fn structure_match(pattern: &str) -> Self {
        Self::new(format!("ASK {{ {} }}", pattern))
    }

    /// Most recent ledger entry for a target graph
    ///
    /// Entries are ordered on their timestamp text with a space separator
    /// read as `T`, so `2026-10-19 10:00:00` and `2026-10-19T10:00:00` sort
    /// together.
    pub fn current_version(metadata_graph: &str, graph_name: &str) -> Self {
        Self::new(format!(
            r#"PREFIX owl: <http://www.w3.org/2002/07/owl#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?version ?origen
WHERE {{
  GRAPH <{m}> {{
    ?s owl:versionInfo ?version ;
       <{m}commited> ?data ;
       <{m}produto> "{g}" ;
       <{m}origen> ?origen .
  }}
}}
ORDER BY DESC(REPLACE(STR(?data), " ", "T"))
LIMIT 1"#,
            m = metadata_graph,
            g = term::escape_literal(graph_name)
        ))
    }
}
