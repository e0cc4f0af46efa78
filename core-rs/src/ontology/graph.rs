/**
 * graph.rs
 * Parsed ontology snapshots and the triple-level difference between two of them
 */

use oxigraph::io::{RdfFormat, RdfParseError, RdfParser};
use oxigraph::model::{GraphName, Triple};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{MigrateError, Result};

/// One parsed turtle document
///
/// Holds the triples in parse order (a multiset) and an in-memory store with
/// the same triples, so structural patterns can be asked against it.
/// Blank-node handles are only meaningful inside one `Graph`.
pub struct Graph {
    triples: Vec<Triple>,
    store: Store,
}

impl Graph {
    /// Graph with no triples (the "no current ontology" side of a first migration)
    pub fn empty() -> Result<Self> {
        Self::from_triples(Vec::new())
    }

    /// Parse a turtle document
    ///
    /// Blank-node labels are renamed to fresh handles, so even `_:x` written
    /// in two documents never denotes the same node.
    pub fn parse(turtle: &str) -> Result<Self> {
        let parser = RdfParser::from_format(RdfFormat::Turtle)
            .rename_blank_nodes()
            .for_reader(turtle.as_bytes());

        let mut triples = Vec::new();
        for quad in parser {
            let quad = quad.map_err(parse_error)?;
            triples.push(Triple::from(quad));
        }

        debug!(triples = triples.len(), "parsed turtle graph");
        Self::from_triples(triples)
    }

    pub fn from_triples(triples: Vec<Triple>) -> Result<Self> {
        let store = Store::new()?;
        for triple in &triples {
            store.insert(&triple.clone().in_graph(GraphName::DefaultGraph))?;
        }
        Ok(Self { triples, store })
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Triples of `self` that are not in `other` (`self − other`)
    ///
    /// Exact multiset subtraction on structural equality. Blank nodes are
    /// compared by handle, so a blank node never matches across two parses;
    /// reconciling those is the correlator's job.
    pub fn difference(&self, other: &Graph) -> Diff {
        let mut remaining: HashMap<&Triple, usize> = HashMap::new();
        for triple in &other.triples {
            *remaining.entry(triple).or_insert(0) += 1;
        }

        let mut triples = Vec::new();
        for triple in &self.triples {
            match remaining.get_mut(triple) {
                Some(count) if *count > 0 => *count -= 1,
                _ => triples.push(triple.clone()),
            }
        }

        Diff { triples }
    }

    /// Evaluate an ASK query against this graph
    pub fn ask(&self, query: &str) -> Result<bool> {
        let results = self
            .store
            .query(query)
            .map_err(|e| MigrateError::Query(e.to_string()))?;

        match results {
            QueryResults::Boolean(result) => Ok(result),
            _ => Err(MigrateError::Query(format!(
                "Expected a boolean result for: {}",
                query
            ))),
        }
    }
}

/// Triples present in one graph and absent from another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    triples: Vec<Triple>,
}

impl Diff {
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

fn parse_error(err: RdfParseError) -> MigrateError {
    match err {
        RdfParseError::Syntax(syntax) => {
            let (line, column) = syntax
                .location()
                .map(|range| (range.start.line + 1, range.start.column + 1))
                .unwrap_or((0, 0));
            MigrateError::Parse {
                line,
                column,
                message: syntax.to_string(),
            }
        }
        RdfParseError::Io(io) => MigrateError::Io(io),
    }
}
