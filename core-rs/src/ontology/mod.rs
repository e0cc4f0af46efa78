/**
 * ontology module
 *
 * - term: canonical rendering of RDF terms for generated statements
 * - graph: turtle snapshots (parsed with Oxigraph) and their triple difference
 * - correlator: structural matching of blank-node subgraphs across parses
 * - query: SPARQL query builders
 */

pub mod correlator;
pub mod graph;
pub mod query;
pub mod term;

pub use correlator::{blank_structures, blank_subgraphs, correlate, BlankStructure, BlankSubgraph};
pub use graph::{Diff, Graph};
pub use query::{QueryResult, SparqlQuery};
pub use term::BlankStyle;
