//! Shared fakes for the integration tests
//!
//! - OxigraphStore: a `StoreClient` executing isql scripts against an
//!   in-memory Oxigraph store (statements translated to SPARQL 1.1 Update)
//! - TagSource: an in-memory `VersionSource`
//! - Ticker: strictly increasing commit timestamps

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use oxigraph::model::NamedNode;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tbox_migrate::errors::{MigrateError, Result};
use tbox_migrate::{ClientOutput, Graph, SparqlEndpoint, StoreClient, VersionSource};

pub const GRAPH: &str = "http://example.com/graph";
pub const METADATA: &str = "http://example.com/migrations/";

pub const PREFIXES: &str = r#"@prefix : <http://example.com/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
"#;

const SPARQL_PREFIXES: &str = "PREFIX owl: <http://www.w3.org/2002/07/owl#> \
                               PREFIX xsd: <http://www.w3.org/2001/XMLSchema#> ";

pub fn turtle(body: &str) -> String {
    format!("{}{}", PREFIXES, body)
}

/// In-memory store driven through isql-style scripts
pub struct OxigraphStore {
    pub store: Store,
    /// Statements containing this text fail
    fail_on: RefCell<Vec<String>>,
    pub scripts: RefCell<Vec<String>>,
}

impl OxigraphStore {
    pub fn new() -> Self {
        Self {
            store: Store::new().unwrap(),
            fail_on: RefCell::new(Vec::new()),
            scripts: RefCell::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, marker: &str) {
        self.fail_on.borrow_mut().push(marker.to_string());
    }

    /// Put the triples of a turtle document in the target graph
    pub fn seed(&self, turtle: &str) {
        let graph = NamedNode::new(GRAPH).unwrap();
        for triple in Graph::parse(turtle).unwrap().triples() {
            self.store
                .insert(&triple.clone().in_graph(graph.clone()))
                .unwrap();
        }
    }

    pub fn count(&self, graph: &str) -> usize {
        let rows = self
            .store
            .select(&format!(
                "SELECT (COUNT(*) AS ?n) WHERE {{ GRAPH <{}> {{ ?s ?p ?o }} }}",
                graph
            ))
            .unwrap();
        rows[0]["n"].parse().unwrap()
    }

    pub fn ask(&self, pattern: &str) -> bool {
        let query = format!(
            "PREFIX : <http://example.com/> \
             PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#> \
             PREFIX owl: <http://www.w3.org/2002/07/owl#> \
             PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> \
             ASK {{ GRAPH <{}> {{ {} }} }}",
            GRAPH, pattern
        );
        match self.store.query(query.as_str()).unwrap() {
            QueryResults::Boolean(b) => b,
            _ => panic!("ASK expected"),
        }
    }

    fn run_script(&self, script: &str) -> ClientOutput {
        self.scripts.borrow_mut().push(script.to_string());
        let mut stdout = String::new();

        for line in script.lines().map(str::trim) {
            if line.is_empty() || line == "set echo on;" {
                continue;
            }
            if self.fail_on.borrow().iter().any(|m| line.contains(m.as_str())) {
                return ClientOutput::new(stdout, format!("*** Error 37000: [Virtuoso] {}", line));
            }

            let result = match load_call(line) {
                Some((path, graph)) => self.load_file(&path, &graph),
                None => match translate(line) {
                    Some(update) => self
                        .store
                        .update(update.as_str())
                        .map_err(|e| e.to_string()),
                    None => Err(format!("unsupported statement: {}", line)),
                },
            };

            match result {
                Ok(()) => stdout.push_str("Done. -- 1 msec.\n"),
                Err(e) => return ClientOutput::new(stdout, e),
            }
        }

        ClientOutput::new(stdout, "")
    }

    fn load_file(&self, path: &str, graph: &str) -> std::result::Result<(), String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let parsed = Graph::parse(&content).map_err(|e| e.to_string())?;
        let graph = NamedNode::new(graph).map_err(|e| e.to_string())?;
        for triple in parsed.triples() {
            self.store
                .insert(&triple.clone().in_graph(graph.clone()))
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl StoreClient for OxigraphStore {
    fn run_file(&self, path: &Path) -> Result<ClientOutput> {
        let script = fs::read_to_string(path)?;
        Ok(self.run_script(&script))
    }

    fn run_inline(&self, command: &str) -> Result<ClientOutput> {
        if command.trim() == "select server_root();" {
            return Ok(ClientOutput::new(
                "server_root\nVARCHAR\n____\n\n/var/lib/virtuoso/db\n\n1 Rows. -- 1 msec.\n",
                "",
            ));
        }
        Ok(self.run_script(command))
    }
}

impl SparqlEndpoint for OxigraphStore {
    fn select(&self, query: &str) -> Result<Vec<tbox_migrate::ontology::QueryResult>> {
        self.store.select(query)
    }
}

/// `DB.DBA.TTLP_MT_LOCAL_FILE('<path>', '', '<graph>');`
fn load_call(line: &str) -> Option<(String, String)> {
    let args = line
        .strip_prefix("DB.DBA.TTLP_MT_LOCAL_FILE(")?
        .strip_suffix(");")?;
    let parts: Vec<&str> = args.split(", ").collect();
    let unquote = |s: &str| s.trim_matches('\'').replace("''", "'");
    Some((unquote(parts.first()?), unquote(parts.get(2)?)))
}

/// isql `SPARQL` statement to SPARQL 1.1 Update
fn translate(line: &str) -> Option<String> {
    let statement = line.strip_prefix("SPARQL ")?.strip_suffix(';')?;

    if let Some(rest) = statement.strip_prefix("INSERT INTO <") {
        let (graph, body) = rest.split_once("> ")?;
        return Some(format!(
            "{}INSERT DATA {{ GRAPH <{}> {} }}",
            SPARQL_PREFIXES, graph, body
        ));
    }

    let rest = statement.strip_prefix("DELETE FROM <")?;
    let (graph, body) = rest.split_once("> ")?;
    Some(match body.split_once("} WHERE {") {
        Some((template, pattern)) => format!(
            "{}WITH <{}> DELETE {}}} WHERE {{{}",
            SPARQL_PREFIXES, graph, template, pattern
        ),
        None => format!(
            "{}DELETE DATA {{ GRAPH <{}> {} }}",
            SPARQL_PREFIXES, graph, body
        ),
    })
}

/// Versions held in memory, latest = last inserted
pub struct TagSource {
    tags: BTreeMap<String, String>,
    order: Vec<String>,
}

impl TagSource {
    pub fn new() -> Self {
        Self {
            tags: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn tag(mut self, name: &str, turtle: &str) -> Self {
        self.tags.insert(name.to_string(), turtle.to_string());
        self.order.push(name.to_string());
        self
    }
}

impl VersionSource for TagSource {
    fn all_versions(&self) -> Result<Vec<String>> {
        if self.order.is_empty() {
            return Err(MigrateError::NoMigrationFound);
        }
        Ok(self.order.clone())
    }

    fn latest_version(&self) -> Result<String> {
        self.order.last().cloned().ok_or(MigrateError::NoMigrationFound)
    }

    fn ontology_at(&self, version: &str) -> Result<String> {
        self.tags
            .get(version)
            .cloned()
            .ok_or_else(|| MigrateError::Process(format!("git show failed: unknown revision {}", version)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// One second later on every call
pub struct Ticker(Cell<i64>);

impl Ticker {
    pub fn new() -> Self {
        Ticker(Cell::new(0))
    }

    pub fn next(&self) -> NaiveDateTime {
        let n = self.0.get() + 1;
        self.0.set(n);
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::seconds(n)
    }
}
