//! Version ledger kept inside the triple store
//!
//! Each applied migration is one blank node in the metadata graph:
//!
//! ```text
//! [] owl:versionInfo "02" ;
//!    <{m}endpoint> "…" ; <{m}usuario> "…" ; <{m}ambiente> "…" ;
//!    <{m}produto> "<target graph>" ;
//!    <{m}commited> "2026-10-19T10:00:00"^^xsd:dateTime ;
//!    <{m}origen> "git" ;
//!    <{m}changes> "<escaped forward script>" .   # or <{m}inserted> "a.ttl, b.ttl"
//! ```
//!
//! `{m}` is the metadata graph IRI, which doubles as the predicate namespace.
//! The newest entry for a target graph defines its current version.

pub mod endpoint;

pub use endpoint::{HttpEndpoint, SparqlEndpoint};

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::errors::{MigrateError, Result};
use crate::ontology::query::SparqlQuery;
use crate::ontology::term::escape_literal;

/// Version label stored when a graph is versioned without a schema version
pub const ABSENT_VERSION: &str = "None";

/// Timestamp layout of `commited` values
///
/// Ledgers written by older tools use `%Y-%m-%d %H:%M:%S`; both layouts are
/// ordered together when reading the current version.
pub const COMMIT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Where the destination ontology of a migration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Git,
    File,
    Insert,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Git => write!(f, "git"),
            Origin::File => write!(f, "file"),
            Origin::Insert => write!(f, "insert"),
        }
    }
}

impl FromStr for Origin {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(Origin::Git),
            "file" => Ok(Origin::File),
            "insert" => Ok(Origin::Insert),
            other => Err(MigrateError::InvalidMigration(format!(
                "Unknown ledger origin: {}",
                other
            ))),
        }
    }
}

/// What the entry records about the migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRecord {
    /// Text of the forward change statements
    Changes(String),
    /// Names of the files bulk-loaded into the graph
    Inserted(Vec<String>),
}

impl LedgerRecord {
    fn predicate(&self) -> &'static str {
        match self {
            LedgerRecord::Changes(_) => "changes",
            LedgerRecord::Inserted(_) => "inserted",
        }
    }

    fn value(&self) -> String {
        match self {
            LedgerRecord::Changes(text) => text.clone(),
            LedgerRecord::Inserted(files) => files.join(", "),
        }
    }
}

/// Connection identifiers written into every entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerContext {
    /// Metadata graph IRI (also the predicate namespace)
    pub metadata_graph: String,
    /// Graph being migrated
    pub graph: String,
    pub endpoint: String,
    pub user: String,
    pub host: String,
}

/// One applied migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: Option<String>,
    pub origin: Origin,
    pub commited: NaiveDateTime,
    pub record: LedgerRecord,
}

impl LedgerEntry {
    /// Statement adding this entry to the metadata graph
    pub fn insert_statement(&self, ctx: &LedgerContext) -> String {
        format!(
            "SPARQL INSERT INTO <{}> {{ [] {}.}};",
            ctx.metadata_graph,
            self.fields(ctx)
        )
    }

    /// Statement removing exactly the node `insert_statement` creates
    pub fn delete_statement(&self, ctx: &LedgerContext) -> String {
        format!(
            "SPARQL DELETE FROM <{}> {{?s ?p ?o}} WHERE {{?s {}; ?p ?o.}};",
            ctx.metadata_graph,
            self.fields(ctx)
        )
    }

    fn fields(&self, ctx: &LedgerContext) -> String {
        let m = &ctx.metadata_graph;
        format!(
            "owl:versionInfo \"{version}\"; \
             <{m}endpoint> \"{endpoint}\"; \
             <{m}usuario> \"{user}\"; \
             <{m}ambiente> \"{host}\"; \
             <{m}produto> \"{graph}\"; \
             <{m}commited> \"{commited}\"^^xsd:dateTime; \
             <{m}origen> \"{origin}\"; \
             <{m}{key}> \"{value}\"",
            m = m,
            version = escape_literal(self.version.as_deref().unwrap_or(ABSENT_VERSION)),
            endpoint = escape_literal(&ctx.endpoint),
            user = escape_literal(&ctx.user),
            host = escape_literal(&ctx.host),
            graph = escape_literal(&ctx.graph),
            commited = self.commited.format(COMMIT_FORMAT),
            origin = self.origin,
            key = self.record.predicate(),
            value = escape_literal(&self.record.value()),
        )
    }
}

/// Version recorded by the newest ledger entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentVersion {
    pub version: Option<String>,
    pub origin: Option<Origin>,
}

impl CurrentVersion {
    /// No ledger entry at all: the store has never been migrated
    pub fn is_virgin(&self) -> bool {
        self.version.is_none() && self.origin.is_none()
    }
}

/// Reads migration history from the metadata graph
pub struct Ledger<'a> {
    endpoint: &'a dyn SparqlEndpoint,
    metadata_graph: String,
}

impl<'a> Ledger<'a> {
    pub fn new(endpoint: &'a dyn SparqlEndpoint, metadata_graph: impl Into<String>) -> Self {
        Self {
            endpoint,
            metadata_graph: metadata_graph.into(),
        }
    }

    /// Newest `(version, origin)` recorded for `graph_name`
    ///
    /// `(None, None)` when nothing was ever recorded. A stored version of
    /// `None` means the graph is versioned without a schema version yet.
    pub fn current_version(&self, graph_name: &str) -> Result<CurrentVersion> {
        let query = SparqlQuery::current_version(&self.metadata_graph, graph_name);
        let rows = self.endpoint.select(query.as_str())?;

        let row = match rows.into_iter().next() {
            Some(row) => row,
            None => {
                debug!(graph = graph_name, "no ledger entry found");
                return Ok(CurrentVersion::default());
            }
        };

        let version = row
            .get("version")
            .filter(|v| v.as_str() != ABSENT_VERSION)
            .cloned();
        let origin = row
            .get("origen")
            .map(|o| o.parse::<Origin>())
            .transpose()?;

        Ok(CurrentVersion { version, origin })
    }
}
