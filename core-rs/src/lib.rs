//! # tbox-migrate - schema migrations for RDF triple stores
//!
//! Migrates the T-BOX (ontology) of a graph in a triple store from one
//! version to another. Versions are git tags of a migrations repository (or a
//! standalone turtle file); the store keeps its own migration history in a
//! metadata graph.
//!
//! ## Pipeline
//!
//! ```text
//! current ontology ──┐
//!                    ├─► Graph::difference (both directions)
//! destination ───────┘          │
//!                               ▼
//!                  correlate blank-node structures
//!                               │
//!                               ▼
//!             StatementGenerator → forward / backward scripts
//!                               │     (+ one ledger statement each)
//!                               ▼
//!            MigrationExecutor → store client, rollback on error
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tbox_migrate::{ConsoleLog, GitVersionSource, HttpEndpoint, IsqlClient};
//! use tbox_migrate::{ConfigValues, MigrateConfig, Migrator, RunOptions};
//!
//! # fn main() -> tbox_migrate::errors::Result<()> {
//! let config = MigrateConfig::load("simple-virtuoso-migrate.yaml", None, &ConfigValues::default())?;
//! let client = IsqlClient::new(
//!     config.database_user.clone(),
//!     config.database_password.clone(),
//!     config.database_host.clone(),
//!     config.database_port,
//! );
//! let endpoint = HttpEndpoint::new(config.database_endpoint.clone());
//! let versions = GitVersionSource::new(&config.database_migrations_dir, config.database_ontology.clone());
//! let log = ConsoleLog::new(config.log_level, false);
//!
//! let result = Migrator::new(&config, &client, &endpoint, &versions, &log)
//!     .execute(&RunOptions::default())?;
//! println!("now at {:?}", result.destination_version);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drivers;
pub mod errors;
pub mod ledger;
pub mod loader;
pub mod log;
pub mod migration;
pub mod migrator;
pub mod ontology;

pub use config::{ConfigValues, MigrateConfig, ASK_ME, DEFAULT_CONFIG_FILE};
pub use drivers::{
    ClientOutput, GitVersionSource, IsqlClient, RemoteTransfer, RunAfter, RunAfterCommand,
    ScpTransfer, StoreClient, VersionSource,
};
pub use errors::MigrateError;
pub use ledger::{
    CurrentVersion, HttpEndpoint, Ledger, LedgerContext, LedgerEntry, LedgerRecord, Origin,
    SparqlEndpoint,
};
pub use loader::{BulkLoader, FileOutcome, Placement};
pub use log::{ConsoleLog, ExecutionLog, MemoryLog, Tone};
pub use migration::{
    MigrationExecutor, MigrationScripts, Outcome, Script, ScriptKind, StatementGenerator,
};
pub use migrator::{Destination, Migrator, Operation, OperationResult, RunOptions};
pub use ontology::{Diff, Graph};

/// Crate version, reported by `svm --version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
