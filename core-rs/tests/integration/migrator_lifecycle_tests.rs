//! Migrator Lifecycle Integration Tests
//!
//! Full `Migrator::execute` runs against an in-memory store and version source:
//! - First migration to the latest tag, then to a given tag
//! - Re-running the same version is nothing to do
//! - Unknown tags and refused file migrations
//! - File destination after a git version, and back to git
//! - `show_sparql_only` prints without executing
//! - A failing migration leaves graph and ledger untouched
//! - Bulk loads: per-file results, ledger entry, remote host without transfer
//! - The run_after hook sees every successful operation

mod support;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use support::{turtle, OxigraphStore, TagSource, Ticker, GRAPH, METADATA};
use tbox_migrate::errors::{MigrateError, Result};
use tbox_migrate::{
    ConfigValues, Destination, Graph, Ledger, MemoryLog, MigrateConfig, Migrator, Operation,
    OperationResult, Origin, Outcome, RunAfter, RunOptions, SparqlEndpoint,
};
use tempfile::TempDir;

const V1: &str = r#"
:Actor rdf:type owl:Class ; rdfs:label "Actor" .
:Movie rdf:type owl:Class .
:Role rdf:type owl:Class ;
    rdfs:subClassOf [ rdf:type owl:Restriction ;
                      owl:onProperty :playedBy ;
                      owl:someValuesFrom :Actor ] .
:playedBy rdf:type owl:ObjectProperty .
"#;

const V2: &str = r#"
:Actor rdf:type owl:Class ; rdfs:label "Actor" .
:Movie rdf:type owl:Class .
:SoapOpera rdf:type owl:Class ; rdfs:subClassOf :Movie .
:Role rdf:type owl:Class ;
    rdfs:subClassOf [ rdf:type owl:Restriction ;
                      owl:onProperty :playedBy ;
                      owl:allValuesFrom :Actor ] .
:playedBy rdf:type owl:ObjectProperty .
"#;

// ==================== Test Helper Functions ====================

struct Fixture {
    store: OxigraphStore,
    versions: TagSource,
    log: MemoryLog,
    ticker: Ticker,
    config: MigrateConfig,
    workdir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self::with_host("localhost", true)
    }

    fn with_host(host: &str, dirs_allowed: bool) -> Self {
        let workdir = TempDir::new().unwrap();
        let load_dir = workdir.path().join("virtuoso");
        fs::create_dir_all(&load_dir).unwrap();

        let config = MigrateConfig::from_values(ConfigValues {
            database_host: Some(host.to_string()),
            database_port: Some(1111),
            database_user: Some("dba".to_string()),
            database_password: Some("dba".to_string()),
            database_endpoint: Some("http://localhost:8890/sparql".to_string()),
            database_graph: Some(GRAPH.to_string()),
            database_ontology: Some("ontology.ttl".to_string()),
            database_migrations_dir: Some(workdir.path().display().to_string()),
            migration_graph: Some(METADATA.to_string()),
            virtuoso_dirs_allowed: dirs_allowed.then(|| load_dir.display().to_string()),
            ..Default::default()
        })
        .unwrap();

        Self {
            store: OxigraphStore::new(),
            versions: TagSource::new()
                .tag("01", &turtle(V1))
                .tag("02", &turtle(V2)),
            log: MemoryLog::new(),
            ticker: Ticker::new(),
            config,
            workdir,
        }
    }

    fn run(&self, options: RunOptions) -> Result<OperationResult> {
        Migrator::new(&self.config, &self.store, &self.store, &self.versions, &self.log)
            .with_clock(|| self.ticker.next())
            .execute(&options)
    }

    fn run_with(&self, hook: &dyn RunAfter, options: RunOptions) -> Result<OperationResult> {
        Migrator::new(&self.config, &self.store, &self.store, &self.versions, &self.log)
            .with_clock(|| self.ticker.next())
            .with_run_after(hook)
            .execute(&options)
    }

    fn migrate_to(&self, destination: Destination) -> Result<OperationResult> {
        self.run(RunOptions {
            destination,
            ..Default::default()
        })
    }

    fn load(&self, path: &Path) -> Result<OperationResult> {
        self.run(RunOptions {
            load: Some(path.to_path_buf()),
            ..Default::default()
        })
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.workdir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn current(&self) -> tbox_migrate::CurrentVersion {
        Ledger::new(&self.store, METADATA).current_version(GRAPH).unwrap()
    }

    fn load_dir(&self) -> PathBuf {
        self.workdir.path().join("virtuoso")
    }
}

/// Keeps every result it is called with
struct Recorder {
    seen: RefCell<Vec<OperationResult>>,
    fail: bool,
}

impl Recorder {
    fn new(fail: bool) -> Self {
        Self {
            seen: RefCell::new(Vec::new()),
            fail,
        }
    }
}

impl RunAfter for Recorder {
    fn name(&self) -> String {
        "notify.sh".to_string()
    }

    fn run(&self, result: &OperationResult) -> Result<()> {
        self.seen.borrow_mut().push(result.clone());
        if self.fail {
            return Err(MigrateError::Process("notify.sh exited with 1".to_string()));
        }
        Ok(())
    }
}

fn triples(body: &str) -> usize {
    Graph::parse(&turtle(body)).unwrap().len()
}

// ==================== Migration Tests ====================

#[test]
fn test_first_migration_goes_to_latest_tag() {
    let fixture = Fixture::new();

    let result = fixture.migrate_to(Destination::Latest).unwrap();

    assert_eq!(result.operation, Operation::Migration);
    assert_eq!(result.current_version, None);
    assert_eq!(result.destination_version.as_deref(), Some("02"));
    assert!(matches!(result.outcome, Some(Outcome::Applied { .. })));
    assert_eq!(fixture.store.count(GRAPH), triples(V2));

    let current = fixture.current();
    assert_eq!(current.version.as_deref(), Some("02"));
    assert_eq!(current.origin, Some(Origin::Git));

    let log = &fixture.log;
    assert!(log.contains("Starting Virtuoso migration..."));
    assert!(log.contains("- Current version is: None"));
    assert!(log.contains("- Destination version is: 02"));
    assert!(log.contains("Starting Migration!"));
    assert!(log.contains("===== executing ====="));
    assert!(log.contains("Done."));
}

#[test]
fn test_tag_then_latest() {
    let fixture = Fixture::new();

    fixture.migrate_to(Destination::Tag("01".to_string())).unwrap();
    assert_eq!(fixture.store.count(GRAPH), triples(V1));
    assert!(fixture.store.ask(":Role rdfs:subClassOf ?r . ?r owl:someValuesFrom :Actor ."));

    let result = fixture.migrate_to(Destination::Latest).unwrap();
    assert_eq!(result.current_version.as_deref(), Some("01"));
    assert_eq!(result.destination_version.as_deref(), Some("02"));

    assert_eq!(fixture.store.count(GRAPH), triples(V2));
    assert!(fixture.store.ask(":Role rdfs:subClassOf ?r . ?r owl:allValuesFrom :Actor ."));
    assert!(!fixture.store.ask("?r owl:someValuesFrom ?c ."));
    assert_eq!(fixture.current().version.as_deref(), Some("02"));
}

#[test]
fn test_rerun_same_version_is_nothing_to_do() {
    let fixture = Fixture::new();
    fixture.migrate_to(Destination::Latest).unwrap();
    let scripts_run = fixture.store.scripts.borrow().len();

    let result = fixture.migrate_to(Destination::Latest).unwrap();

    assert_eq!(result.outcome, Some(Outcome::NothingToDo));
    assert!(fixture.log.contains("Nothing to do."));
    assert_eq!(fixture.store.scripts.borrow().len(), scripts_run);
    assert_eq!(fixture.store.count(METADATA), 8);
}

#[test]
fn test_unknown_tag_is_rejected() {
    let fixture = Fixture::new();

    let err = fixture
        .migrate_to(Destination::Tag("07".to_string()))
        .unwrap_err();

    assert!(matches!(err, MigrateError::VersionNotFound(ref v) if v == "07"));
    assert!(fixture.store.scripts.borrow().is_empty());
}

#[test]
fn test_file_destination_refused_on_new_store() {
    let fixture = Fixture::new();
    let file = fixture.write("onto.ttl", &turtle(V2));

    let err = fixture.migrate_to(Destination::File(file)).unwrap_err();

    match err {
        MigrateError::InvalidMigration(message) => {
            assert!(message.contains("Can't execute migration FROM None TO File"));
            assert!(message.contains("TIP: version it using git --tag"));
        }
        other => panic!("expected an invalid migration, got {:?}", other),
    }
    assert_eq!(fixture.store.count(GRAPH), 0);
}

#[test]
fn test_file_destination_after_git_and_back() {
    let fixture = Fixture::new();
    fixture.migrate_to(Destination::Tag("01".to_string())).unwrap();

    let draft = format!("{}\n:Documentary rdf:type owl:Class .", V2);
    let file = fixture.write("draft.ttl", &turtle(&draft));

    let result = fixture.migrate_to(Destination::File(file.clone())).unwrap();
    assert_eq!(result.destination_version, Some(file.display().to_string()));
    assert_eq!(fixture.store.count(GRAPH), triples(&draft));

    let current = fixture.current();
    assert_eq!(current.version, Some(file.display().to_string()));
    assert_eq!(current.origin, Some(Origin::File));

    // a file version cannot be followed by another file
    let err = fixture.migrate_to(Destination::File(file)).unwrap_err();
    assert!(err.to_string().contains("FROM File TO File"));

    // the current ontology is read back from the file
    fixture.migrate_to(Destination::Tag("02".to_string())).unwrap();
    assert_eq!(fixture.store.count(GRAPH), triples(V2));
    assert!(!fixture.store.ask(":Documentary ?p ?o ."));
    assert_eq!(fixture.current().origin, Some(Origin::Git));
}

#[test]
fn test_show_sparql_only_executes_nothing() {
    let fixture = Fixture::new();

    let result = fixture
        .run(RunOptions {
            show_sparql_only: true,
            ..Default::default()
        })
        .unwrap();

    assert_eq!(result.outcome, None);
    assert!(result.scripts.is_some());
    assert!(fixture.store.scripts.borrow().is_empty());
    assert_eq!(fixture.store.count(GRAPH), 0);
    assert!(fixture.current().is_virgin());

    let log = &fixture.log;
    assert!(log.contains("WARNING: commands are not being executed ('--showsparqlonly' activated)"));
    assert!(log.contains("SPARQL statements executed"));
    assert!(log.contains(&format!("SPARQL INSERT INTO <{}>", GRAPH)));
    assert!(!log.contains("===== executing ====="));
}

#[test]
fn test_failed_migration_leaves_store_untouched() {
    let fixture = Fixture::new();
    fixture.store.fail_on(&format!(
        "INSERT INTO <{}> {{<http://example.com/Actor> \
         <http://www.w3.org/2000/01/rdf-schema#label> \"Actor\"",
        GRAPH
    ));

    let err = fixture.migrate_to(Destination::Latest).unwrap_err();

    assert!(matches!(err, MigrateError::MigrationRolledBack { .. }));
    assert_eq!(fixture.store.count(GRAPH), 0);
    assert_eq!(fixture.store.count(METADATA), 0);
    assert!(fixture.current().is_virgin());
}

// ==================== Load Tests ====================

#[test]
fn test_load_records_inserted_files() {
    let fixture = Fixture::new();
    fixture.migrate_to(Destination::Tag("01".to_string())).unwrap();

    let source = fixture.workdir.path().join("data");
    fs::create_dir_all(&source).unwrap();
    fs::write(
        source.join("actors.ttl"),
        "<http://example.com/alice> a <http://example.com/Actor> .",
    )
    .unwrap();
    fs::write(source.join("broken.ttl"), "<http://example.com/bob> a .").unwrap();
    fs::write(source.join("readme.md"), "not loaded").unwrap();

    let result = fixture.load(&source).unwrap();

    assert_eq!(result.operation, Operation::Load);
    assert_eq!(result.files.len(), 2);
    assert_eq!(result.ok_files().len(), 1);
    assert!(result.ok_files()[0].ends_with("actors.ttl"));
    let failed = result.failed_files();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].starts_with("File "));
    assert!(failed[0].contains("broken.ttl with err"));
    assert!(fixture.log.contains("ERRORS"));

    assert!(fixture.store.ask("<http://example.com/alice> a :Actor ."));
    assert_eq!(fs::read_dir(fixture.load_dir()).unwrap().count(), 0);

    // same version, recorded again with the loaded files
    let current = fixture.current();
    assert_eq!(current.version.as_deref(), Some("01"));
    assert_eq!(current.origin, Some(Origin::Git));
    assert_eq!(fixture.store.count(METADATA), 16);

    let rows = fixture
        .store
        .select(&format!(
            "SELECT ?files WHERE {{ GRAPH <{m}> {{ ?s <{m}inserted> ?files }} }}",
            m = METADATA
        ))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["files"].ends_with("actors.ttl"));
}

#[test]
fn test_load_on_new_store_records_absent_version() {
    let fixture = Fixture::new();
    let file = fixture.write(
        "actors.ttl",
        "<http://example.com/alice> a <http://example.com/Actor> .",
    );

    let result = fixture.load(&file).unwrap();
    assert_eq!(result.current_version, None);
    assert!(matches!(result.outcome, Some(Outcome::Applied { .. })));

    let current = fixture.current();
    assert_eq!(current.version, None);
    assert_eq!(current.origin, Some(Origin::Insert));
    assert!(!current.is_virgin());

    // still no schema version to migrate a file from
    let draft = fixture.write("draft.ttl", &turtle(V1));
    let err = fixture.migrate_to(Destination::File(draft)).unwrap_err();
    assert!(err.to_string().contains("FROM None TO File"));
}

#[test]
fn test_load_with_only_failures_writes_no_ledger_entry() {
    let fixture = Fixture::new();
    let file = fixture.write("broken.ttl", "<http://example.com/bob> a .");

    let result = fixture.load(&file).unwrap();

    assert!(result.ok_files().is_empty());
    assert_eq!(result.outcome, None);
    assert_eq!(fixture.store.count(METADATA), 0);
}

#[test]
fn test_load_to_remote_host_needs_transfer() {
    let fixture = Fixture::with_host("store.example.com", false);
    let file = fixture.write(
        "actors.ttl",
        "<http://example.com/alice> a <http://example.com/Actor> .",
    );

    let err = fixture.load(&file).unwrap_err();

    assert!(matches!(err, MigrateError::Config(_)));
    assert!(err.to_string().contains("store.example.com"));
}

#[test]
fn test_load_missing_path() {
    let fixture = Fixture::new();

    let err = fixture
        .load(&fixture.workdir.path().join("missing"))
        .unwrap_err();

    assert!(matches!(err, MigrateError::FileNotFound(_)));
}

// ==================== Run After Tests ====================

#[test]
fn test_run_after_receives_migration_result() {
    let fixture = Fixture::new();
    let hook = Recorder::new(false);

    let result = fixture.run_with(&hook, RunOptions::default()).unwrap();

    let seen = hook.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], result);
    assert_eq!(seen[0].destination_version.as_deref(), Some("02"));

    let messages = fixture.log.messages();
    let banner = messages
        .iter()
        .position(|m| m.contains("Executing run_after script notify.sh."))
        .unwrap();
    let done = messages.iter().position(|m| m == "\nDone.\n").unwrap();
    assert!(banner < done);
}

#[test]
fn test_run_after_receives_load_result() {
    let fixture = Fixture::new();
    fixture.migrate_to(Destination::Tag("01".to_string())).unwrap();
    let file = fixture.write(
        "actors.ttl",
        "<http://example.com/alice> a <http://example.com/Actor> .",
    );
    let hook = Recorder::new(false);

    fixture
        .run_with(
            &hook,
            RunOptions {
                load: Some(file),
                ..Default::default()
            },
        )
        .unwrap();

    let seen = hook.seen.borrow();
    assert_eq!(seen[0].operation, Operation::Load);
    assert_eq!(seen[0].ok_files().len(), 1);
}

#[test]
fn test_run_after_skipped_when_operation_fails() {
    let fixture = Fixture::new();
    let hook = Recorder::new(false);

    let err = fixture
        .run_with(
            &hook,
            RunOptions {
                destination: Destination::Tag("07".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, MigrateError::VersionNotFound(_)));
    assert!(hook.seen.borrow().is_empty());
    assert!(!fixture.log.contains("Executing run_after script"));
}

#[test]
fn test_run_after_failure_is_reported_after_migration() {
    let fixture = Fixture::new();
    let hook = Recorder::new(true);

    let err = fixture.run_with(&hook, RunOptions::default()).unwrap_err();

    assert!(matches!(err, MigrateError::Process(ref m) if m.contains("notify.sh")));
    // the migration itself stays applied
    assert_eq!(fixture.current().version.as_deref(), Some("02"));
    assert!(!fixture.log.messages().iter().any(|m| m == "\nDone.\n"));
}
