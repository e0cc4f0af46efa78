//! Migration orchestration
//!
//! `Migrator::execute` picks one of two operations:
//!
//! - **migration**: read the current version from the ledger, fetch the
//!   current and destination ontologies, generate scripts, apply them;
//! - **load**: bulk-load turtle files and record them in the ledger under the
//!   current version.
//!
//! Progress goes to the injected `ExecutionLog`.

use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::MigrateConfig;
use crate::drivers::{ontology_from_file, RemoteTransfer, RunAfter, StoreClient, VersionSource};
use crate::errors::{MigrateError, Result};
use crate::ledger::{CurrentVersion, Ledger, Origin, SparqlEndpoint};
use crate::loader::{load_directory, ttl_files, BulkLoader, FileOutcome, Placement};
use crate::log::{ExecutionLog, Tone, LEVEL_MIGRATION};
use crate::migration::{MigrationExecutor, MigrationScripts, Outcome, StatementGenerator};
use crate::ontology::Graph;

/// Where the destination ontology comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Most recent tag of the version source
    Latest,
    /// A given tag
    Tag(String),
    /// A turtle file outside version control
    File(PathBuf),
}

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub destination: Destination,
    /// File or directory to bulk-load instead of migrating
    pub load: Option<PathBuf>,
    /// Print the executed statements
    pub show_sparql: bool,
    /// Print the statements without executing anything
    pub show_sparql_only: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            destination: Destination::Latest,
            load: None,
            show_sparql: false,
            show_sparql_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Migration,
    Load,
}

/// Summary of one `execute` call
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub operation: Operation,
    pub current_version: Option<String>,
    pub destination_version: Option<String>,
    /// Generated scripts, when any were generated
    pub scripts: Option<MigrationScripts>,
    /// Executor result; `None` when nothing was executed
    pub outcome: Option<Outcome>,
    /// Per-file results of a load
    pub files: Vec<FileOutcome>,
}

impl OperationResult {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            current_version: None,
            destination_version: None,
            scripts: None,
            outcome: None,
            files: Vec::new(),
        }
    }

    pub fn ok_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.is_ok())
            .map(FileOutcome::file_name)
            .collect()
    }

    pub fn failed_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|f| match &f.result {
                Err(e) => Some(format!("File {} with err {}", f.file_name(), e)),
                Ok(_) => None,
            })
            .collect()
    }
}

pub struct Migrator<'a> {
    config: &'a MigrateConfig,
    client: &'a dyn StoreClient,
    endpoint: &'a dyn SparqlEndpoint,
    versions: &'a dyn VersionSource,
    log: &'a dyn ExecutionLog,
    transfer: Option<&'a dyn RemoteTransfer>,
    run_after: Option<&'a dyn RunAfter>,
    clock: Box<dyn Fn() -> NaiveDateTime + 'a>,
}

impl<'a> Migrator<'a> {
    pub fn new(
        config: &'a MigrateConfig,
        client: &'a dyn StoreClient,
        endpoint: &'a dyn SparqlEndpoint,
        versions: &'a dyn VersionSource,
        log: &'a dyn ExecutionLog,
    ) -> Self {
        Self {
            config,
            client,
            endpoint,
            versions,
            log,
            transfer: None,
            run_after: None,
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Transfer used for loads when the store host is remote
    pub fn with_transfer(mut self, transfer: &'a dyn RemoteTransfer) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Hook called with the result once the operation succeeded
    pub fn with_run_after(mut self, hook: &'a dyn RunAfter) -> Self {
        self.run_after = Some(hook);
        self
    }

    /// Commit timestamp source
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn execute(&self, options: &RunOptions) -> Result<OperationResult> {
        self.say("\nStarting Virtuoso migration...", Tone::Banner);

        let result = match &options.load {
            Some(path) => self.load(path, options)?,
            None => self.migrate(options)?,
        };

        if let Some(hook) = self.run_after {
            self.say(
                &format!("\nExecuting run_after script {}.\n", hook.name()),
                Tone::Banner,
            );
            hook.run(&result)?;
        }

        self.say("\nDone.\n", Tone::Banner);
        Ok(result)
    }

    fn say(&self, message: &str, tone: Tone) {
        self.log.log(message, tone, LEVEL_MIGRATION);
    }

    fn current_version(&self) -> Result<CurrentVersion> {
        Ledger::new(self.endpoint, self.config.migration_graph.as_str())
            .current_version(&self.config.database_graph)
    }

    fn generator(&self) -> StatementGenerator {
        StatementGenerator::new(self.config.ledger_context())
    }

    fn migrate(&self, options: &RunOptions) -> Result<OperationResult> {
        let current = self.current_version()?;
        let current_label = label(current.version.as_deref());

        if let Destination::File(path) = &options.destination {
            let refusal = match (&current.version, current.origin) {
                (None, _) => Some("None"),
                (Some(_), Some(Origin::File)) => Some("File"),
                _ => None,
            };
            if let Some(from) = refusal {
                self.say(&format!("- Current version is: {}", current_label), Tone::Success);
                self.say(
                    &format!("- Destination version is: {}", path.display()),
                    Tone::Success,
                );
                return Err(MigrateError::InvalidMigration(format!(
                    "Can't execute migration FROM {} TO File (TIP: version it using git --tag and then use -m)",
                    from
                )));
            }
        }

        let current_ontology = match (&current.version, current.origin) {
            (None, _) => None,
            (Some(path), Some(Origin::File)) => Some(ontology_from_file(Path::new(path))?),
            (Some(version), _) => Some(self.versions.ontology_at(version)?),
        };

        let (destination_version, origin, destination_ontology) = match &options.destination {
            Destination::File(path) => (
                path.display().to_string(),
                Origin::File,
                ontology_from_file(path)?,
            ),
            Destination::Tag(tag) => {
                self.check_version(tag)?;
                (tag.clone(), Origin::Git, self.versions.ontology_at(tag)?)
            }
            Destination::Latest => {
                let tag = self.versions.latest_version()?;
                self.check_version(&tag)?;
                let ontology = self.versions.ontology_at(&tag)?;
                (tag, Origin::Git, ontology)
            }
        };

        let current_graph = current_ontology.as_deref().map(Graph::parse).transpose()?;
        let destination_graph = Graph::parse(&destination_ontology)?;

        let scripts = self.generator().migration(
            current_graph.as_ref(),
            &destination_graph,
            Some(&destination_version),
            origin,
            (self.clock)(),
        )?;

        let outcome = self.run_scripts(
            &scripts,
            &current_label,
            &destination_version,
            &[],
            options,
        )?;

        Ok(OperationResult {
            current_version: current.version,
            destination_version: Some(destination_version),
            scripts: Some(scripts),
            outcome,
            ..OperationResult::new(Operation::Migration)
        })
    }

    fn check_version(&self, version: &str) -> Result<()> {
        if !self.versions.has_version(version)? {
            return Err(MigrateError::VersionNotFound(version.to_string()));
        }
        Ok(())
    }

    fn load(&self, path: &Path, options: &RunOptions) -> Result<OperationResult> {
        let current = self.current_version()?;
        let files = ttl_files(path)?;

        let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        self.say(&format!("- TTL(s) to upload: {:?}", names), Tone::Success);

        let mut result = OperationResult::new(Operation::Load);
        if options.show_sparql_only {
            return Ok(result);
        }

        let load_dir = load_directory(self.config, self.client)?;
        let placement = if self.config.copies_locally() {
            Placement::Local
        } else {
            match self.transfer {
                Some(transfer) => Placement::Remote(transfer),
                None => {
                    return Err(MigrateError::Config(format!(
                        "no file transfer configured for remote host {}",
                        self.config.database_host
                    )))
                }
            }
        };

        let loader = BulkLoader::new(self.client, placement, load_dir, self.config.database_graph.as_str());
        result.files = loader.load_all(&files);

        let failed = result.failed_files();
        if !failed.is_empty() {
            self.say(&format!("ERRORS {:?}", failed), Tone::Error);
        }

        let out_list: Vec<String> = result
            .files
            .iter()
            .filter_map(|f| f.result.as_ref().ok().cloned())
            .collect();
        let ok_files = result.ok_files();

        if ok_files.is_empty() {
            self.say(&out_list.join("\n"), Tone::Info);
            return Ok(result);
        }

        let origin = current.origin.unwrap_or(Origin::Insert);
        let scripts = self.generator().load(
            &ok_files,
            current.version.as_deref(),
            origin,
            (self.clock)(),
        );

        let current_label = label(current.version.as_deref());
        result.outcome = self.run_scripts(&scripts, &current_label, &current_label, &out_list, options)?;
        result.current_version = current.version;
        result.scripts = Some(scripts);
        Ok(result)
    }

    fn run_scripts(
        &self,
        scripts: &MigrationScripts,
        current: &str,
        destination: &str,
        out_list: &[String],
        options: &RunOptions,
    ) -> Result<Option<Outcome>> {
        self.say(&format!("- Current version is: {}", current), Tone::Success);
        self.say(&format!("- Destination version is: {}", destination), Tone::Success);

        if options.show_sparql_only {
            self.say(
                "\nWARNING: commands are not being executed ('--showsparqlonly' activated)",
                Tone::Error,
            );
        } else {
            self.say("\nStarting Migration!", Tone::Info);
        }

        if scripts.is_nothing_to_do() {
            self.say("\nNothing to do.\n", Tone::Banner);
            return Ok(Some(Outcome::NothingToDo));
        }

        let mut outcome = None;
        if !options.show_sparql_only {
            self.say("===== executing =====", Tone::Info);
            if !out_list.is_empty() {
                self.say(&out_list.join("\n"), Tone::Info);
            }

            let executor = MigrationExecutor::new(self.client, self.log);
            outcome = Some(executor.execute(scripts)?);
            info!(from = current, to = destination, "migration applied");
        }

        if options.show_sparql || options.show_sparql_only {
            self.say("__________ SPARQL statements executed __________", Tone::Statement);
            self.say(&scripts.forward.to_text(), Tone::Statement);
            self.say("_____________________________________________", Tone::Statement);
        }

        Ok(outcome)
    }
}

fn label(version: Option<&str>) -> String {
    version.unwrap_or("None").to_string()
}
