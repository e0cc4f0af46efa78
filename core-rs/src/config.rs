/**
 * config.rs
 * Migration configuration (YAML format)
 *
 * Format:
 * ```yaml
 * database_host: localhost
 * database_port: 1111
 * database_user: dba
 * database_password: dba
 * database_endpoint: http://localhost:8890/sparql
 * database_graph: http://example.com/graph
 * database_ontology: ontology.ttl
 * database_migrations_dir: ./migrations
 * migration_graph: http://example.com/migrations/
 * run_after: ./notify.sh
 *
 * environments:
 *   production:
 *     database_host: store.example.com
 *     database_password: <<ask_me>>
 * ```
 *
 * Top-level keys are defaults; the selected environment overrides them and
 * command-line flags override both.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{MigrateError, Result};
use crate::ledger::LedgerContext;

/// Config file looked up when none is given
pub const DEFAULT_CONFIG_FILE: &str = "simple-virtuoso-migrate.yaml";

/// Password value asking for an interactive prompt
pub const ASK_ME: &str = "<<ask_me>>";

/// One layer of configuration values; every key optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigValues {
    pub database_host: Option<String>,
    pub database_port: Option<u16>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub database_endpoint: Option<String>,
    pub database_graph: Option<String>,
    pub database_ontology: Option<String>,
    pub database_migrations_dir: Option<String>,
    pub migration_graph: Option<String>,
    pub host_user: Option<String>,
    pub host_password: Option<String>,
    pub virtuoso_dirs_allowed: Option<String>,
    pub log_dir: Option<String>,
    pub log_level: Option<u8>,
    /// Executable run after every operation
    pub run_after: Option<String>,
}

impl ConfigValues {
    /// Values of `over` win where present
    pub fn merge(&mut self, over: &ConfigValues) {
        fn pick<T: Clone>(base: &mut Option<T>, over: &Option<T>) {
            if over.is_some() {
                *base = over.clone();
            }
        }

        pick(&mut self.database_host, &over.database_host);
        pick(&mut self.database_port, &over.database_port);
        pick(&mut self.database_user, &over.database_user);
        pick(&mut self.database_password, &over.database_password);
        pick(&mut self.database_endpoint, &over.database_endpoint);
        pick(&mut self.database_graph, &over.database_graph);
        pick(&mut self.database_ontology, &over.database_ontology);
        pick(&mut self.database_migrations_dir, &over.database_migrations_dir);
        pick(&mut self.migration_graph, &over.migration_graph);
        pick(&mut self.host_user, &over.host_user);
        pick(&mut self.host_password, &over.host_password);
        pick(&mut self.virtuoso_dirs_allowed, &over.virtuoso_dirs_allowed);
        pick(&mut self.log_dir, &over.log_dir);
        pick(&mut self.log_level, &over.log_level);
        pick(&mut self.run_after, &over.run_after);
    }

    /// Read a config file, applying `environment` when given
    pub fn load<P: AsRef<Path>>(path: P, environment: Option<&str>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MigrateError::FileNotFound(format!(
                "config file not found ({})",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| MigrateError::Config(format!("Invalid config YAML: {}", e)))?;

        let mut values = file.defaults;
        if let Some(name) = environment.filter(|n| !n.is_empty()) {
            let layer = file.environments.get(name).ok_or_else(|| {
                MigrateError::Config(format!("environment '{}' not found in {}", name, path.display()))
            })?;
            values.merge(layer);
        }

        Ok(values)
    }

    /// Check every required key is present and non-empty
    pub fn validate(&self) -> Result<()> {
        let required: [(&str, Option<&str>); 8] = [
            ("database_host", self.database_host.as_deref()),
            ("database_endpoint", self.database_endpoint.as_deref()),
            ("database_user", self.database_user.as_deref()),
            ("database_password", self.database_password.as_deref()),
            ("database_migrations_dir", self.database_migrations_dir.as_deref()),
            ("database_graph", self.database_graph.as_deref()),
            ("database_ontology", self.database_ontology.as_deref()),
            ("migration_graph", self.migration_graph.as_deref()),
        ];

        for (key, value) in required {
            if value.map(str::trim).unwrap_or_default().is_empty() {
                return Err(missing(key));
            }
        }

        if self.database_port.is_none() {
            return Err(missing("database_port"));
        }

        Ok(())
    }
}

fn missing(key: &str) -> MigrateError {
    MigrateError::Config(format!("missing required configuration key '{}'", key))
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    defaults: ConfigValues,
    #[serde(default)]
    environments: HashMap<String, ConfigValues>,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateConfig {
    pub database_host: String,
    pub database_port: u16,
    pub database_user: String,
    pub database_password: String,
    pub database_endpoint: String,
    pub database_graph: String,
    pub database_ontology: String,
    pub database_migrations_dir: PathBuf,
    pub migration_graph: String,
    pub host_user: Option<String>,
    pub host_password: Option<String>,
    pub virtuoso_dirs_allowed: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: u8,
    pub run_after: Option<PathBuf>,
}

impl MigrateConfig {
    /// Load a file, then apply command-line overrides
    pub fn load<P: AsRef<Path>>(
        path: P,
        environment: Option<&str>,
        overrides: &ConfigValues,
    ) -> Result<Self> {
        let mut values = ConfigValues::load(path, environment)?;
        values.merge(overrides);
        Self::from_values(values)
    }

    pub fn from_values(values: ConfigValues) -> Result<Self> {
        values.validate()?;

        // Every required key was checked above
        let required = |v: Option<String>| v.unwrap_or_default();

        // A `:`-separated list is accepted; migrations come from the first entry
        let migrations_dir = required(values.database_migrations_dir)
            .split(':')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            database_host: required(values.database_host),
            database_port: values.database_port.unwrap_or_default(),
            database_user: required(values.database_user),
            database_password: required(values.database_password),
            database_endpoint: required(values.database_endpoint),
            database_graph: required(values.database_graph),
            database_ontology: required(values.database_ontology),
            database_migrations_dir: PathBuf::from(migrations_dir),
            migration_graph: required(values.migration_graph),
            host_user: values.host_user,
            host_password: values.host_password,
            virtuoso_dirs_allowed: values.virtuoso_dirs_allowed.map(PathBuf::from),
            log_dir: values.log_dir.map(PathBuf::from),
            log_level: values.log_level.unwrap_or(1),
            run_after: values
                .run_after
                .filter(|script| !script.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Store runs on this machine
    pub fn is_local(&self) -> bool {
        matches!(
            self.database_host.to_lowercase().as_str(),
            "localhost" | "127.0.0.1"
        )
    }

    /// Bulk-load files can be copied instead of transferred
    pub fn copies_locally(&self) -> bool {
        self.is_local() || self.virtuoso_dirs_allowed.is_some()
    }

    pub fn ledger_context(&self) -> LedgerContext {
        LedgerContext {
            metadata_graph: self.migration_graph.clone(),
            graph: self.database_graph.clone(),
            endpoint: self.database_endpoint.clone(),
            user: self.database_user.clone(),
            host: self.database_host.clone(),
        }
    }
}
