//! Git version source
//!
//! Ontology versions are the tags of the migrations repository; the ontology
//! at a version is the ontology file as committed at that tag.
//!
//! ```text
//! git tag -l                          -> all versions (cached)
//! git describe --abbrev=0 --tags      -> latest version
//! git show <tag>:<ontology file>      -> ontology text
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::drivers::version::{missing_file, VersionSource};
use crate::errors::{MigrateError, Result};

/// Tags of a local git repository as ontology versions
#[derive(Debug)]
pub struct GitVersionSource {
    migrations_dir: PathBuf,
    ontology: String,
    tags: RefCell<Option<Vec<String>>>,
}

impl GitVersionSource {
    /// `ontology` is the ontology file path relative to `migrations_dir`
    pub fn new(migrations_dir: impl Into<PathBuf>, ontology: impl Into<String>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            ontology: ontology.into(),
            tags: RefCell::new(None),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    fn dir_label(&self) -> String {
        self.migrations_dir.display().to_string()
    }

    /// Run git in the migrations directory, returning stdout
    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.migrations_dir)
            .output()
            .map_err(|e| MigrateError::Process(format!("Failed to run git {}: {}", args[0], e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::Process(format!(
                "git {} failed: {}",
                args[0],
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn check_repository(&self) -> Result<()> {
        if !self.migrations_dir.is_dir() {
            return Err(MigrateError::DirectoryNotFound(self.dir_label()));
        }
        if !self.migrations_dir.join(".git").exists() {
            return Err(MigrateError::InvalidRepository(self.dir_label()));
        }
        Ok(())
    }
}

impl VersionSource for GitVersionSource {
    fn all_versions(&self) -> Result<Vec<String>> {
        if let Some(tags) = self.tags.borrow().as_ref() {
            return Ok(tags.clone());
        }

        self.check_repository()?;
        let tags: Vec<String> = self
            .git(&["tag", "-l"])?
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if tags.is_empty() {
            return Err(MigrateError::NoMigrationFound);
        }

        debug!(count = tags.len(), "git tags read");
        *self.tags.borrow_mut() = Some(tags.clone());
        Ok(tags)
    }

    fn latest_version(&self) -> Result<String> {
        self.check_repository()?;
        let latest = self.git(&["describe", "--abbrev=0", "--tags"])?;
        Ok(latest.trim().to_string())
    }

    fn ontology_at(&self, version: &str) -> Result<String> {
        let working_copy = self.migrations_dir.join(&self.ontology);
        if !working_copy.exists() {
            return Err(missing_file(&working_copy));
        }

        let spec = format!("{}:{}", version, self.ontology);
        self.git(&["show", &spec])
    }

    fn backend_name(&self) -> &'static str {
        "git"
    }
}
