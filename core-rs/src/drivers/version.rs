//! Version source abstraction
//!
//! Ontology versions are enumerated and read through `VersionSource`. The
//! shipped implementation is `GitVersionSource` (tags of the migrations
//! repository); tests provide in-memory sources.
//!
//! A destination ontology can also come straight from a file, outside any
//! version source (`ontology_from_file`).

use std::fs;
use std::path::Path;

use crate::errors::{MigrateError, Result};

/// Enumerates ontology versions and reads the ontology at a version
pub trait VersionSource {
    /// Every known version label
    ///
    /// Fails with `NoMigrationFound` when there is none.
    fn all_versions(&self) -> Result<Vec<String>>;

    /// Most recent version label
    fn latest_version(&self) -> Result<String>;

    /// Turtle text of the ontology at `version`
    fn ontology_at(&self, version: &str) -> Result<String>;

    fn has_version(&self, version: &str) -> Result<bool> {
        Ok(self.all_versions()?.iter().any(|v| v == version))
    }

    /// Human-readable backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Read a destination ontology from a turtle file
pub fn ontology_from_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(missing_file(path));
    }
    Ok(fs::read_to_string(path)?)
}

pub(crate) fn missing_file(path: &Path) -> MigrateError {
    MigrateError::FileNotFound(format!(
        "migration file does not exist ({})",
        path.display()
    ))
}
