//! Bulk load of turtle files into the target graph
//!
//! Each file is placed in a directory the store can read, loaded with
//! `DB.DBA.TTLP_MT_LOCAL_FILE`, and its local copy removed again. Files are
//! loaded one by one and each gets its own outcome.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::MigrateConfig;
use crate::drivers::{RemoteTransfer, StoreClient};
use crate::errors::{MigrateError, Result};

/// How files reach the store's load directory
pub enum Placement<'a> {
    /// Store host shares our filesystem (or an allowed directory is mounted)
    Local,
    /// Copied to the store host
    Remote(&'a dyn RemoteTransfer),
}

/// Result of loading one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file: PathBuf,
    /// Client stdout on success, error text otherwise
    pub result: std::result::Result<String, String>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn file_name(&self) -> String {
        self.file.display().to_string()
    }
}

/// `.ttl` files named by `path`: the file itself, or a directory's direct entries
pub fn ttl_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(MigrateError::FileNotFound(format!(
            "file or directory does not exist ({})",
            path.display()
        )));
    }

    let mut files: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    } else {
        vec![path.to_path_buf()]
    };

    files.retain(|f| f.extension().map(|ext| ext == "ttl").unwrap_or(false));
    files.sort();
    Ok(files)
}

/// Directory the store loads files from
///
/// The configured allowed directory when there is one, otherwise the
/// store's server root.
pub fn load_directory(config: &MigrateConfig, client: &dyn StoreClient) -> Result<String> {
    match &config.virtuoso_dirs_allowed {
        Some(dir) => {
            let dir = fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            Ok(dir.display().to_string())
        }
        None => client.server_root(),
    }
}

pub struct BulkLoader<'a> {
    client: &'a dyn StoreClient,
    placement: Placement<'a>,
    load_dir: String,
    graph: String,
}

impl<'a> BulkLoader<'a> {
    pub fn new(
        client: &'a dyn StoreClient,
        placement: Placement<'a>,
        load_dir: impl Into<String>,
        graph: impl Into<String>,
    ) -> Self {
        Self {
            client,
            placement,
            load_dir: load_dir.into(),
            graph: graph.into(),
        }
    }

    pub fn load_all(&self, files: &[PathBuf]) -> Vec<FileOutcome> {
        files.iter().map(|file| self.load(file)).collect()
    }

    pub fn load(&self, file: &Path) -> FileOutcome {
        let result = match self.try_load(file) {
            Ok((stdout, stderr)) if stderr.is_empty() => Ok(stdout),
            Ok((_, stderr)) => Err(stderr),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = &result {
            warn!(file = %file.display(), "load failed: {}", e);
        }

        FileOutcome {
            file: file.to_path_buf(),
            result,
        }
    }

    /// `(stdout, stderr)` of the load command
    fn try_load(&self, file: &Path) -> Result<(String, String)> {
        let name = file
            .file_name()
            .ok_or_else(|| MigrateError::FileNotFound(file.display().to_string()))?;
        let target = Path::new(&self.load_dir).join(name);
        let target_text = target.display().to_string();

        let copied = match &self.placement {
            Placement::Local => copy_if_elsewhere(file, &target)?,
            Placement::Remote(transfer) => {
                transfer.put(file, &target_text)?;
                false
            }
        };

        let command = load_command(&target_text, &self.graph);
        debug!(file = %file.display(), target = %target_text, "loading turtle file");
        let output = self.client.run_inline(&command);

        if copied {
            if let Err(e) = fs::remove_file(&target) {
                warn!(target = %target_text, "could not remove loaded copy: {}", e);
            }
        }

        let output = output?;
        Ok((output.stdout, output.stderr))
    }
}

/// Copy unless `file` already is `target`; true when a copy was made
fn copy_if_elsewhere(file: &Path, target: &Path) -> Result<bool> {
    let origin = fs::canonicalize(file)?;
    let same = fs::canonicalize(target)
        .map(|dest| dest == origin)
        .unwrap_or(false);

    if same {
        return Ok(false);
    }
    fs::copy(&origin, target)?;
    Ok(true)
}

/// `set echo on;` + the store's bulk-load call
pub fn load_command(path: &str, graph: &str) -> String {
    format!(
        "set echo on;\nDB.DBA.TTLP_MT_LOCAL_FILE('{}', '', '{}');",
        path.replace('\'', "''"),
        graph.replace('\'', "''")
    )
}
