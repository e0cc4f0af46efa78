//! Migration executor
//!
//! Applies a forward script through the store client and, when the client
//! reports an error, applies the backward script once. Scripts are written
//! to temporary files that are removed on every exit path.

use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::drivers::StoreClient;
use crate::errors::{MigrateError, Result};
use crate::log::{ExecutionLog, Tone, LEVEL_STATEMENT};
use crate::migration::script::{MigrationScripts, Script};

/// Result of a successful `execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Migration without change statements; nothing ran
    NothingToDo,
    /// Forward script applied; client stdout attached
    Applied { stdout: String },
}

pub struct MigrationExecutor<'a> {
    client: &'a dyn StoreClient,
    log: &'a dyn ExecutionLog,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(client: &'a dyn StoreClient, log: &'a dyn ExecutionLog) -> Self {
        Self { client, log }
    }

    pub fn execute(&self, scripts: &MigrationScripts) -> Result<Outcome> {
        if scripts.is_nothing_to_do() {
            return Ok(Outcome::NothingToDo);
        }

        let up = write_script("file_up", &scripts.forward)?;
        let output = self.client.run_file(up.path())?;

        if output.failed() {
            warn!("forward script failed, rolling back");
            let rollback = write_script("file_down", &scripts.backward)
                .and_then(|down| self.client.run_file(down.path()));

            return Err(match rollback {
                Ok(rollback) if !rollback.failed() => MigrateError::MigrationRolledBack {
                    forward: output.stderr,
                },
                Ok(rollback) => MigrateError::MigrationPartiallyRolledBack {
                    forward: output.stderr,
                    rollback: rollback.stderr,
                },
                // the backward script never ran; the forward one may be half applied
                Err(e) => MigrateError::MigrationPartiallyRolledBack {
                    forward: output.stderr,
                    rollback: e.to_string(),
                },
            });
        }

        info!(statements = scripts.forward.changes().len(), "forward script applied");
        self.log.log(&output.stdout, Tone::Info, LEVEL_STATEMENT);
        Ok(Outcome::Applied {
            stdout: output.stdout,
        })
    }
}

/// `set echo on;` followed by the script, in a file deleted on drop
fn write_script(prefix: &str, script: &Script) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".sql")
        .tempfile()?;
    write!(file, "set echo on;\n{}", script.to_text())?;
    file.flush()?;
    Ok(file)
}
