//! Post-operation hook
//!
//! Runs once after a migration or a load, with the operation's result. The
//! shipped implementation executes a configured program; the result is
//! passed through the environment:
//!
//! ```text
//! SVM_OPERATION            migration | load
//! SVM_CURRENT_VERSION      version before the operation ("None" when absent)
//! SVM_DESTINATION_VERSION  version after the operation ("None" when absent)
//! SVM_LOADED_FILES         loaded files, ", "-separated
//! SVM_FAILED_FILES         failed loads, one per line
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::errors::{MigrateError, Result};
use crate::ledger::ABSENT_VERSION;
use crate::migrator::{Operation, OperationResult};

pub trait RunAfter {
    /// Name shown in the execution log
    fn name(&self) -> String;

    fn run(&self, result: &OperationResult) -> Result<()>;
}

/// External program run after the operation
#[derive(Debug, Clone)]
pub struct RunAfterCommand {
    program: PathBuf,
}

impl RunAfterCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RunAfter for RunAfterCommand {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn run(&self, result: &OperationResult) -> Result<()> {
        let operation = match result.operation {
            Operation::Migration => "migration",
            Operation::Load => "load",
        };
        let version = |v: &Option<String>| v.clone().unwrap_or_else(|| ABSENT_VERSION.to_string());

        debug!(program = %self.name(), operation, "running post-operation program");
        let output = Command::new(&self.program)
            .env("SVM_OPERATION", operation)
            .env("SVM_CURRENT_VERSION", version(&result.current_version))
            .env("SVM_DESTINATION_VERSION", version(&result.destination_version))
            .env("SVM_LOADED_FILES", result.ok_files().join(", "))
            .env("SVM_FAILED_FILES", result.failed_files().join("\n"))
            .output()
            .map_err(|e| MigrateError::Process(format!("Failed to run {}: {}", self.name(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::Process(format!(
                "run_after script {} failed: {}",
                self.name(),
                stderr.trim()
            )));
        }
        Ok(())
    }
}
