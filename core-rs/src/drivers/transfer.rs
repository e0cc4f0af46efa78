//! Remote file transfer for bulk loads on a store running on another host

use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::errors::{MigrateError, Result};

/// Puts a local file at a path on the store host
pub trait RemoteTransfer {
    fn put(&self, local: &Path, remote: &str) -> Result<()>;
}

/// `scp` to the store host, through `sshpass` when a password is configured
#[derive(Debug, Clone)]
pub struct ScpTransfer {
    host: String,
    user: Option<String>,
    password: Option<String>,
}

impl ScpTransfer {
    pub fn new(host: impl Into<String>, user: Option<String>, password: Option<String>) -> Self {
        Self {
            host: host.into(),
            user,
            password,
        }
    }

    fn destination(&self, remote: &str) -> String {
        match &self.user {
            Some(user) => format!("{}@{}:{}", user, self.host, remote),
            None => format!("{}:{}", self.host, remote),
        }
    }

    fn command(&self, local: &Path, remote: &str) -> Command {
        let target = self.destination(remote);
        match &self.password {
            Some(password) => {
                let mut command = Command::new("sshpass");
                command.arg("-p").arg(password).arg("scp").arg(local).arg(target);
                command
            }
            None => {
                let mut command = Command::new("scp");
                command.arg("-B").arg(local).arg(target);
                command
            }
        }
    }
}

impl RemoteTransfer for ScpTransfer {
    fn put(&self, local: &Path, remote: &str) -> Result<()> {
        debug!(file = %local.display(), target = %self.destination(remote), "copying to store host");

        let output = self
            .command(local, remote)
            .output()
            .map_err(|e| MigrateError::Process(format!("Failed to run scp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::Process(format!(
                "scp to {} failed: {}",
                self.host,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
