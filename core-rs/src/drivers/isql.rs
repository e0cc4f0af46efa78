//! Store client
//!
//! Statements reach the store through its command-line client, Virtuoso's
//! `isql`:
//!
//! ```text
//! isql -U <user> -P <password> -H <host> -S <port> -b <buffer>  < payload
//! ```
//!
//! The payload goes to stdin, either inline or from a script file. The
//! `-b` buffer is `max(payload bytes / 1000, 1)`.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::errors::{MigrateError, Result};

/// Both output channels of one client run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ClientOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Anything on stderr counts as a failed run
    pub fn failed(&self) -> bool {
        !self.stderr.is_empty()
    }
}

/// Runs statement payloads against the store
///
/// Both calls return whatever the client printed; deciding whether stderr
/// is fatal is left to the caller.
pub trait StoreClient {
    /// Feed a script file to the client
    fn run_file(&self, path: &Path) -> Result<ClientOutput>;

    /// Feed an inline command to the client
    fn run_inline(&self, command: &str) -> Result<ClientOutput>;

    /// Run a command whose stderr is a connection failure
    fn query(&self, command: &str) -> Result<String> {
        let output = self.run_inline(command)?;
        if output.failed() {
            return Err(MigrateError::Connection(output.stderr));
        }
        Ok(output.stdout)
    }

    /// Directory the store reads bulk-load files from
    fn server_root(&self) -> Result<String> {
        let stdout = self.query("select server_root();")?;
        parse_server_root(&stdout)
    }
}

/// The answer block sits second to last among blank-line separated blocks
pub fn parse_server_root(stdout: &str) -> Result<String> {
    let blocks: Vec<&str> = stdout.split("\n\n").collect();
    if blocks.len() < 2 {
        return Err(MigrateError::Connection(format!(
            "unexpected server_root() output: {}",
            stdout
        )));
    }
    Ok(blocks[blocks.len() - 2].trim().to_string())
}

/// `-b` value for a payload of `len` bytes
pub fn buffer_size(len: u64) -> u64 {
    (len / 1000).max(1)
}

/// Virtuoso's `isql`
#[derive(Debug, Clone)]
pub struct IsqlClient {
    program: String,
    user: String,
    password: String,
    host: String,
    port: u16,
}

impl IsqlClient {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            program: "isql".to_string(),
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
        }
    }

    /// Use another executable (an `isql-vt` install, a wrapper script)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn args(&self, buffer: u64) -> Vec<String> {
        vec![
            "-U".to_string(),
            self.user.clone(),
            "-P".to_string(),
            self.password.clone(),
            "-H".to_string(),
            self.host.clone(),
            "-S".to_string(),
            self.port.to_string(),
            "-b".to_string(),
            buffer.to_string(),
        ]
    }

    /// Command line for logs, password masked
    pub fn describe(&self, buffer: u64) -> String {
        format!(
            "{} -U {} -P ***** -H {} -S {} -b {}",
            self.program, self.user, self.host, self.port, buffer
        )
    }

    fn command(&self, buffer: u64) -> Command {
        debug!(command = %self.describe(buffer), "running store client");
        let mut command = Command::new(&self.program);
        command
            .args(self.args(buffer))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl StoreClient for IsqlClient {
    fn run_file(&self, path: &Path) -> Result<ClientOutput> {
        let len = std::fs::metadata(path)?.len();
        let output = self
            .command(buffer_size(len))
            .stdin(File::open(path)?)
            .output()
            .map_err(|e| MigrateError::Process(format!("Failed to run {}: {}", self.program, e)))?;

        Ok(ClientOutput::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }

    fn run_inline(&self, command: &str) -> Result<ClientOutput> {
        let mut child = self
            .command(buffer_size(command.len() as u64))
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| MigrateError::Process(format!("Failed to run {}: {}", self.program, e)))?;

        // The child is always reaped; its own stderr wins over a broken pipe
        let written = match child.stdin.take() {
            Some(mut stdin) => writeln!(stdin, "{}", command),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if let Err(e) = written {
            if output.stderr.is_empty() {
                return Err(MigrateError::Process(format!(
                    "Failed to write to {}: {}",
                    self.program, e
                )));
            }
        }
        Ok(ClientOutput::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        ))
    }
}
