//! Execution log handed to the migrator and executor
//!
//! User-facing progress ("Current version is…", executed statements, store
//! client output) goes through an `ExecutionLog` passed in by the caller.
//! Every message is also emitted as a `tracing` debug event.

use chrono::Local;
use colored::Colorize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::errors::Result;

/// Message category, rendered as a colour on consoles that ask for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Start/end banners (magenta)
    Banner,
    /// Version information (green)
    Success,
    /// Ordinary progress (cyan)
    Info,
    /// Generated statements (yellow)
    Statement,
    /// Failures and warnings (red)
    Error,
}

/// Level a message needs for the console to show it
pub const LEVEL_MIGRATION: u8 = 1;
pub const LEVEL_STATEMENT: u8 = 2;

pub trait ExecutionLog {
    /// Record a message; `level` is the minimum verbosity that displays it
    fn log(&self, message: &str, tone: Tone, level: u8);

    fn info(&self, message: &str) {
        self.log(message, Tone::Info, LEVEL_MIGRATION);
    }
}

/// Prints to stdout and optionally appends to a file under `log_dir`
pub struct ConsoleLog {
    level: u8,
    colored: bool,
    file: Mutex<Option<File>>,
}

impl ConsoleLog {
    /// `level`: 0 silent, 1 migration messages, 2 statement execution output
    pub fn new(level: u8, colored: bool) -> Self {
        Self {
            level,
            colored,
            file: Mutex::new(None),
        }
    }

    /// Also write every message to `<log_dir>/<timestamp>.log`
    pub fn with_log_dir(self, log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)?;
        let name = format!("{}.log", Local::now().format("%Y%m%d%H%M%S"));
        let file = File::create(log_dir.join(name))?;
        *self.file.lock().unwrap_or_else(|e| e.into_inner()) = Some(file);
        Ok(self)
    }

    fn paint(&self, message: &str, tone: Tone) -> String {
        if !self.colored {
            return message.to_string();
        }
        match tone {
            Tone::Banner => message.magenta().to_string(),
            Tone::Success => message.green().to_string(),
            Tone::Info => message.cyan().to_string(),
            Tone::Statement => message.yellow().to_string(),
            Tone::Error => message.red().to_string(),
        }
    }
}

impl ExecutionLog for ConsoleLog {
    fn log(&self, message: &str, tone: Tone, level: u8) {
        tracing::debug!(target: "tbox_migrate::execution", "{}", message);

        if self.level >= level {
            println!("{}", self.paint(message, tone));
        }

        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{}", message) {
                tracing::warn!("failed to write execution log file: {}", e);
            }
        }
    }
}

/// Keeps messages in memory
#[derive(Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(String, Tone, u8)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(message, _, _)| message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl ExecutionLog for MemoryLog {
    fn log(&self, message: &str, tone: Tone, level: u8) {
        tracing::debug!(target: "tbox_migrate::execution", "{}", message);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((message.to_string(), tone, level));
    }
}
