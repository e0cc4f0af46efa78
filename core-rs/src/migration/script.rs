/**
 * script.rs
 * Ordered statement lists produced by the generator and consumed by the executor
 */

/// Change statements followed by exactly one ledger statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    changes: Vec<String>,
    ledger: String,
}

impl Script {
    pub fn new(changes: Vec<String>, ledger: String) -> Self {
        Self { changes, ledger }
    }

    pub fn changes(&self) -> &[String] {
        &self.changes
    }

    pub fn ledger(&self) -> &str {
        &self.ledger
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Change statements joined by newlines, as recorded in the ledger
    pub fn changes_text(&self) -> String {
        self.changes.join("\n")
    }

    /// All statements in execution order
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.ledger.as_str()))
    }

    /// One statement per line
    pub fn to_text(&self) -> String {
        self.statements().collect::<Vec<_>>().join("\n")
    }
}

/// What a pair of scripts does to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Schema change between two ontology versions
    Migration,
    /// Bulk load of turtle files, recorded without schema changes
    Load,
}

/// Forward script and the backward script that undoes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScripts {
    pub kind: ScriptKind,
    pub forward: Script,
    pub backward: Script,
}

impl MigrationScripts {
    /// A migration without change statements is skipped; a load never is
    pub fn is_nothing_to_do(&self) -> bool {
        self.kind == ScriptKind::Migration && !self.forward.has_changes()
    }
}
