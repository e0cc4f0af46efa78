/**
 * migration module
 *
 * - script: forward/backward statement lists
 * - generator: diff → scripts, including the ledger statements
 * - executor: applies scripts through the store client, with rollback
 */

pub mod executor;
pub mod generator;
pub mod script;

pub use executor::{MigrationExecutor, Outcome};
pub use generator::StatementGenerator;
pub use script::{MigrationScripts, Script, ScriptKind};
