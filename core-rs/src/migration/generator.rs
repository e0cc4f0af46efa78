//! Statement generator
//!
//! Turns the two directed diffs between the current and destination ontology
//! into a forward and a backward script. Every statement is a single line,
//! prefixed with `SPARQL ` for the isql client and scoped to the target graph:
//!
//! ```text
//! SPARQL INSERT INTO <g> {<s> <p> <o> . };
//! SPARQL DELETE FROM <g> {<s> <p> <o> . };
//! SPARQL INSERT INTO <g> { <s> <p> [ <p1> <o1> ; <p2> <o2> ] };
//! SPARQL DELETE FROM <g> { <s> <p> ?s . ?s <p1> <o1> ; <p2> <o2> . } WHERE { … };
//! ```
//!
//! Blank structures come first, then plain triples, each in diff order.

use chrono::NaiveDateTime;
use oxigraph::model::{Subject, Term, Triple};
use tracing::debug;

use crate::errors::Result;
use crate::ledger::{LedgerContext, LedgerEntry, LedgerRecord, Origin};
use crate::migration::script::{MigrationScripts, Script, ScriptKind};
use crate::ontology::correlator::{correlate, BlankStructure, BlankSubgraph};
use crate::ontology::graph::{Diff, Graph};
use crate::ontology::term::{self, BlankStyle};

pub struct StatementGenerator {
    ctx: LedgerContext,
}

impl StatementGenerator {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    /// Scripts taking the store from `current` to `destination` and back
    ///
    /// `current` is `None` for the very first migration of a store.
    pub fn migration(
        &self,
        current: Option<&Graph>,
        destination: &Graph,
        version: Option<&str>,
        origin: Origin,
        commited: NaiveDateTime,
    ) -> Result<MigrationScripts> {
        let empty;
        let current = match current {
            Some(graph) => graph,
            None => {
                empty = Graph::empty()?;
                &empty
            }
        };

        let added = destination.difference(current);
        let removed = current.difference(destination);
        debug!(added = added.len(), removed = removed.len(), "ontology diff");

        let added_structures = correlate(&added, current)?;
        let removed_structures = correlate(&removed, destination)?;

        let mut forward = self.inserts(&added_structures, &added);
        forward.extend(self.deletes(&removed_structures, &removed));

        let mut backward = self.deletes(&added_structures, &added);
        backward.extend(self.inserts(&removed_structures, &removed));

        let entry = LedgerEntry {
            version: version.map(str::to_string),
            origin,
            commited,
            record: LedgerRecord::Changes(forward.join("\n")),
        };

        Ok(MigrationScripts {
            kind: ScriptKind::Migration,
            forward: Script::new(forward, entry.insert_statement(&self.ctx)),
            backward: Script::new(backward, entry.delete_statement(&self.ctx)),
        })
    }

    /// Ledger-only scripts recording a bulk load of `files`
    pub fn load(
        &self,
        files: &[String],
        version: Option<&str>,
        origin: Origin,
        commited: NaiveDateTime,
    ) -> MigrationScripts {
        let entry = LedgerEntry {
            version: version.map(str::to_string),
            origin,
            commited,
            record: LedgerRecord::Inserted(files.to_vec()),
        };

        MigrationScripts {
            kind: ScriptKind::Load,
            forward: Script::new(Vec::new(), entry.insert_statement(&self.ctx)),
            backward: Script::new(Vec::new(), entry.delete_statement(&self.ctx)),
        }
    }

    fn inserts(&self, structures: &[BlankStructure<'_>], diff: &Diff) -> Vec<String> {
        structures
            .iter()
            .map(|s| self.insert_structure(s))
            .chain(plain_triples(diff).map(|t| self.insert_triple(t)))
            .collect()
    }

    fn deletes(&self, structures: &[BlankStructure<'_>], diff: &Diff) -> Vec<String> {
        structures
            .iter()
            .map(|s| self.delete_structure(s))
            .chain(plain_triples(diff).map(|t| self.delete_triple(t)))
            .collect()
    }

    pub fn insert_triple(&self, triple: &Triple) -> String {
        format!(
            "SPARQL INSERT INTO <{}> {{{} . }};",
            self.ctx.graph,
            render_triple(triple)
        )
    }

    pub fn delete_triple(&self, triple: &Triple) -> String {
        format!(
            "SPARQL DELETE FROM <{}> {{{} . }};",
            self.ctx.graph,
            render_triple(triple)
        )
    }

    pub fn insert_structure(&self, structure: &BlankStructure<'_>) -> String {
        let body = if structure.is_simple() {
            bracket_body(structure.root())
        } else {
            structure.pattern(BlankStyle::Label)
        };
        format!("SPARQL INSERT INTO <{}> {{ {} }};", self.ctx.graph, body)
    }

    pub fn delete_structure(&self, structure: &BlankStructure<'_>) -> String {
        let pattern = if structure.is_simple() {
            bound_pattern(structure.root())
        } else {
            structure.pattern(BlankStyle::Variable)
        };
        format!(
            "SPARQL DELETE FROM <{}> {{ {p} }} WHERE {{ {p} }};",
            self.ctx.graph,
            p = pattern
        )
    }
}

/// Triples with no blank node at either end
fn plain_triples(diff: &Diff) -> impl Iterator<Item = &Triple> {
    diff.triples().iter().filter(|t| {
        !matches!(t.subject, Subject::BlankNode(_)) && !matches!(t.object, Term::BlankNode(_))
    })
}

fn render_triple(triple: &Triple) -> String {
    format!(
        "{} {} {}",
        term::subject(&triple.subject, BlankStyle::Label),
        term::iri(&triple.predicate),
        term::term(&triple.object, BlankStyle::Label)
    )
}

/// `S P [ p1 o1 ; p2 o2 ]`, or `[ p1 o1 ; p2 o2 ] .` without an anchor
fn bracket_body(group: &BlankSubgraph<'_>) -> String {
    let properties = group.property_list(BlankStyle::Label);
    let node = if properties.is_empty() {
        "[ ]".to_string()
    } else {
        format!("[ {} ]", properties)
    };

    match group.anchors.first() {
        Some((subject, predicate)) => format!(
            "{} {} {}",
            term::subject(subject, BlankStyle::Label),
            term::iri(predicate),
            node
        ),
        None => format!("{} .", node),
    }
}

/// `S P ?s . ?s p1 o1 ; p2 o2 .`
fn bound_pattern(group: &BlankSubgraph<'_>) -> String {
    let mut parts = Vec::new();
    for (subject, predicate) in &group.anchors {
        parts.push(format!(
            "{} {} ?s .",
            term::subject(subject, BlankStyle::Variable),
            term::iri(predicate)
        ));
    }

    let properties = group.property_list(BlankStyle::Variable);
    if !properties.is_empty() {
        parts.push(format!("?s {} .", properties));
    }
    parts.join(" ")
}
