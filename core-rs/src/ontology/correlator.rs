//! Blank-node correlation
//!
//! Blank nodes get fresh handles on every parse, so the same restriction
//! written in two versions of an ontology shows up on both sides of a diff.
//! The correlator groups diff triples by blank subject and asks the opposite
//! graph whether a structurally equivalent node already exists there: some
//! node reachable through every anchor `(subject, predicate)` and carrying
//! every content `(predicate, object)` pair. Only subgraphs without such a
//! match are real changes.
//!
//! Triples whose object is a blank node are never changes on their own; they
//! are the anchors of the subgraph rooted at that node.

use oxigraph::model::{BlankNode, NamedNode, Subject, Term, Triple};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::errors::Result;
use crate::ontology::graph::{Diff, Graph};
use crate::ontology::query::SparqlQuery;
use crate::ontology::term::{self, BlankStyle};

/// Diff triples rooted at one blank node
#[derive(Debug, Clone, PartialEq)]
pub struct BlankSubgraph<'a> {
    pub node: &'a BlankNode,
    /// `(subject, predicate)` of diff triples pointing at the node
    pub anchors: Vec<(&'a Subject, &'a NamedNode)>,
    /// `(predicate, object)` of diff triples with the node as subject
    pub content: Vec<(&'a NamedNode, &'a Term)>,
}

impl<'a> BlankSubgraph<'a> {
    /// `p1 o1 ; p2 o2`
    pub fn property_list(&self, style: BlankStyle) -> String {
        self.content
            .iter()
            .map(|(predicate, object)| {
                format!("{} {}", term::iri(predicate), term::term(object, style))
            })
            .collect::<Vec<_>>()
            .join(" ; ")
    }
}

/// Group the diff's triples by blank node, once per node, in diff order
///
/// A blank node gets a group when it is the subject of a diff triple, or the
/// object of one while carrying no content of its own (`:a :p [] .`).
pub fn blank_subgraphs(diff: &Diff) -> Vec<BlankSubgraph<'_>> {
    let triples = diff.triples();

    // Arena index: blank node -> positions of anchor triples
    let mut anchors_by_node: HashMap<&BlankNode, Vec<usize>> = HashMap::new();
    for (idx, triple) in triples.iter().enumerate() {
        if let Term::BlankNode(node) = &triple.object {
            anchors_by_node.entry(node).or_default().push(idx);
        }
    }

    let mut visited: HashSet<&BlankNode> = HashSet::new();
    let mut groups = Vec::new();

    for triple in triples {
        let ends = [blank_subject(triple), blank_object(triple)];
        for node in ends.into_iter().flatten() {
            if !visited.insert(node) {
                continue;
            }

            let anchors = anchors_by_node
                .get(node)
                .map(|positions| {
                    positions
                        .iter()
                        .map(|&idx| (&triples[idx].subject, &triples[idx].predicate))
                        .collect()
                })
                .unwrap_or_default();

            let content = triples
                .iter()
                .filter(|t| blank_subject(t) == Some(node))
                .map(|t| (&t.predicate, &t.object))
                .collect();

            groups.push(BlankSubgraph {
                node,
                anchors,
                content,
            });
        }
    }

    groups
}

/// Blank subgraphs linked to each other through blank-to-blank triples
///
/// Nested structure (`owl:unionOf` lists, restrictions inside restrictions)
/// has to be written in a single statement, otherwise the labels joining the
/// parts would denote different nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BlankStructure<'a> {
    /// Member subgraphs, in diff order
    pub groups: Vec<BlankSubgraph<'a>>,
}

impl<'a> BlankStructure<'a> {
    /// Outermost subgraph: not hanging off another node of the structure
    pub fn root(&self) -> &BlankSubgraph<'a> {
        self.groups
            .iter()
            .find(|g| {
                g.anchors.iter().all(|(subject, _)| match subject {
                    Subject::BlankNode(b) => !self.contains(b),
                    _ => true,
                })
            })
            .unwrap_or(&self.groups[0])
    }

    /// One node, at most one anchor, no blank objects
    pub fn is_simple(&self) -> bool {
        self.groups.len() == 1
            && self.groups[0].anchors.len() <= 1
            && self.groups[0]
                .content
                .iter()
                .all(|(_, object)| !matches!(object, Term::BlankNode(_)))
    }

    pub fn contains(&self, node: &BlankNode) -> bool {
        self.groups.iter().any(|g| g.node == node)
    }

    /// Every node under its own label (or variable), joined by shared names
    ///
    /// Anchors from blank subjects inside the structure are skipped: the
    /// parent's content already carries that triple.
    pub fn pattern(&self, style: BlankStyle) -> String {
        let mut parts = Vec::new();

        for group in &self.groups {
            let node = term::blank(group.node, style);

            for (subject, predicate) in &group.anchors {
                if let Subject::BlankNode(b) = subject {
                    if self.contains(b) {
                        continue;
                    }
                }
                parts.push(format!(
                    "{} {} {} .",
                    term::subject(subject, style),
                    term::iri(predicate),
                    node
                ));
            }

            let properties = group.property_list(style);
            if !properties.is_empty() {
                parts.push(format!("{} {} .", node, properties));
            }
        }

        parts.join(" ")
    }

    /// Structural ASK over the whole structure, blank nodes as variables
    pub fn match_query(&self) -> SparqlQuery {
        SparqlQuery::structure_match(&self.pattern(BlankStyle::Variable))
    }
}

/// Split subgraphs into connected structures, keeping diff order
pub fn blank_structures<'a>(groups: Vec<BlankSubgraph<'a>>) -> Vec<BlankStructure<'a>> {
    let index: HashMap<&BlankNode, usize> = groups
        .iter()
        .enumerate()
        .map(|(idx, g)| (g.node, idx))
        .collect();

    // Union-find over group positions, smallest position as representative
    let mut parent: Vec<usize> = (0..groups.len()).collect();
    fn find(parent: &mut [usize], mut idx: usize) -> usize {
        while parent[idx] != idx {
            parent[idx] = parent[parent[idx]];
            idx = parent[idx];
        }
        idx
    }

    for (idx, group) in groups.iter().enumerate() {
        let linked = group
            .content
            .iter()
            .filter_map(|(_, object)| match object {
                Term::BlankNode(b) => index.get(b),
                _ => None,
            })
            .chain(group.anchors.iter().filter_map(|(subject, _)| match subject {
                Subject::BlankNode(b) => index.get(b),
                _ => None,
            }));

        for &other in linked.collect::<Vec<_>>() {
            let (a, b) = (find(&mut parent, idx), find(&mut parent, other));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }
    }

    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut structures: Vec<BlankStructure<'a>> = Vec::new();
    for (idx, group) in groups.into_iter().enumerate() {
        let root = find(&mut parent, idx);
        match slots.get(&root) {
            Some(&slot) => structures[slot].groups.push(group),
            None => {
                slots.insert(root, structures.len());
                structures.push(BlankStructure {
                    groups: vec![group],
                });
            }
        }
    }

    structures
}

/// Blank structures of `diff` with no structural match in `opposite`
///
/// The match is one query per structure, so every node must be found in the
/// same structure of the opposite graph.
pub fn correlate<'a>(diff: &'a Diff, opposite: &Graph) -> Result<Vec<BlankStructure<'a>>> {
    let mut genuine = Vec::new();

    for structure in blank_structures(blank_subgraphs(diff)) {
        if opposite.ask(structure.match_query().as_str())? {
            debug!(node = %structure.root().node, "blank structure already present, skipping");
            continue;
        }
        genuine.push(structure);
    }

    Ok(genuine)
}

fn blank_subject(triple: &Triple) -> Option<&BlankNode> {
    match &triple.subject {
        Subject::BlankNode(b) => Some(b),
        _ => None,
    }
}

fn blank_object(triple: &Triple) -> Option<&BlankNode> {
    match &triple.object {
        Term::BlankNode(b) => Some(b),
        _ => None,
    }
}
