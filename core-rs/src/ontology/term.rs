//! Canonical textual rendering of RDF terms
//!
//! Every statement the generator emits is built from these renderings, so the
//! same term always produces the same text. IRIs are written in full
//! (`<http://…>`), literals carry their datatype (`"1"^^<…#nonNegativeInteger>`)
//! or language tag (`"parte"@pt`), and plain `xsd:string` literals are written
//! bare. Blank nodes depend on where they end up:
//!
//! - inside inserted data they keep a label (`_:b0`),
//! - inside a match pattern they become a variable (`?bb0`), since a blank
//!   node cannot be referenced by identity from a later statement.

use oxigraph::model::vocab::xsd;
use oxigraph::model::{BlankNode, Literal, NamedNode, Subject, Term};

/// How blank nodes are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankStyle {
    /// `_:label`, for INSERT data
    Label,
    /// `?blabel`, for DELETE templates, WHERE and ASK patterns
    Variable,
}

/// Render an IRI as `<iri>`
pub fn iri(node: &NamedNode) -> String {
    format!("<{}>", node.as_str())
}

/// Render a blank node
pub fn blank(node: &BlankNode, style: BlankStyle) -> String {
    match style {
        BlankStyle::Label => format!("_:{}", node.as_str()),
        BlankStyle::Variable => {
            let name: String = node
                .as_str()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            format!("?b{}", name)
        }
    }
}

/// Render a literal with its datatype or language tag
pub fn literal(lit: &Literal) -> String {
    let value = escape_literal(lit.value());

    if let Some(language) = lit.language() {
        return format!("\"{}\"@{}", value, language);
    }

    if lit.datatype() == xsd::STRING {
        format!("\"{}\"", value)
    } else {
        format!("\"{}\"^^<{}>", value, lit.datatype().as_str())
    }
}

/// Escape a string so it fits in a single-line double-quoted literal
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render any object-position term
pub fn term(term: &Term, style: BlankStyle) -> String {
    #[allow(unreachable_patterns)]
    match term {
        Term::NamedNode(node) => iri(node),
        Term::BlankNode(node) => blank(node, style),
        Term::Literal(lit) => literal(lit),
        other => other.to_string(),
    }
}

/// Render any subject-position term
pub fn subject(subject: &Subject, style: BlankStyle) -> String {
    #[allow(unreachable_patterns)]
    match subject {
        Subject::NamedNode(node) => iri(node),
        Subject::BlankNode(node) => blank(node, style),
        other => other.to_string(),
    }
}
