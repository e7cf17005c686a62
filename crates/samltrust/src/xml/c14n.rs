//! Canonical XML serialization.
//!
//! Implements Canonical XML 1.0 and Exclusive XML Canonicalization 1.0 over
//! an element subtree, each with or without comments. The
//! `InclusiveNamespaces PrefixList` parameter of the exclusive form is not
//! supported.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::canonicalization_algorithms;

use super::element::{NamespaceScope, XmlAttribute, XmlElement, XmlNode};

/// Canonicalization algorithm selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments (recommended).
    #[default]
    #[serde(rename = "exclusive-c14n")]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    #[serde(rename = "exclusive-c14n-with-comments")]
    ExclusiveC14NWithComments,
    /// C14N without comments.
    #[serde(rename = "c14n")]
    C14N,
    /// C14N with comments.
    #[serde(rename = "c14n-with-comments")]
    C14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
            Self::C14N => canonicalization_algorithms::C14N,
            Self::C14NWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14N),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14NWithComments)
            }
            canonicalization_algorithms::C14N => Some(Self::C14N),
            canonicalization_algorithms::C14N_WITH_COMMENTS => Some(Self::C14NWithComments),
            _ => None,
        }
    }

    /// Returns true for the exclusive variants.
    #[must_use]
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::ExclusiveC14N | Self::ExclusiveC14NWithComments)
    }

    /// Returns true if comments are kept.
    #[must_use]
    pub const fn with_comments(self) -> bool {
        matches!(self, Self::ExclusiveC14NWithComments | Self::C14NWithComments)
    }

    /// Returns the same algorithm with comments dropped.
    #[must_use]
    pub const fn without_comments(self) -> Self {
        match self {
            Self::ExclusiveC14N | Self::ExclusiveC14NWithComments => Self::ExclusiveC14N,
            Self::C14N | Self::C14NWithComments => Self::C14N,
        }
    }
}

pub(super) fn canonicalize(element: &XmlElement, algorithm: CanonicalizationAlgorithm) -> String {
    let mut out = String::new();
    write_element(element, algorithm, &NamespaceScope::new(), &mut out);
    out
}

fn write_element(
    element: &XmlElement,
    algorithm: CanonicalizationAlgorithm,
    rendered: &NamespaceScope,
    out: &mut String,
) {
    let declarations = if algorithm.is_exclusive() {
        visibly_utilized(element, rendered)
    } else {
        inherited(element, rendered)
    };

    let name = element.qualified_name();
    out.push('<');
    out.push_str(&name);

    // The empty (default) prefix sorts first.
    for (prefix, uri) in &declarations {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
    }

    let mut attributes: Vec<&XmlAttribute> = element.attributes().iter().collect();
    attributes.sort_by(|a, b| {
        (a.namespace().unwrap_or(""), a.local_name())
            .cmp(&(b.namespace().unwrap_or(""), b.local_name()))
    });
    for attr in attributes {
        out.push(' ');
        out.push_str(&attr.qualified_name());
        out.push_str("=\"");
        escape_attribute(attr.value(), out);
        out.push('"');
    }
    out.push('>');

    let mut scope = rendered.clone();
    for (prefix, uri) in declarations {
        if uri.is_empty() {
            scope.remove(&prefix);
        } else {
            scope.insert(prefix, uri);
        }
    }

    for node in element.nodes() {
        match node {
            XmlNode::Element(child) => write_element(child, algorithm, &scope, out),
            XmlNode::Text(text) => escape_text(text, out),
            XmlNode::Comment(comment) if algorithm.with_comments() => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            XmlNode::Comment(_) => {}
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

/// Namespaces used by the element name or its attributes that the output
/// does not already bind to the same URI.
fn visibly_utilized(element: &XmlElement, rendered: &NamespaceScope) -> BTreeMap<String, String> {
    let mut prefixes = BTreeSet::new();
    prefixes.insert(element.prefix().unwrap_or("").to_string());
    for attr in element.attributes() {
        if let Some(prefix) = attr.prefix() {
            if prefix != "xml" {
                prefixes.insert(prefix.to_string());
            }
        }
    }

    prefixes
        .into_iter()
        .filter_map(|prefix| {
            let uri = element
                .namespaces_in_scope()
                .get(&prefix)
                .cloned()
                .unwrap_or_default();
            let current = rendered.get(&prefix).map_or("", String::as_str);
            (current != uri).then_some((prefix, uri))
        })
        .collect()
}

/// Every in-scope namespace not already rendered with the same URI.
fn inherited(element: &XmlElement, rendered: &NamespaceScope) -> BTreeMap<String, String> {
    let in_scope = element.namespaces_in_scope();
    let mut declarations: BTreeMap<String, String> = in_scope
        .iter()
        .filter(|(prefix, uri)| rendered.get(*prefix) != Some(*uri))
        .map(|(prefix, uri)| (prefix.clone(), uri.clone()))
        .collect();

    if rendered.contains_key("") && !in_scope.contains_key("") {
        declarations.insert(String::new(), String::new());
    }
    declarations
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}
