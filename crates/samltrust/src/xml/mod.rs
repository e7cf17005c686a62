//! XML element model.
//!
//! Documents are parsed into an owned tree with every element and attribute
//! name resolved to its namespace. The tree is what signatures are located
//! in, what claims are read from, and what canonical serialization runs
//! over.
//!
//! DOCTYPE declarations are refused outright, so entity expansion never
//! happens.

mod c14n;
mod element;

pub use c14n::CanonicalizationAlgorithm;
pub use element::{NamespaceScope, XmlAttribute, XmlElement, XmlNode, MAX_DEPTH};
