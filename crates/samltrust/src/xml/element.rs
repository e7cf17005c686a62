//! Owned, namespace-resolved XML element tree.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};
use crate::types::XML_NS;

use super::c14n::{self, CanonicalizationAlgorithm};

/// Deepest element nesting [`XmlElement::parse`] accepts. The root is at
/// depth 1.
pub const MAX_DEPTH: usize = 256;

/// Prefix-to-namespace bindings. The default namespace uses the empty prefix.
pub type NamespaceScope = BTreeMap<String, String>;

/// An attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    prefix: Option<String>,
    local: String,
    namespace: Option<String>,
    value: String,
}

impl XmlAttribute {
    /// Returns the local name.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Returns the prefix, if the attribute is qualified.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the namespace URI. Unprefixed attributes have none.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the name as written, `prefix:local` or `local`.
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local)
    }
}

/// A child node of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),
    /// Character data (CDATA sections are merged into text).
    Text(String),
    /// A comment.
    Comment(String),
}

/// An XML element and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    prefix: Option<String>,
    local: String,
    namespace: Option<String>,
    attributes: Vec<XmlAttribute>,
    declarations: Vec<(String, String)>,
    in_scope: NamespaceScope,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML, a DOCTYPE
    /// declaration, an unbound prefix, duplicate attributes, or elements
    /// nested deeper than [`MAX_DEPTH`].
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let normalized = xml.replace("\r\n", "\n").replace('\r', "\n");
        let mut reader = Reader::from_str(&normalized);

        let mut stack: Vec<Self> = Vec::new();
        let mut root: Option<Self> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    check_depth(stack.len() + 1)?;
                    let element = Self::open(&start, stack.last().map(|parent| &parent.in_scope))?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    check_depth(stack.len() + 1)?;
                    let element = Self::open(&start, stack.last().map(|parent| &parent.in_scope))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SamlError::XmlParse("unexpected end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_text(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(SamlError::XmlParse(
                                "text outside the document element".to_string(),
                            ));
                        }
                    }
                }
                Event::CData(data) => {
                    let text = utf8(&data)?;
                    stack
                        .last_mut()
                        .ok_or_else(|| {
                            SamlError::XmlParse("CDATA outside the document element".to_string())
                        })?
                        .push_text(text);
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Comment(utf8(&comment)?.to_string()));
                    }
                }
                Event::DocType(_) => {
                    return Err(SamlError::XmlParse(
                        "DOCTYPE declarations are not allowed".to_string(),
                    ));
                }
                Event::Decl(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(SamlError::XmlParse("unclosed element at end of input".to_string()));
        }
        root.ok_or_else(|| SamlError::XmlParse("document has no root element".to_string()))
    }

    fn open(start: &BytesStart<'_>, parent_scope: Option<&NamespaceScope>) -> SamlResult<Self> {
        let mut in_scope = parent_scope.cloned().unwrap_or_default();
        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr?;
            let name = utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();

            if name == "xmlns" {
                if value.is_empty() {
                    in_scope.remove("");
                } else {
                    in_scope.insert(String::new(), value.clone());
                }
                declarations.push((String::new(), value));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(SamlError::XmlParse(format!(
                        "namespace prefix '{prefix}' cannot be undeclared"
                    )));
                }
                in_scope.insert(prefix.to_string(), value.clone());
                declarations.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((name, value));
            }
        }

        let name = start.name();
        let qname = utf8(name.as_ref())?;
        let (prefix, local) = split_qname(qname);
        let namespace = match prefix {
            Some(prefix) => Some(resolve_prefix(&in_scope, prefix)?),
            None => in_scope.get("").cloned(),
        };

        let mut attributes: Vec<XmlAttribute> = Vec::with_capacity(raw_attributes.len());
        for (name, value) in raw_attributes {
            let (attr_prefix, attr_local) = split_qname(&name);
            let attr_namespace = attr_prefix
                .map(|p| resolve_prefix(&in_scope, p))
                .transpose()?;

            if attributes
                .iter()
                .any(|a| a.local == attr_local && a.namespace == attr_namespace)
            {
                return Err(SamlError::XmlParse(format!("duplicate attribute '{name}'")));
            }

            attributes.push(XmlAttribute {
                prefix: attr_prefix.map(str::to_string),
                local: attr_local.to_string(),
                namespace: attr_namespace,
                value,
            });
        }

        Ok(Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            namespace,
            attributes,
            declarations,
            in_scope,
            children: Vec::new(),
        })
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Returns the local name.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Returns the namespace URI, if the element is in one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the prefix as written.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the name as written, `prefix:local` or `local`.
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local)
    }

    /// Returns true if this element has the given namespace and local name.
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local == local_name && self.namespace.as_deref() == Some(namespace)
    }

    /// Looks up an unqualified attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local == name)
            .map(XmlAttribute::value)
    }

    /// Returns all attributes except namespace declarations.
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Returns every namespace binding in scope on this element.
    pub fn namespaces_in_scope(&self) -> &NamespaceScope {
        &self.in_scope
    }

    /// Returns the child nodes in document order.
    pub fn nodes(&self) -> &[XmlNode] {
        &self.children
    }

    /// Returns the child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &Self> + '_ {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Returns the child elements with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Self> + 'a {
        self.children().filter(move |c| c.is(namespace, local_name))
    }

    /// Returns the first child element with the given namespace and local name.
    pub fn child(&self, namespace: &str, local_name: &str) -> Option<&Self> {
        self.children().find(|c| c.is(namespace, local_name))
    }

    /// Returns this element and all descendant elements in document order.
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.descendants());
        }
        out
    }

    /// Returns the concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serializes this element and its descendants to canonical text.
    pub fn canonicalize(&self, algorithm: CanonicalizationAlgorithm) -> String {
        c14n::canonicalize(self, algorithm)
    }

    /// Serializes the subtree as a standalone document.
    ///
    /// Inclusive canonicalization declares every in-scope namespace on this
    /// element, so the output parses back to the same names.
    pub fn serialize(&self) -> String {
        self.canonicalize(CanonicalizationAlgorithm::C14N)
    }

    /// Returns the element whose `ID` attribute equals `id`, searching this
    /// element and its descendants.
    pub fn element_with_id(&self, id: &str) -> Option<&Self> {
        self.descendants()
            .into_iter()
            .find(|e| e.attribute("ID") == Some(id))
    }

    /// Returns a copy with the child node at `index` removed.
    pub(crate) fn without_node(&self, index: usize) -> Self {
        let mut copy = self.clone();
        if index < copy.children.len() {
            copy.children.remove(index);
        }
        copy
    }

    /// Returns the node index of the first child element with the given name.
    pub(crate) fn node_position(&self, namespace: &str, local_name: &str) -> Option<usize> {
        self.children.iter().position(|node| match node {
            XmlNode::Element(element) => element.is(namespace, local_name),
            _ => false,
        })
    }

    pub(crate) fn insert_node(&mut self, index: usize, node: XmlNode) {
        let index = index.min(self.children.len());
        self.children.insert(index, node);
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    pub(crate) fn child_mut(&mut self, namespace: &str, local_name: &str) -> Option<&mut Self> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) if element.is(namespace, local_name) => Some(element),
            _ => None,
        })
    }

    pub(crate) fn element_with_id_mut(&mut self, id: &str) -> Option<&mut Self> {
        if self.attribute("ID") == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) => element.element_with_id_mut(id),
            _ => None,
        })
    }

    /// Recomputes in-scope namespaces as if this subtree were placed under
    /// an element whose scope is `parent`.
    pub(crate) fn rescope(&mut self, parent: &NamespaceScope) {
        let mut scope = parent.clone();
        for (prefix, uri) in &self.declarations {
            if uri.is_empty() {
                scope.remove(prefix);
            } else {
                scope.insert(prefix.clone(), uri.clone());
            }
        }
        for node in &mut self.children {
            if let XmlNode::Element(child) = node {
                child.rescope(&scope);
            }
        }
        self.in_scope = scope;
    }
}

fn check_depth(depth: usize) -> SamlResult<()> {
    if depth > MAX_DEPTH {
        return Err(SamlError::XmlParse(format!(
            "element nesting exceeds {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(SamlError::XmlParse("multiple root elements".to_string())),
    }
}

fn utf8(bytes: &[u8]) -> SamlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| SamlError::XmlParse(format!("invalid UTF-8: {e}")))
}

fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn resolve_prefix(scope: &NamespaceScope, prefix: &str) -> SamlResult<String> {
    if prefix == "xml" {
        return Ok(XML_NS.to_string());
    }
    scope
        .get(prefix)
        .cloned()
        .ok_or_else(|| SamlError::XmlParse(format!("unbound namespace prefix '{prefix}'")))
}

fn qualify(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}
