//! Owned markup tree addressed by index handles.
//!
//! Nodes live in an append-only arena owned by [`Tree`]. A [`NodeId`] is only
//! meaningful for the tree that produced it; removing a node detaches it from
//! its parent but keeps it in the arena, so a detached handle can be moved back
//! into the document and can never observe freed memory. Traversals start from
//! the document node, so detached nodes are invisible to queries and output.

use std::borrow::Cow;

use quick_xml::NsReader;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

/// Handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Index of the synthetic document node that parents the root element.
const DOCUMENT: NodeId = NodeId(0);

/// Header written when a declaration is requested.
const DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Two-space indentation per nesting level.
const INDENT: &str = "  ";

/// Element payload.
#[derive(Debug, Clone)]
struct Element {
    /// Attributes in document order.
    attributes: Vec<(String, String)>,
    /// Qualified name as written.
    name: String,
    /// Resolved namespace URI, `None` when unbound.
    namespace: Option<String>,
}

/// What a node holds.
#[derive(Debug, Clone)]
enum NodeKind {
    /// Raw `<![CDATA[...]]>` content.
    CData(String),
    /// Comment body without delimiters.
    Comment(String),
    /// The synthetic document node.
    Document,
    /// An element.
    Element(Element),
    /// Processing instruction body without delimiters.
    Instruction(String),
    /// Unescaped character data.
    Text(String),
}

/// One arena slot.
#[derive(Debug, Clone)]
struct Node {
    /// Child handles in document order.
    children: Vec<NodeId>,
    /// Payload.
    kind: NodeKind,
    /// Owning node, `None` for the document node and detached nodes.
    parent: Option<NodeId>,
}

/// A parsed markup document.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Source started with a UTF-8 byte-order mark.
    bom: bool,
    /// Source used CRLF line endings.
    crlf: bool,
    /// Node arena; slot 0 is the document node.
    nodes: Vec<Node>,
    /// Source ended with a line break.
    trailing_newline: bool,
}

impl Tree {
    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes.get(parent.0).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
        return;
    }

    /// Attach a freshly parsed element, rejecting a second top-level element.
    fn attach_parsed(&mut self, parent: NodeId, id: NodeId) -> Result<(), String> {
        if parent == DOCUMENT && self.root_element().is_some() {
            return Err("more than one top-level element".to_string());
        }
        self.append_child(parent, id);
        return Ok(());
    }

    /// Value of attribute `key` on an element.
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        return self
            .element(id)?
            .attributes
            .iter()
            .find(|(k, _)| return k == key)
            .map(|(_, v)| return v.as_str());
    }

    /// All attributes of an element in document order.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        return self.element(id).map_or(&[], |e| return e.attributes.as_slice());
    }

    /// Children of a node in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        return self.nodes.get(id.0).map_or(&[], |n| return n.children.as_slice());
    }

    /// Create a detached element.
    pub fn create_element(&mut self, namespace: Option<&str>, name: &str) -> NodeId {
        return self.push(NodeKind::Element(Element {
            attributes: Vec::new(),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        }));
    }

    /// Create a detached element holding only `text`.
    pub fn create_text_element(&mut self, namespace: Option<&str>, name: &str, text: &str) -> NodeId {
        let element = self.create_element(namespace, name);
        let content = self.push(NodeKind::Text(text.to_string()));
        self.append_child(element, content);
        return element;
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        return out;
    }

    /// Remove a node from its parent. The handle stays valid for reinsertion.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id.0).and_then(|n| return n.parent) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.retain(|c| return *c != id);
        }
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.parent = None;
        }
        return;
    }

    /// The element payload of a node, if it is an element.
    fn element(&self, id: NodeId) -> Option<&Element> {
        return match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        };
    }

    /// Whether a node has at least one element child.
    pub fn has_element_children(&self, id: NodeId) -> bool {
        return self.children(id).iter().any(|c| return self.element(*c).is_some());
    }

    /// Insert `node` immediately after `anchor` under the same parent.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        self.insert_relative(anchor, node, 1);
        return;
    }

    /// Insert `node` immediately before `anchor` under the same parent.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        self.insert_relative(anchor, node, 0);
        return;
    }

    /// Insert `node` next to `anchor`; `offset` 0 places it before, 1 after.
    fn insert_relative(&mut self, anchor: NodeId, node: NodeId, offset: usize) {
        if anchor == node {
            return;
        }
        self.detach(node);
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        let Some(slot) = self.nodes.get_mut(parent.0) else {
            return;
        };
        let Some(position) = slot.children.iter().position(|c| return *c == anchor) else {
            return;
        };
        slot.children.insert(position.saturating_add(offset), node);
        if let Some(inserted) = self.nodes.get_mut(node.0) {
            inserted.parent = Some(parent);
        }
        return;
    }

    /// Whether `id` is an element with local name `local` in `namespace`.
    pub fn is_element(&self, id: NodeId, namespace: Option<&str>, local: &str) -> bool {
        return self
            .element(id)
            .is_some_and(|e| return e.namespace.as_deref() == namespace && local_part(&e.name) == local);
    }

    /// Local name of an element (prefix stripped).
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        return self.element(id).map(|e| return local_part(&e.name));
    }

    /// Parent of a node, `None` for the document node and detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        return self.nodes.get(id.0)?.parent;
    }

    /// Parse markup text into a tree.
    ///
    /// Whitespace-only text is dropped; output is re-indented on serialization.
    ///
    /// # Errors
    ///
    /// Returns a description of the first well-formedness violation.
    pub fn parse(source: &str) -> Result<Self, String> {
        let bom = source.starts_with('\u{feff}');
        let text = source.trim_start_matches('\u{feff}');
        let mut tree = Self {
            bom,
            crlf: text.contains("\r\n"),
            nodes: vec![Node {
                children: Vec::new(),
                kind: NodeKind::Document,
                parent: None,
            }],
            trailing_newline: text.ends_with('\n'),
        };

        let mut reader = NsReader::from_str(text);
        let mut stack: Vec<NodeId> = vec![DOCUMENT];

        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(|e| return e.to_string())?;
            let Some(&current) = stack.last() else {
                return Err("unbalanced element stack".to_string());
            };
            match event {
                Event::Start(start) => {
                    let id = tree.push_element(&resolved, &start)?;
                    tree.attach_parsed(current, id)?;
                    stack.push(id);
                },
                Event::Empty(start) => {
                    let id = tree.push_element(&resolved, &start)?;
                    tree.attach_parsed(current, id)?;
                },
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err("closing tag without matching start".to_string());
                    }
                    stack.pop();
                },
                Event::Text(content) => {
                    let value = content.unescape().map_err(|e| return e.to_string())?;
                    if value.trim().is_empty() {
                        continue;
                    }
                    if current == DOCUMENT {
                        return Err("text outside the root element".to_string());
                    }
                    let id = tree.push(NodeKind::Text(value.into_owned()));
                    tree.append_child(current, id);
                },
                Event::CData(content) => {
                    let id = tree.push(NodeKind::CData(String::from_utf8_lossy(&content).into_owned()));
                    tree.append_child(current, id);
                },
                Event::Comment(content) => {
                    let id = tree.push(NodeKind::Comment(String::from_utf8_lossy(&content).into_owned()));
                    tree.append_child(current, id);
                },
                Event::PI(content) => {
                    let id = tree.push(NodeKind::Instruction(String::from_utf8_lossy(&content).into_owned()));
                    tree.append_child(current, id);
                },
                Event::Decl(_) | Event::DocType(_) => {},
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            return Err("unexpected end of input inside an element".to_string());
        }
        return Ok(tree);
    }

    /// Allocate a detached node.
    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            children: Vec::new(),
            kind,
            parent: None,
        });
        return id;
    }

    /// Allocate an element from a start tag.
    fn push_element(&mut self, resolved: &ResolveResult<'_>, start: &BytesStart<'_>) -> Result<NodeId, String> {
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(format!("unknown namespace prefix `{}`", String::from_utf8_lossy(prefix)));
            },
        };
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| return e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| return e.to_string())?.into_owned();
            attributes.push((key, value));
        }
        return Ok(self.push(NodeKind::Element(Element {
            attributes,
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            namespace,
        })));
    }

    /// The single top-level element.
    pub fn root_element(&self) -> Option<NodeId> {
        return self.children(DOCUMENT).iter().copied().find(|c| return self.element(*c).is_some());
    }

    /// Render the tree with two-space indentation, optionally preceded by
    /// the XML declaration. Line endings and byte-order mark follow the source.
    pub fn serialize(&self, declaration: bool) -> String {
        let newline = if self.crlf { "\r\n" } else { "\n" };
        let mut lines: Vec<String> = Vec::new();
        if declaration {
            lines.push(DECLARATION.to_string());
        }
        for child in self.children(DOCUMENT) {
            self.write_node(*child, 0, &mut lines);
        }

        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        out.push_str(&lines.join(newline));
        if self.trailing_newline {
            out.push_str(newline);
        }
        return out;
    }

    /// Set or replace an attribute value, keeping its position when present.
    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &str) {
        let Some(Node { kind: NodeKind::Element(element), .. }) = self.nodes.get_mut(id.0) else {
            return;
        };
        if let Some(slot) = element.attributes.iter_mut().find(|(k, _)| return k == key) {
            slot.1 = value.to_string();
        } else {
            element.attributes.push((key.to_string(), value.to_string()));
        }
        return;
    }

    /// Concatenated character data directly inside a node.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            match self.nodes.get(child.0).map(|n| return &n.kind) {
                Some(NodeKind::Text(t) | NodeKind::CData(t)) => out.push_str(t),
                _ => {},
            }
        }
        return out;
    }

    /// Append the rendered lines for an element and its subtree.
    fn write_element(&self, id: NodeId, element: &Element, depth: usize, lines: &mut Vec<String>) {
        let indent = INDENT.repeat(depth);
        let mut open = format!("{indent}<{}", element.name);
        for (key, value) in &element.attributes {
            open.push_str(&format!(" {key}=\"{}\"", escape_attribute(value)));
        }

        let children = self.children(id);
        if children.is_empty() {
            lines.push(format!("{open} />"));
            return;
        }

        let text_only = children.iter().all(|c| {
            return matches!(
                self.nodes.get(c.0).map(|n| return &n.kind),
                Some(NodeKind::Text(_) | NodeKind::CData(_))
            );
        });
        if text_only {
            let mut inline = String::new();
            for child in children {
                match self.nodes.get(child.0).map(|n| return &n.kind) {
                    Some(NodeKind::Text(t)) => inline.push_str(&partial_escape(t.as_str())),
                    Some(NodeKind::CData(t)) => inline.push_str(&format!("<![CDATA[{t}]]>")),
                    _ => {},
                }
            }
            lines.push(format!("{open}>{inline}</{}>", element.name));
            return;
        }

        lines.push(format!("{open}>"));
        for child in children {
            self.write_node(*child, depth.saturating_add(1), lines);
        }
        lines.push(format!("{indent}</{}>", element.name));
        return;
    }

    /// Append the rendered lines for one node.
    fn write_node(&self, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let indent = INDENT.repeat(depth);
        match &node.kind {
            NodeKind::CData(t) => lines.push(format!("{indent}<![CDATA[{t}]]>")),
            NodeKind::Comment(t) => lines.push(format!("{indent}<!--{t}-->")),
            NodeKind::Document => {},
            NodeKind::Instruction(t) => lines.push(format!("{indent}<?{t}?>")),
            NodeKind::Text(t) => lines.push(format!("{indent}{}", partial_escape(t.trim()))),
            NodeKind::Element(element) => self.write_element(id, element, depth, lines),
        }
        return;
    }
}

/// Escape an attribute value for a double-quoted attribute. Apostrophes are
/// left alone so conditions like `'$(Configuration)' == 'Debug'` stay readable.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = partial_escape(value);
    if !escaped.contains('"') {
        return escaped;
    }
    return Cow::Owned(escaped.replace('"', "&quot;"));
}

/// Strip a namespace prefix from a qualified name.
fn local_part(name: &str) -> &str {
    return name.rsplit_once(':').map_or(name, |(_, local)| return local);
}
