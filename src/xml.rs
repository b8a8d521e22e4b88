//! Arena-backed mutable XML tree.
//!
//! `roxmltree` gives a fast read-only view; the tidy passes need to insert
//! paragraphs, rewrite runs and grow the numbering part, so every parsed part
//! is copied into an arena where nodes are addressed by a stable [`NodeId`].
//! Ids are never reused: a detached node keeps its id, so maps keyed by
//! `NodeId` stay valid across insertions and deletions.

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns: Option<String>,
}

impl QName {
    pub fn new(prefix: Option<&str>, ns: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            ns: ns.map(str::to_string),
        }
    }

    fn write_to(&self, out: &mut String) {
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&self.local);
    }
}

#[derive(Clone, Debug)]
struct Attr {
    name: QName,
    value: String,
}

#[derive(Clone, Debug)]
enum NodeKind {
    Element {
        name: QName,
        attrs: Vec<Attr>,
        // (prefix, uri); prefix None is the default namespace
        ns_decls: Vec<(Option<String>, String)>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

pub struct XmlTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

/// Prefix bound to `uri` in the scope of `node`.
fn prefix_for(node: roxmltree::Node, uri: &str) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_string());
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri)
        .and_then(|ns| ns.name())
        .map(str::to_string)
}

fn attr_prefix_for(node: roxmltree::Node, uri: &str) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_string());
    }
    // Attributes never use the default namespace, so skip unprefixed bindings.
    node.namespaces()
        .filter(|ns| ns.uri() == uri)
        .find_map(|ns| ns.name())
        .map(str::to_string)
}

impl XmlTree {
    pub fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let xml = roxmltree::Document::parse(text)?;
        let mut tree = XmlTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.import(xml.root_element(), None);
        Ok(tree)
    }

    /// A fresh tree holding only a root element with the given namespace
    /// declarations.
    pub fn with_root(
        prefix: Option<&str>,
        ns: &str,
        local: &str,
        decls: &[(Option<&str>, &str)],
    ) -> Self {
        let mut tree = XmlTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = tree.create_element(prefix, ns, local);
        if let NodeKind::Element { ns_decls, .. } = &mut tree.nodes[root.0].kind {
            *ns_decls = decls
                .iter()
                .map(|(p, uri)| (p.map(str::to_string), uri.to_string()))
                .collect();
        }
        tree.root = root;
        tree
    }

    fn import(&mut self, node: roxmltree::Node, parent: Option<NodeId>) -> NodeId {
        let parent_ns: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
            .unwrap_or_default();
        let ns_decls = node
            .namespaces()
            .filter(|ns| ns.uri() != XML_NS)
            .filter(|ns| !parent_ns.contains(&(ns.name(), ns.uri())))
            .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
            .collect();

        let tag = node.tag_name();
        let name = QName {
            prefix: tag.namespace().and_then(|uri| prefix_for(node, uri)),
            local: tag.name().to_string(),
            ns: tag.namespace().map(str::to_string),
        };
        let attrs = node
            .attributes()
            .map(|a| Attr {
                name: QName {
                    prefix: a.namespace().and_then(|uri| attr_prefix_for(node, uri)),
                    local: a.name().to_string(),
                    ns: a.namespace().map(str::to_string),
                },
                value: a.value().to_string(),
            })
            .collect();

        let id = self.push(NodeKind::Element {
            name,
            attrs,
            ns_decls,
        });
        self.nodes[id.0].parent = parent;

        for child in node.children() {
            if child.is_element() {
                let c = self.import(child, Some(id));
                self.nodes[id.0].children.push(c);
            } else if child.is_text() {
                let c = self.push(NodeKind::Text(child.text().unwrap_or("").to_string()));
                self.nodes[c.0].parent = Some(id);
                self.nodes[id.0].children.push(c);
            }
        }
        id
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(|n| n.local.as_str())
    }

    /// True when `id` is an element named `local` in namespace `ns`.
    pub fn is(&self, id: NodeId, ns: &str, local: &str) -> bool {
        self.name(id)
            .is_some_and(|n| n.local == local && n.ns.as_deref() == Some(ns))
    }

    pub fn find_child(&self, id: NodeId, ns: &str, local: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.is(c, ns, local))
    }

    pub fn children_named(&self, id: NodeId, ns: &str, local: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is(c, ns, local))
            .collect()
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    pub fn attr(&self, id: NodeId, ns: Option<&str>, local: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local == local && a.name.ns.as_deref() == ns)
                .map(|a| a.value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// All attribute values of an element, in document order.
    pub fn attr_values(&self, id: NodeId) -> Vec<(&QName, &str)> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => {
                attrs.iter().map(|a| (&a.name, a.value.as_str())).collect()
            }
            NodeKind::Text(_) => Vec::new(),
        }
    }

    pub fn set_attr(
        &mut self,
        id: NodeId,
        prefix: Option<&str>,
        ns: Option<&str>,
        local: &str,
        value: &str,
    ) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            if let Some(a) = attrs
                .iter_mut()
                .find(|a| a.name.local == local && a.name.ns.as_deref() == ns)
            {
                a.value = value.to_string();
            } else {
                attrs.push(Attr {
                    name: QName::new(prefix, ns, local),
                    value: value.to_string(),
                });
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, ns: Option<&str>, local: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.retain(|a| !(a.name.local == local && a.name.ns.as_deref() == ns));
        }
    }

    /// Text content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated direct text children of an element.
    pub fn element_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&c| self.text(c))
            .collect()
    }

    /// Replace all children of an element with a single text node.
    pub fn set_element_text(&mut self, id: NodeId, text: &str) {
        for c in self.nodes[id.0].children.clone() {
            self.nodes[c.0].parent = None;
        }
        self.nodes[id.0].children.clear();
        if !text.is_empty() {
            let t = self.push(NodeKind::Text(text.to_string()));
            self.append_child(id, t);
        }
    }

    /// Create a detached element.
    pub fn create_element(&mut self, prefix: Option<&str>, ns: &str, local: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: QName::new(prefix, Some(ns), local),
            attrs: Vec::new(),
            ns_decls: Vec::new(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Insert `new` as the next sibling of `anchor`. No-op when `anchor` is detached.
    pub fn insert_after(&mut self, anchor: NodeId, new: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        let Some(pos) = self.index_in_parent(anchor) else {
            return;
        };
        self.insert_child(parent, pos + 1, new);
    }

    pub fn insert_before(&mut self, anchor: NodeId, new: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        let Some(pos) = self.index_in_parent(anchor) else {
            return;
        };
        self.insert_child(parent, pos, new);
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Unlink a node from its parent. The node (and its subtree) stays in the
    /// arena and may be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// True while the node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Detached deep copy of the subtree rooted at `id`.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut kind = self.nodes[id.0].kind.clone();
        // Namespace declarations stay on the original ancestor.
        if let NodeKind::Element { ns_decls, .. } = &mut kind {
            ns_decls.clear();
        }
        let copy = self.push(kind);
        for child in self.nodes[id.0].children.clone() {
            let c = self.deep_clone(child);
            self.nodes[c.0].parent = Some(copy);
            self.nodes[copy.0].children.push(c);
        }
        copy
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n");
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => escape_text(t, out),
            NodeKind::Element {
                name,
                attrs,
                ns_decls,
            } => {
                out.push('<');
                name.write_to(out);
                for (prefix, uri) in ns_decls {
                    match prefix {
                        Some(p) => {
                            out.push_str(" xmlns:");
                            out.push_str(p);
                        }
                        None => out.push_str(" xmlns"),
                    }
                    out.push_str("=\"");
                    escape_attr(uri, out);
                    out.push('"');
                }
                for a in attrs {
                    out.push(' ');
                    a.name.write_to(out);
                    out.push_str("=\"");
                    escape_attr(&a.value, out);
                    out.push('"');
                }
                let children = &self.nodes[id.0].children;
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &c in children {
                    self.write_node(c, out);
                }
                out.push_str("</");
                name.write_to(out);
                out.push('>');
            }
        }
    }
}
