//! Arena-backed markup tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Ids are
//! never reused: a detached node stays in the arena, so an id taken before a
//! mutation still names the same node afterwards. Text runs are keyed by their
//! id throughout comment restoration.

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic document root. Never serialized.
    Root,
    /// Markup element with attributes in source order.
    Element {
        /// Qualified tag name (e.g. `p`, `ac:structured-macro`).
        tag: String,
        /// Attributes as `(name, value)` pairs, values unescaped.
        attrs: Vec<(String, String)>,
    },
    /// Character data, unescaped.
    Text(String),
    /// CDATA section content.
    CData(String),
    /// XML comment content.
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Markup tree of one page version.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The document root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Payload of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Tag name if the node is an element.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Attribute value of an element.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Content of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Replace the content of a text node. Other node kinds are left alone.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            *text = value.into();
        }
    }

    /// Parent of a node, `None` for the root and for detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Whether a node is an element with the given tag.
    #[must_use]
    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Whether a node is a text node.
    #[must_use]
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a detached element.
    pub fn create_element(&mut self, tag: impl Into<String>, attrs: Vec<(String, String)>) -> NodeId {
        self.create(NodeKind::Element {
            tag: tag.into(),
            attrs,
        })
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeKind::Text(text.into()))
    }

    /// Append `child` as last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Position of a node among its siblings.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Sibling immediately before a node.
    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Sibling immediately after a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    /// Put `replacements` where `id` is, in order, and detach `id`.
    ///
    /// Does nothing if `id` has no parent.
    pub fn replace_with(&mut self, id: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        for &r in replacements {
            self.detach(r);
        }
        let Some(idx) = self.index_in_parent(id) else {
            return;
        };
        self.nodes[parent.0]
            .children
            .splice(idx..=idx, replacements.iter().copied());
        for &r in replacements {
            self.nodes[r.0].parent = Some(parent);
        }
        self.nodes[id.0].parent = None;
    }

    /// Replace an element with its own children.
    pub fn unwrap(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for &c in &children {
            self.nodes[c.0].parent = None;
        }
        self.replace_with(id, &children);
    }

    /// Concatenate runs of adjacent text children of `parent` into the first
    /// node of each run.
    pub fn merge_adjacent_text(&mut self, parent: NodeId) {
        let children = self.children(parent).to_vec();
        let mut merged = Vec::with_capacity(children.len());
        let mut open_run: Option<NodeId> = None;

        for child in children {
            match (open_run, self.text(child).map(str::to_owned)) {
                (Some(run), Some(text)) => {
                    if let NodeKind::Text(acc) = &mut self.nodes[run.0].kind {
                        acc.push_str(&text);
                    }
                    self.nodes[child.0].parent = None;
                }
                (None, Some(_)) => {
                    open_run = Some(child);
                    merged.push(child);
                }
                (_, None) => {
                    open_run = None;
                    merged.push(child);
                }
            }
        }

        self.nodes[parent.0].children = merged;
    }

    /// Ancestors of a node, nearest first, excluding the node itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    /// Topmost ancestor below the root, or the node itself if it is a child
    /// of the root.
    #[must_use]
    pub fn top_level_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let root = self.root();
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            if parent == root {
                return Some(current);
            }
            current = parent;
        }
    }

    /// All nodes below `id` in document (pre-)order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Elements with the given tag in document order.
    #[must_use]
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_element(id, tag))
            .collect()
    }

    /// All text nodes in document order.
    #[must_use]
    pub fn text_runs(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_text(id))
            .collect()
    }

    /// Text nodes holding at least one non-whitespace character.
    #[must_use]
    pub fn non_blank_runs(&self) -> Vec<NodeId> {
        self.text_runs()
            .into_iter()
            .filter(|&id| self.text(id).is_some_and(|t| !t.trim().is_empty()))
            .collect()
    }

    /// Whether the document has no visible text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.non_blank_runs().is_empty()
    }

    /// Concatenated text and CDATA content below a node.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match self.kind(node) {
                NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(doc: &mut Document, parts: &[&str]) -> (NodeId, Vec<NodeId>) {
        let p = doc.create_element("p", Vec::new());
        let root = doc.root();
        doc.append_child(root, p);
        let ids = parts
            .iter()
            .map(|part| {
                let t = doc.create_text(*part);
                doc.append_child(p, t);
                t
            })
            .collect();
        (p, ids)
    }

    #[test]
    fn test_replace_with_keeps_order() {
        let mut doc = Document::new();
        let (p, ids) = paragraph(&mut doc, &["a", "b", "c"]);
        let x = doc.create_text("x");
        let y = doc.create_text("y");

        doc.replace_with(ids[1], &[x, y]);

        assert_eq!(doc.children(p), &[ids[0], x, y, ids[2]]);
        assert_eq!(doc.parent(x), Some(p));
        assert_eq!(doc.parent(ids[1]), None);
    }

    #[test]
    fn test_unwrap_lifts_children() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, &["before "]);
        let strong = doc.create_element("strong", Vec::new());
        doc.append_child(p, strong);
        let inner = doc.create_text("bold");
        doc.append_child(strong, inner);

        doc.unwrap(strong);

        assert_eq!(doc.children(p).len(), 2);
        assert_eq!(doc.children(p)[1], inner);
        assert_eq!(doc.parent(inner), Some(p));
    }

    #[test]
    fn test_merge_adjacent_text() {
        let mut doc = Document::new();
        let (p, ids) = paragraph(&mut doc, &["One ", " Two ", " Three"]);
        let br = doc.create_element("br", Vec::new());
        doc.append_child(p, br);
        let tail = doc.create_text("tail");
        doc.append_child(p, tail);

        doc.merge_adjacent_text(p);

        assert_eq!(doc.children(p), &[ids[0], br, tail]);
        assert_eq!(doc.text(ids[0]), Some("One  Two  Three"));
    }

    #[test]
    fn test_ids_survive_detach() {
        let mut doc = Document::new();
        let (_, ids) = paragraph(&mut doc, &["keep", "drop"]);
        doc.detach(ids[1]);

        assert_eq!(doc.text_runs(), vec![ids[0]]);
        assert_eq!(doc.text(ids[1]), Some("drop"));
    }

    #[test]
    fn test_non_blank_runs_skip_whitespace() {
        let mut doc = Document::new();
        let (_, ids) = paragraph(&mut doc, &["  ", "text", "\n"]);
        assert_eq!(doc.non_blank_runs(), vec![ids[1]]);
        assert!(!doc.is_blank());
    }

    #[test]
    fn test_top_level_ancestor() {
        let mut doc = Document::new();
        let (p, ids) = paragraph(&mut doc, &["x"]);
        assert_eq!(doc.top_level_ancestor(ids[0]), Some(p));
        assert_eq!(doc.top_level_ancestor(p), Some(p));
        assert_eq!(doc.top_level_ancestor(doc.root()), None);
    }
}
