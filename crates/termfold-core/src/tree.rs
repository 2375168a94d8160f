//! Arena-backed tree of folded regions.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. A node owns its
//! children through its item list; `parent` is a plain index used for ancestor
//! walks. The open stack (root to innermost open node) is kept explicitly.
//!
//! History is append-only: items are never reordered or removed, and a closed
//! node's items are frozen. The one exception is
//! [`Tree::truncate_closed_lines`], an opt-in retention policy that drops old
//! content *lines* of closed nodes while keeping their counts.

use serde::Serialize;

use crate::matcher::MarkerRole;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier of a node, valid for the lifetime of its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The implicit root node
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Open,
    Closed,
}

/// One entry in a node's content, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Item {
    Node(NodeId),
    Line(String),
}

/// Direct-children counts of a node, as shown in summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildCounts {
    pub nodes: usize,
    /// Content lines, including lines dropped by retention
    pub lines: usize,
}

/// A matched region, or the root
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    id: NodeId,
    label: String,
    state: NodeState,
    close_label: Option<String>,
    children: Vec<Item>,
    parent: Option<NodeId>,
    depth: usize,
    /// Pattern pair that opened this node (None for root)
    pair: Option<usize>,
    /// Raw marker lines, kept for replaying the original input
    start_line: Option<String>,
    end_line: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    elided_lines: usize,
    /// Item indices of the sub-nodes, ascending
    #[serde(skip)]
    subnodes: Vec<usize>,
    /// Marker lines stored as the first/last content line
    #[serde(skip)]
    start_inline: bool,
    #[serde(skip)]
    end_inline: bool,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == NodeState::Open
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Label captured from the end marker; `Some` only once closed
    pub fn close_label(&self) -> Option<&str> {
        self.close_label.as_deref()
    }

    pub fn children(&self) -> &[Item] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Nesting depth; root is 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pair(&self) -> Option<usize> {
        self.pair
    }

    pub fn start_line(&self) -> Option<&str> {
        self.start_line.as_deref()
    }

    pub fn end_line(&self) -> Option<&str> {
        self.end_line.as_deref()
    }

    /// Content lines removed by the retention policy
    pub fn elided_lines(&self) -> usize {
        self.elided_lines
    }

    /// Stored content lines, marker lines included
    pub fn line_items(&self) -> usize {
        self.children.len() - self.subnodes.len()
    }

    /// Item indices of the sub-nodes, in order
    pub fn subnode_positions(&self) -> &[usize] {
        &self.subnodes
    }

    /// Item index of the content line with the given rank (0 = oldest stored).
    ///
    /// `rank` must be below [`Node::line_items`].
    pub fn line_position(&self, rank: usize) -> usize {
        // Sub-node k has `subnodes[k] - k` lines before it, ascending in k
        let (mut lo, mut hi) = (0, self.subnodes.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.subnodes[mid] - mid <= rank {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        rank + lo
    }

    /// Counts shown in the summary row. Marker lines kept as content are not
    /// counted.
    pub fn child_counts(&self) -> ChildCounts {
        let markers = usize::from(self.start_inline) + usize::from(self.end_inline);
        ChildCounts {
            nodes: self.subnodes.len(),
            lines: self.elided_lines + self.line_items() - markers,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

/// Rooted, ordered tree of nodes plus the open stack
#[derive(Debug, Clone, Serialize)]
pub struct Tree {
    nodes: Vec<Node>,
    /// Root first, innermost open node last. Never empty.
    open: Vec<NodeId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only the open root
    pub fn new() -> Self {
        let root = Node {
            id: NodeId::ROOT,
            label: String::new(),
            state: NodeState::Open,
            close_label: None,
            children: Vec::new(),
            parent: None,
            depth: 0,
            pair: None,
            start_line: None,
            end_line: None,
            elided_lines: 0,
            subnodes: Vec::new(),
            start_inline: false,
            end_inline: false,
        };
        Self {
            nodes: vec![root],
            open: vec![NodeId::ROOT],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Look up a node. Ids are only minted by this tree, so this never fails
    /// for an id obtained from it.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Open stack
    // ─────────────────────────────────────────────────────────────────────────

    /// Root-to-innermost chain of open nodes
    pub fn open_stack(&self) -> &[NodeId] {
        &self.open
    }

    /// The node new content attaches to
    pub fn innermost(&self) -> NodeId {
        // The root is never popped
        self.open.last().copied().unwrap_or(NodeId::ROOT)
    }

    /// Number of open nodes below the root
    pub fn open_depth(&self) -> usize {
        self.open.len() - 1
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a new node as the last child of the innermost open node
    pub fn open_node(
        &mut self,
        label: impl Into<String>,
        start_line: Option<String>,
        pair: Option<usize>,
    ) -> NodeId {
        let parent = self.innermost();
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;

        self.nodes.push(Node {
            id,
            label: label.into(),
            state: NodeState::Open,
            close_label: None,
            children: Vec::new(),
            parent: Some(parent),
            depth,
            pair,
            start_line,
            end_line: None,
            elided_lines: 0,
            subnodes: Vec::new(),
            start_inline: false,
            end_inline: false,
        });
        let parent = &mut self.nodes[parent.0];
        parent.subnodes.push(parent.children.len());
        parent.children.push(Item::Node(id));
        self.open.push(id);
        id
    }

    /// Append a content line to the innermost open node.
    ///
    /// Returns the receiving node and the item index of the new line.
    pub fn append_line(&mut self, text: impl Into<String>) -> (NodeId, usize) {
        let target = self.innermost();
        let children = &mut self.nodes[target.0].children;
        children.push(Item::Line(text.into()));
        (target, children.len() - 1)
    }

    /// Append a marker line as content of the innermost open node.
    ///
    /// Call it right after [`Tree::open_node`] for the start marker and right
    /// before [`Tree::close_innermost`] for the end marker. Marker lines stay
    /// out of the summary counts.
    pub fn append_marker_line(
        &mut self,
        role: MarkerRole,
        text: impl Into<String>,
    ) -> (NodeId, usize) {
        let (target, index) = self.append_line(text);
        if target != NodeId::ROOT {
            let node = &mut self.nodes[target.0];
            match role {
                MarkerRole::Start => node.start_inline = true,
                MarkerRole::End => node.end_inline = true,
            }
        }
        (target, index)
    }

    /// Close and pop the innermost non-root node.
    ///
    /// Returns `None`, leaving the tree untouched, when only the root is open.
    pub fn close_innermost(
        &mut self,
        close_label: impl Into<String>,
        end_line: Option<String>,
    ) -> Option<NodeId> {
        if self.open.len() <= 1 {
            return None;
        }
        let id = self.open.pop()?;
        let node = &mut self.nodes[id.0];
        node.state = NodeState::Closed;
        node.close_label = Some(close_label.into());
        node.end_line = end_line;
        Some(id)
    }

    /// Keep only the last `keep` content lines of a closed node.
    ///
    /// Sub-nodes are never removed. Returns the number of lines dropped.
    pub fn truncate_closed_lines(&mut self, id: NodeId, keep: usize) -> usize {
        let node = &mut self.nodes[id.0];
        if node.is_open() {
            return 0;
        }

        let total = node.line_items();
        let mut to_drop = total.saturating_sub(keep);
        if to_drop == 0 {
            return 0;
        }

        let dropped = to_drop;
        node.children.retain(|item| match item {
            Item::Line(_) if to_drop > 0 => {
                to_drop -= 1;
                false
            }
            _ => true,
        });
        node.subnodes = node
            .children
            .iter()
            .enumerate()
            .filter(|(_, item)| matches!(item, Item::Node(_)))
            .map(|(index, _)| index)
            .collect();

        // Marker lines are the oldest and newest stored lines
        let mut content = dropped;
        if node.start_inline {
            node.start_inline = false;
            content -= 1;
        }
        if node.end_inline && dropped == total {
            node.end_inline = false;
            content -= 1;
        }
        node.elided_lines += content;
        dropped
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structural queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn depth(&self, id: NodeId) -> usize {
        self.node(id).depth
    }

    pub fn is_open(&self, id: NodeId) -> bool {
        self.node(id).is_open()
    }

    /// Walk from a node's parent up to the root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.node(id).parent,
        }
    }

    /// Whether `ancestor` lies on the parent chain of `id` (strictly above it)
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Whether any node strictly below `id` is still open
    pub fn has_open_descendant(&self, id: NodeId) -> bool {
        // Open nodes form a single chain, so only open nodes can have open
        // descendants, and all of them except the innermost do
        self.is_open(id) && id != self.innermost()
    }

    /// Whether a node displays expanded: it is open, or something inside it is
    pub fn is_live(&self, id: NodeId) -> bool {
        self.is_open(id)
    }

    pub fn child_counts(&self, id: NodeId) -> ChildCounts {
        self.node(id).child_counts()
    }

    /// Rows the node occupies when displayed with minimization and no height
    /// limit: one summary row when fully closed, otherwise its header plus
    /// the rows of all its children.
    pub fn visible_rows(&self, id: NodeId) -> usize {
        let Some(from) = self.open.iter().position(|&open| open == id) else {
            return 1;
        };
        // Each open node shows all its items; the open child's single item
        // slot is replaced by its own header plus items
        1 + self.open[from..]
            .iter()
            .map(|open| self.nodes[open.0].children.len())
            .sum::<usize>()
    }

    /// Total content lines stored in the tree
    pub fn line_count(&self) -> usize {
        self.nodes.iter().map(Node::line_items).sum()
    }

    /// The captured input in arrival order: start markers, content and end
    /// markers interleaved as they were received.
    pub fn raw_lines(&self) -> Vec<&str> {
        let mut out = Vec::new();
        // (node, next item index); walked with an explicit stack so nesting
        // depth is bounded only by memory
        let mut stack = vec![(NodeId::ROOT, 0)];

        while let Some((id, next)) = stack.pop() {
            let node = self.node(id);
            if next == 0 {
                if let Some(start) = node.start_line.as_deref() {
                    out.push(start);
                }
            }

            let mut index = next;
            let mut descend = None;
            while let Some(item) = node.children.get(index) {
                index += 1;
                match item {
                    Item::Line(text) => out.push(text),
                    Item::Node(child) => {
                        descend = Some(*child);
                        break;
                    }
                }
            }

            match descend {
                Some(child) => {
                    stack.push((id, index));
                    stack.push((child, 0));
                }
                None => {
                    if let Some(end) = node.end_line.as_deref() {
                        out.push(end);
                    }
                }
            }
        }
        out
    }
}

/// Iterator over a node's ancestors, innermost first
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_open_root() {
        let tree = Tree::new();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.open_stack(), &[NodeId::ROOT]);
        assert!(tree.node(tree.root()).is_root());
        assert!(tree.is_open(tree.root()));
        assert_eq!(tree.open_depth(), 0);
    }

    #[test]
    fn test_open_node_attaches_to_innermost() {
        let mut tree = Tree::new();
        let outer = tree.open_node("outer", None, Some(0));
        let inner = tree.open_node("inner", None, Some(0));

        assert_eq!(tree.node(outer).parent(), Some(NodeId::ROOT));
        assert_eq!(tree.node(inner).parent(), Some(outer));
        assert_eq!(tree.depth(inner), 2);
        assert_eq!(tree.open_stack(), &[NodeId::ROOT, outer, inner]);
        assert_eq!(tree.node(outer).children(), &[Item::Node(inner)]);
    }

    #[test]
    fn test_append_line_returns_position() {
        let mut tree = Tree::new();
        let node = tree.open_node("build", None, None);
        assert_eq!(tree.append_line("a"), (node, 0));
        assert_eq!(tree.append_line("b"), (node, 1));
        assert_eq!(tree.line_count(), 2);
    }

    #[test]
    fn test_close_innermost_pops() {
        let mut tree = Tree::new();
        let node = tree.open_node("build", None, None);
        let closed = tree.close_innermost("0", Some("<< 0".into()));

        assert_eq!(closed, Some(node));
        assert_eq!(tree.node(node).state(), NodeState::Closed);
        assert_eq!(tree.node(node).close_label(), Some("0"));
        assert_eq!(tree.open_stack(), &[NodeId::ROOT]);
    }

    #[test]
    fn test_root_is_never_closed() {
        let mut tree = Tree::new();
        assert_eq!(tree.close_innermost("x", None), None);
        assert!(tree.is_open(NodeId::ROOT));
        assert_eq!(tree.node(NodeId::ROOT).close_label(), None);
    }

    #[test]
    fn test_ancestors_innermost_first() {
        let mut tree = Tree::new();
        let a = tree.open_node("a", None, None);
        let b = tree.open_node("b", None, None);
        let c = tree.open_node("c", None, None);

        let chain: Vec<_> = tree.ancestors(c).collect();
        assert_eq!(chain, vec![b, a, NodeId::ROOT]);
        assert!(tree.is_ancestor(a, c));
        assert!(!tree.is_ancestor(c, a));
        assert_eq!(tree.ancestors(NodeId::ROOT).count(), 0);
    }

    #[test]
    fn test_open_descendant_tracking() {
        let mut tree = Tree::new();
        let outer = tree.open_node("outer", None, None);
        let inner = tree.open_node("inner", None, None);

        assert!(tree.has_open_descendant(outer));
        assert!(!tree.has_open_descendant(inner));

        tree.close_innermost("", None);
        assert!(!tree.has_open_descendant(outer));
        assert!(tree.is_live(outer));
        assert!(!tree.is_live(inner));
    }

    #[test]
    fn test_visible_rows_minimizes_closed() {
        let mut tree = Tree::new();
        tree.open_node("build", None, None);
        tree.append_line("a");
        tree.append_line("b");
        let build = tree.innermost();
        assert_eq!(tree.visible_rows(build), 3);

        tree.close_innermost("0", None);
        assert_eq!(tree.visible_rows(build), 1);
        // root header + summary
        assert_eq!(tree.visible_rows(NodeId::ROOT), 2);
    }

    #[test]
    fn test_child_counts() {
        let mut tree = Tree::new();
        tree.append_line("x");
        tree.open_node("n", None, None);
        tree.close_innermost("", None);
        tree.append_line("y");

        let counts = tree.child_counts(NodeId::ROOT);
        assert_eq!(counts, ChildCounts { nodes: 1, lines: 2 });
    }

    #[test]
    fn test_truncate_closed_lines_keeps_tail_and_nodes() {
        let mut tree = Tree::new();
        let node = tree.open_node("big", None, None);
        for i in 0..5 {
            tree.append_line(format!("line {}", i));
        }
        let sub = tree.open_node("sub", None, None);
        tree.close_innermost("", None);
        tree.append_line("line 5");

        // Open nodes are left alone
        assert_eq!(tree.truncate_closed_lines(node, 2), 0);

        tree.close_innermost("done", None);
        assert_eq!(tree.truncate_closed_lines(node, 2), 4);

        let n = tree.node(node);
        assert_eq!(
            n.children(),
            &[
                Item::Line("line 4".into()),
                Item::Node(sub),
                Item::Line("line 5".into())
            ]
        );
        assert_eq!(n.elided_lines(), 4);
        assert_eq!(n.child_counts(), ChildCounts { nodes: 1, lines: 6 });
    }

    #[test]
    fn test_raw_lines_in_arrival_order() {
        let mut tree = Tree::new();
        tree.append_line("before");
        tree.open_node("a", Some(">> a".into()), Some(0));
        tree.append_line("inside");
        tree.close_innermost("ok", Some("<< ok".into()));
        tree.append_line("after");

        assert_eq!(
            tree.raw_lines(),
            vec!["before", ">> a", "inside", "<< ok", "after"]
        );
    }

    #[test]
    fn test_line_position_skips_sub_nodes() {
        let mut tree = Tree::new();
        tree.append_line("a");
        tree.open_node("n", None, None);
        tree.close_innermost("", None);
        tree.open_node("m", None, None);
        tree.close_innermost("", None);
        tree.append_line("b");
        tree.append_line("c");

        let root = tree.node(NodeId::ROOT);
        assert_eq!(root.subnode_positions(), &[1, 2]);
        assert_eq!(root.line_items(), 3);
        let positions: Vec<usize> = (0..3).map(|rank| root.line_position(rank)).collect();
        assert_eq!(positions, vec![0, 3, 4]);
    }

    #[test]
    fn test_deep_nesting_walks_without_recursion() {
        let mut tree = Tree::new();
        for _ in 0..200_000 {
            tree.open_node("x", Some(">> x".into()), Some(0));
        }
        tree.append_line("deep");

        assert_eq!(tree.visible_rows(NodeId::ROOT), 200_002);
        let raw = tree.raw_lines();
        assert_eq!(raw.len(), 200_001);
        assert_eq!(raw.last(), Some(&"deep"));
    }

    #[test]
    fn test_marker_lines_not_counted() {
        let mut tree = Tree::new();
        let node = tree.open_node("build", None, Some(0));
        tree.append_marker_line(MarkerRole::Start, ">> build");
        tree.append_line("cc a.c");
        tree.append_marker_line(MarkerRole::End, "<< 0");
        tree.close_innermost("0", None);

        assert_eq!(tree.node(node).line_items(), 3);
        assert_eq!(tree.child_counts(node), ChildCounts { nodes: 0, lines: 1 });
    }

    #[test]
    fn test_tree_serializes_to_json() {
        let mut tree = Tree::new();
        tree.open_node("build", None, Some(0));
        tree.append_line("compiling a.c");

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["nodes"][1]["label"], "build");
        assert_eq!(json["nodes"][1]["state"], "open");
        assert_eq!(json["nodes"][1]["children"][0]["kind"], "line");
        assert_eq!(json["nodes"][1]["children"][0]["value"], "compiling a.c");
        assert_eq!(json["open"], serde_json::json!([0, 1]));
    }
}
