//! Layout engine: turns trees into at most `height` display rows.
//!
//! A node that finished (closed, nothing open below it) collapses to one
//! summary row. Open nodes show a header followed by their children. When
//! the expanded rows do not fit, rows are dropped by [`DropClass`], lowest
//! priority first and oldest first within a class, so the tail of the live
//! output and the headers of the open chain are what survive.
//!
//! Several panes share the height: panes whose rows fit an even share keep
//! them, the rest split what is left as evenly as possible.

pub mod text;


use std::collections::HashMap;

use termfold_core::{Item, NodeId, Tree};

use text::{display_width, fit, sanitize};

/// Prefix of header and summary rows
pub const BRANCH_PREFIX: &str = "└── ";

/// Prefix of content rows
pub const LINE_PREFIX: &str = "│ ";

/// Columns of indentation per nesting level
pub const INDENT_WIDTH: usize = 4;

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

/// Which part of a node a row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Header,
    Summary,
    /// Item index of a content line in its node
    Line(usize),
}

/// Stable identity of a row across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub pane: usize,
    pub node: NodeId,
    pub slot: Slot,
}

/// Visual role of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Pane title (multi-pane mode)
    Title,
    /// Header of a node on the open stack
    OpenHeader,
    /// Header of a closed node shown expanded
    ClosedHeader,
    /// One-row summary of a finished node
    Summary,
    /// Content line away from the live tail
    Line,
    /// Content line of the innermost open node
    LiveLine,
}

/// Drop priority under overflow, dropped first to last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DropClass {
    OuterLine,
    LiveLine,
    Summary,
    Header,
    OpenHeader,
}

/// One display-ready row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub key: RowKey,
    pub kind: RowKind,
    /// Leading columns before the prefix
    pub indent: usize,
    pub prefix: &'static str,
    /// Main text, sanitized and clipped
    pub text: String,
    /// Secondary text after the main text (counts, hidden lines)
    pub detail: String,
}

impl DisplayRow {
    /// The row as plain text, without styling
    pub fn plain(&self) -> String {
        format!(
            "{:indent$}{}{}{}",
            "",
            self.prefix,
            self.text,
            self.detail,
            indent = self.indent
        )
    }
}

/// Layout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Viewport height in rows
    pub height: usize,
    /// Viewport width in columns; no clipping when `None`
    pub width: Option<usize>,
    /// Collapse finished nodes to summary rows
    pub minimize: bool,
    /// Show the pane title as the first row, even for a single pane
    pub title: bool,
}

impl LayoutOptions {
    pub fn new(height: usize) -> Self {
        Self {
            height,
            width: None,
            minimize: true,
            title: false,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn expanded(mut self) -> Self {
        self.minimize = false;
        self
    }

    pub fn with_title(mut self) -> Self {
        self.title = true;
        self
    }
}

/// A tree to lay out plus its title
#[derive(Debug, Clone, Copy)]
pub struct PaneView<'a> {
    pub tree: &'a Tree,
    pub title: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Candidates
// ─────────────────────────────────────────────────────────────────────────────

/// A row before selection; text is only built for rows that survive
#[derive(Debug, Clone, Copy)]
struct Candidate<'t> {
    key: RowKey,
    kind: RowKind,
    class: DropClass,
    level: usize,
    /// Node whose header counts this row as hidden when dropped
    owner: NodeId,
    line: Option<&'t str>,
}

/// Candidate rows of a pane plus the content lines already known to be
/// hidden, per owning node
struct Collected<'t> {
    candidates: Vec<Candidate<'t>>,
    hidden: HashMap<NodeId, usize>,
}

/// Item indices of `id` that can still survive a `height`-row selection,
/// in item order, plus the number of content lines left out.
///
/// Within one node, lines share a drop class and go oldest first, so only
/// the last `height` of them can be kept. The same holds for summaries.
fn surviving_items(
    tree: &Tree,
    id: NodeId,
    height: usize,
    minimize: bool,
) -> (Vec<usize>, usize) {
    let node = tree.node(id);
    let lines = node.line_items();
    let shown = lines.min(height);
    let subnodes = node.subnode_positions();

    let first_subnode = if minimize {
        // The live child, if any, is always the last item
        let live = match node.children().last() {
            Some(Item::Node(child)) => tree.is_live(*child),
            _ => false,
        };
        let summaries = subnodes.len() - usize::from(live);
        summaries.saturating_sub(height)
    } else {
        0
    };

    let mut items: Vec<usize> = (lines - shown..lines)
        .map(|rank| node.line_position(rank))
        .collect();
    items.extend_from_slice(&subnodes[first_subnode..]);
    items.sort_unstable();
    (items, lines - shown)
}

/// Walk state of one expanded node
struct Frame {
    id: NodeId,
    items: Vec<usize>,
    next: usize,
}

fn collect<'t>(
    tree: &'t Tree,
    pane: usize,
    title: Option<&'t str>,
    options: &LayoutOptions,
) -> Collected<'t> {
    let mut out = Collected {
        candidates: Vec::new(),
        hidden: HashMap::new(),
    };
    if let Some(title) = title {
        out.candidates.push(Candidate {
            key: RowKey {
                pane,
                node: tree.root(),
                slot: Slot::Header,
            },
            kind: RowKind::Title,
            class: DropClass::OpenHeader,
            level: 0,
            owner: tree.root(),
            line: Some(title),
        });
    }

    let enter = |id: NodeId, hidden: &mut HashMap<NodeId, usize>| {
        let (items, skipped) = surviving_items(tree, id, options.height, options.minimize);
        if skipped > 0 {
            hidden.insert(id, skipped);
        }
        Frame { id, items, next: 0 }
    };

    let mut stack = vec![enter(tree.root(), &mut out.hidden)];
    while let Some(frame) = stack.last_mut() {
        let Some(&index) = frame.items.get(frame.next) else {
            stack.pop();
            continue;
        };
        frame.next += 1;

        let id = frame.id;
        let node = tree.node(id);
        let live = id == tree.innermost();
        // Child headers line up with this node's content lines
        let level = node.depth();

        match &node.children()[index] {
            Item::Line(text) => out.candidates.push(Candidate {
                key: RowKey {
                    pane,
                    node: id,
                    slot: Slot::Line(index),
                },
                kind: if live { RowKind::LiveLine } else { RowKind::Line },
                class: if live {
                    DropClass::LiveLine
                } else {
                    DropClass::OuterLine
                },
                level,
                owner: id,
                line: Some(text),
            }),
            Item::Node(child) => {
                let child = *child;
                if options.minimize && !tree.is_live(child) {
                    out.candidates.push(Candidate {
                        key: RowKey {
                            pane,
                            node: child,
                            slot: Slot::Summary,
                        },
                        kind: RowKind::Summary,
                        class: DropClass::Summary,
                        level,
                        owner: id,
                        line: None,
                    });
                    continue;
                }

                let open = tree.is_open(child);
                out.candidates.push(Candidate {
                    key: RowKey {
                        pane,
                        node: child,
                        slot: Slot::Header,
                    },
                    kind: if open {
                        RowKind::OpenHeader
                    } else {
                        RowKind::ClosedHeader
                    },
                    class: if open {
                        DropClass::OpenHeader
                    } else {
                        DropClass::Header
                    },
                    level,
                    owner: id,
                    line: None,
                });
                let frame = enter(child, &mut out.hidden);
                stack.push(frame);
            }
        }
    }
    out
}

/// Pick which candidates survive a viewport of `height` rows
fn select(candidates: &[Candidate<'_>], height: usize) -> Vec<bool> {
    let mut keep = vec![true; candidates.len()];
    let mut excess = candidates.len().saturating_sub(height);

    for class in [
        DropClass::OuterLine,
        DropClass::LiveLine,
        DropClass::Summary,
        DropClass::Header,
        DropClass::OpenHeader,
    ] {
        if excess == 0 {
            break;
        }
        for (i, candidate) in candidates.iter().enumerate() {
            if excess == 0 {
                break;
            }
            if candidate.class == class {
                keep[i] = false;
                excess -= 1;
            }
        }
    }
    keep
}

// ─────────────────────────────────────────────────────────────────────────────
// Row text
// ─────────────────────────────────────────────────────────────────────────────

/// `label (closeLabel)`, skipping empty parts
fn node_title(tree: &Tree, id: NodeId) -> String {
    let node = tree.node(id);
    match node.close_label() {
        Some(close) if !close.is_empty() => {
            if node.label().is_empty() {
                format!("({})", close)
            } else {
                format!("{} ({})", node.label(), close)
            }
        }
        _ => node.label().to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// `[K node(s), N line(s)]`, the node part only when there are sub-nodes
pub fn summary_counts(tree: &Tree, id: NodeId) -> String {
    let counts = tree.child_counts(id);
    if counts.nodes > 0 {
        format!(
            "[{}, {}]",
            plural(counts.nodes, "node"),
            plural(counts.lines, "line")
        )
    } else {
        format!("[{}]", plural(counts.lines, "line"))
    }
}

fn hidden_suffix(hidden: usize) -> String {
    if hidden == 0 {
        String::new()
    } else {
        format!(" … {} hidden", hidden)
    }
}

fn build_row(
    tree: &Tree,
    candidate: &Candidate<'_>,
    hidden: &HashMap<NodeId, usize>,
    root_hidden: usize,
    width: Option<usize>,
) -> DisplayRow {
    let (prefix, text, detail) = match candidate.kind {
        RowKind::Title => (
            "",
            sanitize(candidate.line.unwrap_or_default()),
            hidden_suffix(hidden.get(&candidate.key.node).copied().unwrap_or(0)),
        ),
        RowKind::Line | RowKind::LiveLine => (
            LINE_PREFIX,
            sanitize(candidate.line.unwrap_or_default()),
            String::new(),
        ),
        RowKind::Summary => {
            let title = sanitize(&node_title(tree, candidate.key.node));
            let counts = summary_counts(tree, candidate.key.node);
            let detail = if title.is_empty() {
                counts
            } else {
                format!(" {}", counts)
            };
            (BRANCH_PREFIX, title, detail)
        }
        RowKind::OpenHeader | RowKind::ClosedHeader => (
            BRANCH_PREFIX,
            sanitize(&node_title(tree, candidate.key.node)),
            hidden_suffix(hidden.get(&candidate.key.node).copied().unwrap_or(0)),
        ),
    };

    let detail = detail + &hidden_suffix(root_hidden);

    let indent = candidate.level * INDENT_WIDTH;
    let (text, detail) = match width {
        Some(width) => {
            let room = width.saturating_sub(indent + display_width(prefix));
            fit(&text, &detail, room)
        }
        None => (text, detail),
    };

    DisplayRow {
        key: candidate.key,
        kind: candidate.kind,
        indent,
        prefix,
        text,
        detail,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Rows a pane needs without a height limit
pub fn natural_height(tree: &Tree, options: &LayoutOptions) -> usize {
    let rows = if options.minimize {
        tree.visible_rows(tree.root()) - 1
    } else {
        tree.line_count() + tree.node_count() - 1
    };
    rows + usize::from(options.title)
}

/// Lay out a single tree as pane 0
pub fn layout_tree(tree: &Tree, title: &str, options: &LayoutOptions) -> Vec<DisplayRow> {
    layout_pane(0, tree, title, options)
}

fn layout_pane(pane: usize, tree: &Tree, title: &str, options: &LayoutOptions) -> Vec<DisplayRow> {
    if options.height == 0 {
        return Vec::new();
    }

    let title = options.title.then_some(title);
    let Collected {
        candidates,
        mut hidden,
    } = collect(tree, pane, title, options);
    let keep = select(&candidates, options.height);

    for (candidate, kept) in candidates.iter().zip(&keep) {
        if !kept && matches!(candidate.class, DropClass::OuterLine | DropClass::LiveLine) {
            *hidden.entry(candidate.owner).or_insert(0) += 1;
        }
    }

    // Without a title row the root's hidden lines are reported on the first row
    let root_hidden = match title {
        Some(_) => 0,
        None => hidden.get(&tree.root()).copied().unwrap_or(0),
    };

    candidates
        .iter()
        .zip(&keep)
        .filter(|(_, kept)| **kept)
        .enumerate()
        .map(|(position, (candidate, _))| {
            let extra = if position == 0 { root_hidden } else { 0 };
            build_row(tree, candidate, &hidden, extra, options.width)
        })
        .collect()
}

/// Lay out every pane into one frame of at most `options.height` rows.
///
/// Titles are shown whenever there is more than one pane.
pub fn layout_panes(panes: &[PaneView<'_>], options: &LayoutOptions) -> Vec<DisplayRow> {
    let pane_options = LayoutOptions {
        title: options.title || panes.len() > 1,
        ..*options
    };

    let natural: Vec<usize> = panes
        .iter()
        .map(|pane| natural_height(pane.tree, &pane_options))
        .collect();
    let heights = allocate_heights(&natural, options.height);

    let mut rows = Vec::new();
    for (index, (pane, height)) in panes.iter().zip(heights).enumerate() {
        let options = LayoutOptions {
            height,
            ..pane_options
        };
        rows.extend(layout_pane(index, pane.tree, pane.title, &options));
    }
    rows
}

/// Number of items slot `idx` gets when `total` items are split over `slots`
/// slots as evenly as possible, earlier slots taking the remainder.
pub fn most_equal_divide(total: usize, slots: usize, idx: usize) -> usize {
    if slots == 0 {
        return 0;
    }
    total / slots + usize::from(idx < total % slots)
}

/// Split `height` rows between panes needing `natural` rows each.
///
/// Panes that fit their even share get exactly what they need; the leftover
/// is shared by the others, repeatedly, until no more panes fit.
pub fn allocate_heights(natural: &[usize], height: usize) -> Vec<usize> {
    if natural.iter().sum::<usize>() <= height {
        return natural.to_vec();
    }

    let mut alloc = vec![0; natural.len()];
    let mut open: Vec<usize> = (0..natural.len()).collect();
    let mut remaining = height;

    loop {
        let count = open.len();
        let fitting: Vec<usize> = open
            .iter()
            .enumerate()
            .filter(|(slot, &pane)| natural[pane] <= most_equal_divide(remaining, count, *slot))
            .map(|(_, &pane)| pane)
            .collect();

        if fitting.is_empty() {
            for (slot, &pane) in open.iter().enumerate() {
                alloc[pane] = most_equal_divide(remaining, count, slot);
            }
            return alloc;
        }

        for pane in fitting {
            alloc[pane] = natural[pane];
            remaining -= natural[pane];
            open.retain(|&p| p != pane);
        }
        if open.is_empty() {
            return alloc;
        }
    }
}
