//! User-program client for the deviz protocol.
//!
//! Builders collect pane content and emit it on stderr as one
//! marker-delimited JSON command batch when dropped, so pane output follows
//! scope structure without explicit flush calls:
//!
//! ```
//! let mut tree = deviz_emit::tree("ast");
//! tree.begin_node();
//! tree.label("+");
//! tree.end_node();
//! // emitted here, when `tree` goes out of scope
//! ```
//!
//! Nothing is written unless the host set `DEVIZ_SERVER=1` in this process's
//! environment, so instrumented programs behave normally outside the host
//! tool. A process-global atomic counter supplies each command's ordering
//! index; the host reorders by it, so interleaved stderr writes from
//! concurrent threads still merge deterministically.

use std::env;
use std::ops::Range;
use std::sync::atomic::{AtomicI64, Ordering};

use deviz_protocol::scanner::{BEGIN_MARKER, END_MARKER};
use deviz_protocol::{
    Command, Graph, GraphEdge, GraphNode, Hover, Pane, PaneContent, SERVER_ENV_VAR, Text, Tree,
};

static COMMAND_INDEX: AtomicI64 = AtomicI64::new(0);

fn next_command_index() -> i64 {
    COMMAND_INDEX.fetch_add(1, Ordering::SeqCst)
}

fn server_mode() -> bool {
    env::var(SERVER_ENV_VAR).is_ok_and(|value| value.trim() == "1")
}

fn send_command(command: &Command) {
    if !server_mode() {
        return;
    }
    // The payload is always a one-element batch; the host concatenates
    // batches across writes.
    if let Ok(json) = serde_json::to_string(std::slice::from_ref(command)) {
        eprint!("{BEGIN_MARKER}{json}{END_MARKER}");
    }
}

fn command(index: i64, pane_name: String, content: PaneContent) -> Command {
    Command {
        index,
        pane: Pane {
            name: pane_name,
            content,
        },
    }
}

/// Start a text pane emission. The text is fixed up front; hovers may be
/// added until the builder drops.
pub fn text(pane_name: impl Into<String>, text: impl Into<String>) -> TextBuilder {
    TextBuilder {
        index: next_command_index(),
        pane_name: pane_name.into(),
        content: Text {
            text: text.into(),
            hovers: Vec::new(),
        },
    }
}

#[derive(Debug)]
pub struct TextBuilder {
    index: i64,
    pane_name: String,
    content: Text,
}

impl TextBuilder {
    /// Attach a tooltip to a range of the text. Offsets count Unicode
    /// scalar values, matching what the host expects.
    pub fn hover_text(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.content.hovers.push(Hover {
            start: range.start,
            end: range.end,
            text: text.into(),
        });
    }

    fn to_command(&self) -> Command {
        command(
            self.index,
            self.pane_name.clone(),
            PaneContent::Text(self.content.clone()),
        )
    }
}

impl Drop for TextBuilder {
    fn drop(&mut self) {
        send_command(&self.to_command());
    }
}

/// Start a tree pane emission (rendered as a collapsible tree).
pub fn tree(pane_name: impl Into<String>) -> TreeBuilder {
    TreeBuilder::new(pane_name.into(), TreeKind::Tree)
}

/// Start a textTree pane emission (rendered as indented text).
pub fn text_tree(pane_name: impl Into<String>) -> TreeBuilder {
    TreeBuilder::new(pane_name.into(), TreeKind::TextTree)
}

#[derive(Debug, Clone, Copy)]
enum TreeKind {
    Tree,
    TextTree,
}

/// Builds a forest one node at a time with begin/label/end calls. Nodes
/// still open when the builder drops are closed implicitly.
#[derive(Debug)]
pub struct TreeBuilder {
    index: i64,
    pane_name: String,
    kind: TreeKind,
    roots: Vec<Tree>,
    stack: Vec<Tree>,
}

impl TreeBuilder {
    fn new(pane_name: String, kind: TreeKind) -> Self {
        Self {
            index: next_command_index(),
            pane_name,
            kind,
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Open a child of the current node (or a new root).
    pub fn begin_node(&mut self) {
        self.stack.push(Tree {
            label: None,
            children: Vec::new(),
        });
    }

    /// Close the current node.
    ///
    /// # Panics
    ///
    /// Panics when there is no open node — a begin/end mismatch in the
    /// instrumented program.
    pub fn end_node(&mut self) {
        let node = self
            .stack
            .pop()
            .expect("mismatched begin_node/end_node calls");
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Set the current node's label.
    ///
    /// # Panics
    ///
    /// Panics when called outside a begin/end pair.
    pub fn label(&mut self, label: impl Into<String>) {
        let node = self
            .stack
            .last_mut()
            .expect("label must be called between begin_node and end_node");
        node.label = Some(label.into());
    }

    fn to_command(&mut self) -> Command {
        while !self.stack.is_empty() {
            self.end_node();
        }
        let forest = self.roots.clone();
        let content = match self.kind {
            TreeKind::Tree => PaneContent::Tree(forest),
            TreeKind::TextTree => PaneContent::TextTree(forest),
        };
        command(self.index, self.pane_name.clone(), content)
    }
}

impl Drop for TreeBuilder {
    fn drop(&mut self) {
        send_command(&self.to_command());
    }
}

/// Start a graph pane emission.
pub fn graph(pane_name: impl Into<String>) -> GraphBuilder {
    GraphBuilder {
        index: next_command_index(),
        pane_name: pane_name.into(),
        graph: Graph {
            nodes: Vec::new(),
            edges: Vec::new(),
        },
    }
}

/// Accumulates nodes and edges; emits one whole graph on drop. Edges may
/// reference ids never declared as nodes — the host synthesizes those.
#[derive(Debug)]
pub struct GraphBuilder {
    index: i64,
    pane_name: String,
    graph: Graph,
}

impl GraphBuilder {
    pub fn node(&mut self, id: impl Into<String>) {
        self.graph.nodes.push(GraphNode {
            id: id.into(),
            label: None,
        });
    }

    pub fn node_labeled(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.graph.nodes.push(GraphNode {
            id: id.into(),
            label: Some(label.into()),
        });
    }

    pub fn edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) {
        self.graph.edges.push(GraphEdge {
            from_id: from_id.into(),
            to_id: to_id.into(),
            label: None,
        });
    }

    pub fn edge_labeled(
        &mut self,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.graph.edges.push(GraphEdge {
            from_id: from_id.into(),
            to_id: to_id.into(),
            label: Some(label.into()),
        });
    }

    fn to_command(&self) -> Command {
        command(
            self.index,
            self.pane_name.clone(),
            PaneContent::Graph(vec![self.graph.clone()]),
        )
    }
}

impl Drop for GraphBuilder {
    fn drop(&mut self) {
        send_command(&self.to_command());
    }
}
