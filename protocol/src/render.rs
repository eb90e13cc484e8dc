//! Consumption-side helpers for presentation layers.
//!
//! Nothing here renders to a screen; these functions produce the plain
//! strings and resolved node sets a text buffer, tree widget or graph view
//! consumes.

use std::collections::HashSet;

use crate::model::{Graph, GraphNode, Hover, Text, Tree};

/// Render a tree forest as indented text, one root per block, with a blank
/// line between roots.
#[must_use]
pub fn format_trees(trees: &[Tree]) -> String {
    let rendered: Vec<String> = trees.iter().map(format_tree).collect();
    rendered.join("\n")
}

/// Render one tree as indented text: two spaces per depth level, `None`
/// labels shown as ".", control characters in labels escaped.
///
/// Walks with an explicit stack — tree depth is bounded only by input size,
/// so recursion is not safe here.
#[must_use]
pub fn format_tree(tree: &Tree) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&Tree, usize)> = vec![(tree, 0)];
    while let Some((node, depth)) = stack.pop() {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&escape_label(node.label.as_deref()));
        out.push('\n');
        for child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

fn escape_label(label: Option<&str>) -> String {
    match label {
        None => ".".to_string(),
        Some(label) => label
            .replace('\n', "\\n")
            .replace('\t', "\\t")
            .replace('\r', "\\r"),
    }
}

/// The declared nodes followed by synthesized `label = None` nodes for every
/// edge endpoint id missing from the declared set.
///
/// Synthesized nodes appear in first-reference order, one per unique missing
/// id, so repeated references never produce duplicates.
#[must_use]
pub fn resolve_graph_nodes(graph: &Graph) -> Vec<GraphNode> {
    let mut seen: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    let mut resolved = graph.nodes.clone();
    for edge in &graph.edges {
        for id in [edge.from_id.as_str(), edge.to_id.as_str()] {
            if seen.insert(id) {
                resolved.push(GraphNode {
                    id: id.to_string(),
                    label: None,
                });
            }
        }
    }
    resolved
}

/// The hover to display at `offset` (in Unicode scalar values): of the
/// hovers covering the offset, the one with the smallest span wins; earlier
/// insertion wins ties.
#[must_use]
pub fn hover_at(text: &Text, offset: usize) -> Option<&Hover> {
    text.hovers
        .iter()
        .filter(|hover| hover.start <= offset && offset < hover.end)
        .min_by_key(|hover| hover.end - hover.start)
}
