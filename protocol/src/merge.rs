//! Pane merging — folds ordered pane emissions into uniquely named panes.
//!
//! A user program may emit the same pane name many times (streaming text,
//! growing a forest). The merger combines compatible same-typed emissions
//! through the content combinators and reports conflicts as error strings;
//! a conflict keeps the first-seen content rather than letting the last
//! writer win.

use std::collections::HashMap;

use crate::model::{Hover, Pane, PaneContent, Text};

/// Merged pane set plus conflict messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeOutput {
    /// Uniquely named panes, ordered by first appearance.
    pub panes: Vec<Pane>,
    /// One human-readable message per conflict.
    pub errors: Vec<String>,
}

/// Fold pane emissions (already in logical emission order) into the final
/// pane set.
#[must_use]
pub fn merge_panes(emissions: Vec<Pane>) -> MergeOutput {
    let mut errors = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut contents: HashMap<String, PaneContent> = HashMap::new();

    for pane in emissions {
        let Some(previous) = contents.remove(&pane.name) else {
            order.push(pane.name.clone());
            contents.insert(pane.name, pane.content);
            continue;
        };
        match combine(previous, pane.content) {
            Ok(merged) => {
                contents.insert(pane.name, merged);
            }
            Err(conflict) => {
                errors.push(conflict.message(&pane.name));
                contents.insert(pane.name, conflict.into_first());
            }
        }
    }

    let panes = order
        .into_iter()
        .filter_map(|name| {
            contents.remove(&name).map(|content| Pane { name, content })
        })
        .collect();

    MergeOutput { panes, errors }
}

/// A pair of emissions for one name that could not be combined. Carries the
/// first-seen content so the merger can retain it.
#[derive(Debug)]
struct MergeConflict {
    first: PaneContent,
    second_type: &'static str,
}

impl MergeConflict {
    fn message(&self, name: &str) -> String {
        let first_type = self.first.type_name();
        if first_type == self.second_type {
            format!("{name} referenced twice. Panes of type {first_type} can only have one item.")
        } else {
            format!(
                "{name} has conflicting types: {first_type} and {}",
                self.second_type
            )
        }
    }

    fn into_first(self) -> PaneContent {
        self.first
    }
}

/// Combine two same-typed contents. All four current variants merge; the
/// `Err` path generalizes to variants whose policy forbids a second
/// emission, and to mismatched tags.
fn combine(first: PaneContent, second: PaneContent) -> Result<PaneContent, MergeConflict> {
    match (first, second) {
        (PaneContent::Text(a), PaneContent::Text(b)) => Ok(PaneContent::Text(concat_text(a, b))),
        (PaneContent::Tree(mut a), PaneContent::Tree(b)) => {
            a.extend(b);
            Ok(PaneContent::Tree(a))
        }
        (PaneContent::TextTree(mut a), PaneContent::TextTree(b)) => {
            a.extend(b);
            Ok(PaneContent::TextTree(a))
        }
        (PaneContent::Graph(mut a), PaneContent::Graph(b)) => {
            a.extend(b);
            Ok(PaneContent::Graph(a))
        }
        (first, second) => Err(MergeConflict {
            second_type: second.type_name(),
            first,
        }),
    }
}

/// Positional text concatenation. The second operand's hovers shift by the
/// first operand's length in Unicode scalar values, not bytes.
fn concat_text(first: Text, second: Text) -> Text {
    let shift = first.text.chars().count();
    let mut text = first.text;
    text.push_str(&second.text);

    let mut hovers = first.hovers;
    hovers.extend(second.hovers.into_iter().map(|hover| Hover {
        start: hover.start + shift,
        end: hover.end + shift,
        text: hover.text,
    }));

    Text { text, hovers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tree;

    fn text_pane(name: &str, text: &str, hovers: Vec<Hover>) -> Pane {
        Pane {
            name: name.to_string(),
            content: PaneContent::Text(Text {
                text: text.to_string(),
                hovers,
            }),
        }
    }

    fn tree_pane(name: &str, labels: &[&str]) -> Pane {
        Pane {
            name: name.to_string(),
            content: PaneContent::Tree(
                labels
                    .iter()
                    .map(|label| Tree {
                        label: Some((*label).to_string()),
                        children: Vec::new(),
                    })
                    .collect(),
            ),
        }
    }

    fn hover(start: usize, end: usize, text: &str) -> Hover {
        Hover {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_distinct_names_pass_through_in_order() {
        let output = merge_panes(vec![
            text_pane("b", "1", Vec::new()),
            text_pane("a", "2", Vec::new()),
        ]);
        assert!(output.errors.is_empty());
        let names: Vec<&str> = output.panes.iter().map(|p| p.name.as_str()).collect();
        // Insertion order, not sorted by name.
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_text_merge_concatenates_and_shifts_hovers() {
        let output = merge_panes(vec![
            text_pane("p", "ab", vec![hover(0, 1, "x")]),
            text_pane("p", "cd", vec![hover(1, 2, "y")]),
        ]);
        assert!(output.errors.is_empty());
        assert_eq!(output.panes.len(), 1);
        assert_eq!(
            output.panes[0].content,
            PaneContent::Text(Text {
                text: "abcd".to_string(),
                hovers: vec![hover(0, 1, "x"), hover(3, 4, "y")],
            })
        );
    }

    #[test]
    fn test_hover_shift_counts_chars_not_bytes() {
        // "héllo" is 5 scalar values but 6 bytes.
        let output = merge_panes(vec![
            text_pane("p", "héllo", Vec::new()),
            text_pane("p", "world", vec![hover(0, 5, "w")]),
        ]);
        assert_eq!(
            output.panes[0].content,
            PaneContent::Text(Text {
                text: "hélloworld".to_string(),
                hovers: vec![hover(5, 10, "w")],
            })
        );
    }

    #[test]
    fn test_tree_merge_concatenates_forests() {
        let output = merge_panes(vec![tree_pane("t", &["T1"]), tree_pane("t", &["T2"])]);
        assert!(output.errors.is_empty());
        match &output.panes[0].content {
            PaneContent::Tree(trees) => {
                let labels: Vec<_> = trees.iter().map(|t| t.label.as_deref()).collect();
                assert_eq!(labels, vec![Some("T1"), Some("T2")]);
            }
            other => panic!("expected tree content, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_is_left_to_right_fold() {
        // Three emissions must fold left-to-right in emission order.
        let output = merge_panes(vec![
            text_pane("p", "a", Vec::new()),
            text_pane("p", "b", vec![hover(0, 1, "b")]),
            text_pane("p", "c", vec![hover(0, 1, "c")]),
        ]);
        assert_eq!(
            output.panes[0].content,
            PaneContent::Text(Text {
                text: "abc".to_string(),
                hovers: vec![hover(1, 2, "b"), hover(2, 3, "c")],
            })
        );
    }

    #[test]
    fn test_conflicting_types_keep_first_and_report() {
        let output = merge_panes(vec![
            text_pane("p", "first", Vec::new()),
            tree_pane("p", &["second"]),
        ]);
        assert_eq!(
            output.errors,
            vec!["p has conflicting types: text and tree".to_string()]
        );
        assert_eq!(output.panes.len(), 1);
        // First-seen content retained; last writer does not win.
        assert_eq!(
            output.panes[0].content,
            PaneContent::Text(Text {
                text: "first".to_string(),
                hovers: Vec::new(),
            })
        );
    }

    #[test]
    fn test_conflict_does_not_disturb_other_panes() {
        let output = merge_panes(vec![
            text_pane("a", "1", Vec::new()),
            tree_pane("a", &["x"]),
            text_pane("b", "2", Vec::new()),
        ]);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.panes.len(), 2);
        assert_eq!(output.panes[1].name, "b");
    }

    #[test]
    fn test_graph_merge_concatenates_whole_graphs() {
        let graph = |id: &str| {
            crate::model::Graph {
                nodes: vec![crate::model::GraphNode {
                    id: id.to_string(),
                    label: None,
                }],
                edges: Vec::new(),
            }
        };
        let pane = |g: crate::model::Graph| Pane {
            name: "g".to_string(),
            content: PaneContent::Graph(vec![g]),
        };
        let output = merge_panes(vec![pane(graph("a")), pane(graph("b"))]);
        match &output.panes[0].content {
            PaneContent::Graph(graphs) => {
                // Two whole graphs, never merged node/edge sets.
                assert_eq!(graphs.len(), 2);
                assert_eq!(graphs[0].nodes[0].id, "a");
                assert_eq!(graphs[1].nodes[0].id, "b");
            }
            other => panic!("expected graph content, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let output = merge_panes(Vec::new());
        assert!(output.panes.is_empty());
        assert!(output.errors.is_empty());
    }
}
