//! Wire data model for pane output.
//!
//! These types mirror the JSON the user program emits between the stderr
//! markers, field names included (camelCase where the wire uses it), so the
//! `serde` derives double as the schema. Two legacy emitter generations are
//! absorbed at the deserialization boundary: a bare object where a list is
//! expected decodes as a one-element list, and a bare string pane content
//! decodes as text with no hovers. Serialization always produces the
//! canonical forms.

use serde::{Deserialize, Deserializer, Serialize};

/// A highlighted sub-range of a [`Text`] with an associated tooltip.
///
/// Offsets count Unicode scalar values from the start of the owning text,
/// not bytes. Invariant: `start <= end <= text.chars().count()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Plain text with hover annotations.
///
/// Hovers stay in insertion order and may overlap; where they do, the
/// smallest span is authoritative for display (see
/// [`crate::render::hover_at`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    pub hovers: Vec<Hover>,
}

/// One node of a labeled tree. Each node exclusively owns its children;
/// cycles are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub label: Option<String>,
    pub children: Vec<Tree>,
}

/// A directed graph. Edges may reference ids missing from `nodes`; such
/// nodes are synthesized at consumption time by
/// [`crate::render::resolve_graph_nodes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(rename = "fromId")]
    pub from_id: String,
    #[serde(rename = "toId")]
    pub to_id: String,
    pub label: Option<String>,
}

/// Typed pane payload, discriminated by the wire `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaneContent {
    #[serde(rename = "text")]
    Text(Text),
    #[serde(rename = "tree")]
    Tree(#[serde(deserialize_with = "one_or_many")] Vec<Tree>),
    #[serde(rename = "textTree")]
    TextTree(#[serde(deserialize_with = "one_or_many")] Vec<Tree>),
    #[serde(rename = "graph")]
    Graph(#[serde(deserialize_with = "one_or_many")] Vec<Graph>),
}

impl PaneContent {
    /// The wire tag for this variant, as used in conflict messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Tree(_) => "tree",
            Self::TextTree(_) => "textTree",
            Self::Graph(_) => "graph",
        }
    }
}

/// A named output artifact. `name` is the unique key within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pane {
    pub name: String,
    #[serde(deserialize_with = "content_or_shorthand")]
    pub content: PaneContent,
}

/// One ordered pane-emission event — the unit of transmission.
///
/// `index` is an ordering key only: mutually comparable, but not required
/// contiguous or zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub index: i64,
    pub pane: Pane,
}

/// Accept either the canonical list or a legacy bare object.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// Accept either a tagged content object or the bare-string text shorthand.
fn content_or_shorthand<'de, D>(deserializer: D) -> Result<PaneContent, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ContentRepr {
        Full(PaneContent),
        Shorthand(String),
    }

    Ok(match ContentRepr::deserialize(deserializer)? {
        ContentRepr::Full(content) => content,
        ContentRepr::Shorthand(text) => PaneContent::Text(Text {
            text,
            hovers: Vec::new(),
        }),
    })
}
