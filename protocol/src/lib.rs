//! Host-side implementation of the deviz stderr protocol.
//!
//! A user program emits marker-delimited JSON command batches on its stderr,
//! interleaved with ordinary log text. This crate turns one captured stderr
//! stream into a stripped plain-text stream plus an ordered, merged set of
//! named panes — synchronously, deterministically, and without panicking on
//! malformed input.
//!
//! No IO, no async: a runner captures the bytes, this crate interprets them.

/// Environment variable the host sets to `1` in the user program's
/// environment to request protocol output on stderr. Absent, the user
/// program emits nothing and all stderr is plain text.
pub const SERVER_ENV_VAR: &str = "DEVIZ_SERVER";

pub mod decode;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod scanner;

pub use decode::DecodeError;
pub use model::{Command, Graph, GraphEdge, GraphNode, Hover, Pane, PaneContent, Text, Tree};
pub use pipeline::{StderrReport, parse_stderr};
