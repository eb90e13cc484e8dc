//! The full stderr pipeline: scan → decode → order → merge.
//!
//! One complete captured stderr stream in, one [`StderrReport`] out. The
//! transformation is synchronous, single-pass and deterministic; malformed
//! input surfaces as entries in `validation_errors`, never as a panic or an
//! aborted run.

use crate::model::{Command, Pane};
use crate::{decode, merge, scanner};

/// Everything the host learns from one run's stderr.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StderrReport {
    /// The stderr stream with all marker regions removed.
    pub stripped_stderr: String,
    /// Decode and merge-conflict messages; first decode error only.
    pub validation_errors: Vec<String>,
    /// Final pane set, ordered by first appearance.
    pub panes: Vec<Pane>,
}

/// Run the complete pipeline over one captured stderr stream.
#[must_use]
pub fn parse_stderr(stderr: &str) -> StderrReport {
    let scan = scanner::scan(stderr);

    let mut validation_errors = Vec::new();
    let mut commands: Vec<Command> = Vec::new();
    for payload in &scan.payloads {
        match decode::decode_commands(payload) {
            Ok(batch) => commands.extend(batch),
            Err(err) => {
                // Reference behavior: only the first decode error reaches the
                // user; later ones are logged and dropped.
                if validation_errors.is_empty() {
                    validation_errors.push(format!("deviz API error: {err}"));
                } else {
                    tracing::debug!(error = %err, "suppressing repeated payload error");
                }
            }
        }
    }

    // Stable sort: equal indices keep their decode order, so the result is
    // deterministic no matter how the transport chunked the stream.
    commands.sort_by_key(|command| command.index);

    let merged = merge::merge_panes(commands.into_iter().map(|command| command.pane).collect());
    validation_errors.extend(merged.errors);

    StderrReport {
        stripped_stderr: scan.stripped,
        validation_errors,
        panes: merged.panes,
    }
}
