//! Per-session state: the single-slot run serializer and the pane registry.
//!
//! Both are explicit objects owned by the host session, never process-wide
//! singletons. One of each lives for the duration of an editing session; the
//! pane set itself is rebuilt from scratch on every run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use deviz_protocol::{Pane, PaneContent};

use crate::config::CommandSpec;
use crate::run::{self, RunCanceler, RunError, ServerOutput};

/// Serializes user-program runs: at most one run's output is ever in flight
/// through the pipeline.
///
/// Starting a new run first cancels whatever run currently occupies the
/// slot. The superseded caller sees `Err(RunError::Canceled)` and its
/// output is discarded before it can touch any pane state — the
/// determinism precondition the core pipeline requires of its caller.
#[derive(Debug, Default)]
pub struct SerialRunner {
    next_id: AtomicU64,
    current: Mutex<Option<(u64, RunCanceler)>>,
}

impl SerialRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any in-flight run, then spawn and await `spec`.
    pub async fn run_latest(
        &self,
        working_dir: &Path,
        spec: &CommandSpec,
        stdin_text: &str,
    ) -> Result<ServerOutput, RunError> {
        let (handle, canceler) = run::spawn_server_command(working_dir, spec, stdin_text)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = self.current.lock().await;
            if let Some((superseded, previous)) = slot.take() {
                tracing::debug!(run = superseded, "canceling superseded run");
                previous.cancel();
            }
            *slot = Some((id, canceler));
        }

        let result = handle.wait().await;

        // Vacate the slot unless a newer run already took it over.
        let mut slot = self.current.lock().await;
        if matches!(&*slot, Some((current, _)) if *current == id) {
            *slot = None;
        }
        result
    }

    /// Cancel the in-flight run, if any.
    pub async fn cancel_current(&self) {
        if let Some((_, canceler)) = self.current.lock().await.take() {
            canceler.cancel();
        }
    }
}

/// Pane kind as tracked for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneKind {
    /// The editable input pane fed to the user program's stdin.
    Input,
    Text,
    Tree,
    TextTree,
    Graph,
}

impl From<&PaneContent> for PaneKind {
    fn from(content: &PaneContent) -> Self {
        match content {
            PaneContent::Text(_) => Self::Text,
            PaneContent::Tree(_) => Self::Tree,
            PaneContent::TextTree(_) => Self::TextTree,
            PaneContent::Graph(_) => Self::Graph,
        }
    }
}

/// Name of the reserved input pane.
pub const STDIN_PANE: &str = "stdin";

/// Session-scoped map of pane name → kind.
///
/// Kinds accumulate across runs so a display opened for an earlier run keeps
/// a valid kind; the ordered pane list reflects the latest run only, with
/// the reserved stdin pane always first.
#[derive(Debug)]
pub struct PaneRegistry {
    kinds: HashMap<String, PaneKind>,
    order: Vec<String>,
}

impl PaneRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: HashMap::from([(STDIN_PANE.to_string(), PaneKind::Input)]),
            order: vec![STDIN_PANE.to_string()],
        }
    }

    /// Record a run's final pane set.
    pub fn record_run(&mut self, panes: &[Pane]) {
        self.order.clear();
        self.order.push(STDIN_PANE.to_string());
        for pane in panes {
            self.kinds
                .insert(pane.name.clone(), PaneKind::from(&pane.content));
            self.order.push(pane.name.clone());
        }
    }

    /// Kind of a named pane, if it has ever been seen this session.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<PaneKind> {
        self.kinds.get(name).copied()
    }

    /// Pane names for the pane-list widget, latest run, stdin first.
    #[must_use]
    pub fn pane_names(&self) -> &[String] {
        &self.order
    }
}

impl Default for PaneRegistry {
    fn default() -> Self {
        Self::new()
    }
}
