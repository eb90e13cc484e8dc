//! Subprocess collaborator for the deviz pipeline.
//!
//! The protocol core is pure; this crate supplies its boundary: spawning the
//! user program, feeding stdin, capturing output, canceling superseded runs,
//! and serializing runs so at most one output stream is ever interpreted at
//! a time.

pub mod config;
pub mod run;
pub mod session;

pub use deviz_protocol::SERVER_ENV_VAR;

pub use config::{CommandSpec, ConfigError, DevizConfig, RunMode};
pub use run::{
    ProgramOutput, RunCanceler, RunError, RunHandle, ServerOutput, ServerRunHandle, run_command,
    run_compile_command, run_server_command, spawn_command, spawn_server_command,
};
pub use session::{PaneKind, PaneRegistry, STDIN_PANE, SerialRunner};
