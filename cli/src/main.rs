//! deviz CLI — run a user program and print its panes.
//!
//! The binary is the smallest useful host: it runs one command in server
//! mode (either given on the command line or taken from `deviz.toml`),
//! passes the plain stderr through, and prints the merged panes to stdout.
//! Editor frontends replace this with their own presentation layer; the
//! pipeline underneath is identical.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use deviz_protocol::{Pane, PaneContent, render};
use deviz_runner::{
    CommandSpec, DevizConfig, RunMode, run_compile_command, run_server_command,
};

const USAGE: &str = "\
deviz — run a user program and display its panes

USAGE:
    deviz [OPTIONS] [--] <command...>
    deviz [OPTIONS]                      run mode from ./deviz.toml

OPTIONS:
    --dir <path>       working directory for the user program (default .)
    --stdin <file>     file fed to the user program's stdin
    -h, --help         show this help
";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new(""));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    working_dir: PathBuf,
    stdin_file: Option<PathBuf>,
    /// Command words joined into one shell line; None = use deviz.toml.
    command: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut working_dir = PathBuf::from(".");
    let mut stdin_file = None;
    let mut command_words: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dir" => {
                working_dir = PathBuf::from(iter.next().context("--dir needs a value")?);
            }
            "--stdin" => {
                stdin_file = Some(PathBuf::from(iter.next().context("--stdin needs a value")?));
            }
            "--" => {
                command_words.extend(iter.map(String::clone));
                break;
            }
            other if other.starts_with('-') && command_words.is_empty() => {
                bail!("unknown option {other}\n\n{USAGE}");
            }
            word => command_words.push(word.to_string()),
        }
    }

    Ok(CliArgs {
        working_dir,
        stdin_file,
        command: if command_words.is_empty() {
            None
        } else {
            Some(command_words.join(" "))
        },
    })
}

/// Render one pane for a terminal: a header line, then the content in the
/// plain-text form its kind defines.
fn render_pane(pane: &Pane) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "── {} ({})", pane.name, pane.content.type_name());
    match &pane.content {
        PaneContent::Text(text) => {
            out.push_str(&text.text);
            if !text.text.is_empty() && !text.text.ends_with('\n') {
                out.push('\n');
            }
            for hover in &text.hovers {
                let _ = writeln!(out, "  hover {}..{}: {}", hover.start, hover.end, hover.text);
            }
        }
        PaneContent::Tree(trees) | PaneContent::TextTree(trees) => {
            out.push_str(&render::format_trees(trees));
        }
        PaneContent::Graph(graphs) => {
            for graph in graphs {
                for node in render::resolve_graph_nodes(graph) {
                    match &node.label {
                        Some(label) => {
                            let _ = writeln!(out, "node {} [{label}]", node.id);
                        }
                        None => {
                            let _ = writeln!(out, "node {}", node.id);
                        }
                    }
                }
                for edge in &graph.edges {
                    match &edge.label {
                        Some(label) => {
                            let _ =
                                writeln!(out, "edge {} -> {} [{label}]", edge.from_id, edge.to_id);
                        }
                        None => {
                            let _ = writeln!(out, "edge {} -> {}", edge.from_id, edge.to_id);
                        }
                    }
                }
            }
        }
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let raw_args: Vec<String> = env::args().skip(1).collect();
    if raw_args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print!("{USAGE}");
        return Ok(());
    }
    let args = parse_args(&raw_args)?;

    let stdin_text = match &args.stdin_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading stdin file {}", path.display()))?,
        None => String::new(),
    };

    let run_spec = match &args.command {
        Some(command) => CommandSpec::new(command.clone()),
        None => {
            let config = DevizConfig::load(&args.working_dir)
                .context("no command given and no usable deviz.toml")?;
            if let RunMode::CompileOnSourceEdit {
                compile_command, ..
            } = &config.mode
            {
                tracing::debug!(command = %compile_command.command, "compiling");
                let compile = run_compile_command(&args.working_dir, compile_command).await?;
                if compile.exit_code != 0 {
                    eprint!("{}", compile.stderr);
                    bail!("compile command failed with exit code {}", compile.exit_code);
                }
            }
            config.mode.run_command().clone()
        }
    };

    let output = run_server_command(&args.working_dir, &run_spec, &stdin_text).await?;

    // Plain diagnostic output stays on stderr, order-preserving.
    eprint!("{}", output.stripped_stderr);
    for error in &output.validation_errors {
        eprintln!("deviz: {error}");
    }

    let mut stdout = std::io::stdout().lock();
    for pane in &output.panes {
        stdout.write_all(render_pane(pane).as_bytes())?;
    }
    stdout.flush()?;

    if output.exit_code != 0 {
        std::process::exit(output.exit_code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deviz_protocol::{Graph, GraphEdge, GraphNode, Hover, Text, Tree};

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_bare_command() {
        let args = parse_args(&strings(&["cargo", "run"])).unwrap();
        assert_eq!(args.command.as_deref(), Some("cargo run"));
        assert_eq!(args.working_dir, PathBuf::from("."));
    }

    #[test]
    fn test_parse_options_before_command() {
        let args = parse_args(&strings(&["--dir", "/tmp", "--stdin", "in.txt", "--", "./demo"]))
            .unwrap();
        assert_eq!(args.working_dir, PathBuf::from("/tmp"));
        assert_eq!(args.stdin_file, Some(PathBuf::from("in.txt")));
        assert_eq!(args.command.as_deref(), Some("./demo"));
    }

    #[test]
    fn test_parse_double_dash_stops_option_parsing() {
        let args = parse_args(&strings(&["--", "tool", "--dir", "flag-for-tool"])).unwrap();
        assert_eq!(args.command.as_deref(), Some("tool --dir flag-for-tool"));
    }

    #[test]
    fn test_parse_no_command_means_config() {
        let args = parse_args(&strings(&["--dir", "proj"])).unwrap();
        assert_eq!(args.command, None);
    }

    #[test]
    fn test_parse_unknown_option_fails() {
        assert!(parse_args(&strings(&["--frobnicate"])).is_err());
    }

    #[test]
    fn test_render_text_pane_with_hovers() {
        let pane = Pane {
            name: "types".to_string(),
            content: PaneContent::Text(Text {
                text: "x + y".to_string(),
                hovers: vec![Hover {
                    start: 0,
                    end: 1,
                    text: "Int".to_string(),
                }],
            }),
        };
        assert_eq!(
            render_pane(&pane),
            "── types (text)\nx + y\n  hover 0..1: Int\n"
        );
    }

    #[test]
    fn test_render_tree_pane() {
        let pane = Pane {
            name: "ast".to_string(),
            content: PaneContent::Tree(vec![Tree {
                label: Some("+".to_string()),
                children: vec![Tree {
                    label: Some("1".to_string()),
                    children: Vec::new(),
                }],
            }]),
        };
        assert_eq!(render_pane(&pane), "── ast (tree)\n+\n  1\n");
    }

    #[test]
    fn test_render_graph_pane_synthesizes_nodes() {
        let pane = Pane {
            name: "flow".to_string(),
            content: PaneContent::Graph(vec![Graph {
                nodes: vec![GraphNode {
                    id: "a".to_string(),
                    label: Some("Start".to_string()),
                }],
                edges: vec![GraphEdge {
                    from_id: "a".to_string(),
                    to_id: "ghost".to_string(),
                    label: None,
                }],
            }]),
        };
        assert_eq!(
            render_pane(&pane),
            "── flow (graph)\nnode a [Start]\nnode ghost\nedge a -> ghost\n"
        );
    }
}
