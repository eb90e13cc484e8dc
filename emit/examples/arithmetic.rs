//! A tiny instrumented "compiler": emits an AST pane, a typed-source text
//! pane with hovers, and a control-flow graph pane.
//!
//! Run under the host (`deviz`) or directly with `DEVIZ_SERVER=1` to see the
//! raw protocol output on stderr.

fn main() {
    let mut tree = deviz_emit::tree("ast");
    tree.begin_node();
    tree.label("+");
    {
        tree.begin_node();
        tree.label("1");
        tree.end_node();
    }
    {
        tree.begin_node();
        tree.label("2");
        tree.end_node();
    }
    tree.end_node();

    let mut text = deviz_emit::text("types", "x + y");
    text.hover_text(0..1, "Int");
    text.hover_text(4..5, "Bool");
    text.hover_text(0..5, "Error");

    let mut graph = deviz_emit::graph("flow");
    graph.node_labeled("entry", "fn main");
    graph.node("add");
    graph.edge("entry", "add");
    graph.edge_labeled("add", "exit", "return");

    eprintln!("arithmetic demo finished");
}
