//! Generate a Mermaid flowchart from the reconcile PIPELINE table.
//!
//! Usage:
//!   cargo run --bin pipeline_diagram                     # stdout
//!   cargo run --bin pipeline_diagram -- --out PIPELINE.md

use std::path::PathBuf;

use hostproxy_operator::controller::pipeline::PIPELINE;

fn main() -> anyhow::Result<()> {
    let out: Option<PathBuf> = std::env::args()
        .skip_while(|a| a != "--out")
        .nth(1)
        .map(PathBuf::from);

    let md = generate();

    match out {
        Some(path) => {
            std::fs::write(&path, &md)?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{md}"),
    }
    Ok(())
}

fn generate() -> String {
    let mut out = String::new();
    out.push_str("# Hostproxy Reconcile Pipeline\n\n");
    out.push_str("Auto-generated from the `PIPELINE` table in `controller/pipeline.rs`.\n");
    out.push_str("Errors are not drawn: any phase may fail and be retried by the error policy.\n\n");
    out.push_str("```mermaid\nflowchart TD\n");
    out.push_str("    Fetch -->|not found| Done([done])\n");

    let mut prev = "Fetch";
    let mut outcomes: Vec<(String, String)> = Vec::new();
    for phase in PIPELINE.iter() {
        let name = phase.name();
        out.push_str(&format!("    {prev} --> {name}\n"));
        for exit in phase.exits() {
            let label = exit.outcome.to_string();
            let target = outcome_node(&label);
            if !outcomes.iter().any(|(node, _)| *node == target) {
                outcomes.push((target.clone(), label));
            }
            out.push_str(&format!("    {name} -->|\"{}\"| {target}\n", exit.guard));
        }
        prev = name;
    }

    out.push('\n');
    for (node, label) in &outcomes {
        if node != "Done" {
            out.push_str(&format!("    {node}([{label}])\n"));
        }
    }
    out.push_str("```\n");
    out
}

/// Mermaid node id for an outcome label ("requeue after 60s" -> "RequeueAfter60s").
fn outcome_node(label: &str) -> String {
    label
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
