use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use mermaid_rules::scope::{Row, Variable};
use mermaid_rules::{DataInput, RuleSet};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mermaid-rules",
    about = "Apply data-driven binding and styling rules to Mermaid flowcharts"
)]
struct Cli {
    /// Flowchart file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// Rule document (YAML or JSON) with `bindingRules` and `stylingRules`
    #[arg(long, short = 'r')]
    rules: Option<PathBuf>,

    /// JSON array of data rows
    #[arg(long, short = 'd')]
    data: Option<PathBuf>,

    /// JSON array of `{ name, currentValue }` variables
    #[arg(long)]
    vars: Option<PathBuf>,

    /// Print what each rule touched to stderr
    #[arg(long)]
    trace: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let diagram = match &cli.file {
        Some(path) => read_file(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("ERROR: failed to read stdin: {e}");
                std::process::exit(1);
            });
            buf
        }
    };

    let rules = match &cli.rules {
        Some(path) => {
            let (rules, diagnostics) =
                mermaid_rules::load_rules(&read_file(path)).unwrap_or_else(|e| {
                    eprintln!("ERROR: {}: {e}", path.display());
                    std::process::exit(1);
                });
            for diagnostic in &diagnostics {
                eprintln!("WARNING: {diagnostic}");
            }
            rules
        }
        None => RuleSet::default(),
    };

    let rows: Vec<Row> = cli.data.as_deref().map(read_json).unwrap_or_default();
    let variables: Vec<Variable> = cli.vars.as_deref().map(read_json).unwrap_or_default();
    let input = DataInput::new(rows, variables);

    match mermaid_rules::render_with_trace(&diagram, &rules, &input) {
        Ok((output, traces)) => {
            if cli.trace {
                for trace in &traces {
                    eprintln!("{} {}: {}", trace.kind, trace.name, trace.applied_to.join(", "));
                }
            }
            print!("{output}");
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("ERROR: failed to read {}: {e}", path.display());
        std::process::exit(1);
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    serde_json::from_str(&read_file(path)).unwrap_or_else(|e| {
        eprintln!("ERROR: {} is not valid JSON input: {e}", path.display());
        std::process::exit(1);
    })
}
