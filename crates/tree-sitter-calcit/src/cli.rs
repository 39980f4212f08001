//! `calcit-grammar`: load a tree-sitter grammar artifact and report on it.
//!
//! Without arguments the bundled Calcit grammar is checked. Exits non-zero
//! when the grammar fails to load.

use facet::Facet;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use std::error::Error;
use tree_sitter_calcit::{language, Language};

/// Command-line arguments.
#[derive(Facet)]
struct Args {
    /// Path to a `grammar.json` file. Defaults to the bundled grammar.
    #[facet(named, default)]
    grammar: Option<String>,

    /// Print node types as JSON instead of the summary line.
    #[facet(named, default)]
    json: bool,

    /// Log at debug level.
    #[facet(named, short = 'v', default)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args: Args = match facet_args::from_std_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let language = match &args.grammar {
        Some(path) => Language::from_path(path)?,
        None => language()?,
    };

    if args.json {
        println!("{}", language.node_types_json()?);
    } else {
        println!(
            "{}: {} rules, {} node kinds, {} fields",
            language.name(),
            language.grammar().rules.len(),
            language.node_kind_count(),
            language.field_count()
        );
    }
    Ok(())
}
