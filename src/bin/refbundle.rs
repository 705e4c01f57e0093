//! refbundle CLI
//!
//! Command-line interface for resolving, dereferencing, and bundling
//! `$ref` graphs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use refbundle::{bundle, dereference, resolve, CircularPolicy, Error, Options};

#[derive(Parser)]
#[command(name = "refbundle")]
#[command(about = "Resolve, dereference, and bundle $ref graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every document reachable from the root
    Resolve {
        /// Root document: file path or URL (http:// or https://)
        source: String,

        /// Print a JSON object mapping each URL to its contents
        #[arg(long)]
        values: bool,

        /// Leave external $refs unresolved
        #[arg(long)]
        no_external: bool,

        /// Keep going past unreadable documents and report them at the end
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Replace every $ref with the value it targets
    Dereference {
        /// Root document: file path or URL (http:// or https://)
        source: String,

        /// Circular reference handling: share, error, or ignore
        #[arg(long, default_value = "share")]
        circular: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Inline external targets into a single self-contained document
    Bundle {
        /// Root document: file path or URL (http:// or https://)
        source: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            source,
            values,
            no_external,
            continue_on_error,
        } => run_resolve(&source, values, no_external, continue_on_error),
        Commands::Dereference {
            source,
            circular,
            output,
            pretty,
        } => run_dereference(&source, &circular, output, pretty),
        Commands::Bundle {
            source,
            output,
            pretty,
        } => run_bundle(&source, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn report(err: &Error) -> u8 {
    eprintln!("Error: {err}");
    err.exit_code() as u8
}

fn run_resolve(
    source: &str,
    values: bool,
    no_external: bool,
    continue_on_error: bool,
) -> Result<(), u8> {
    let options = Options::new()
        .external(!no_external)
        .continue_on_error(continue_on_error);
    let catalog = resolve(source, &options).map_err(|e| report(&e))?;

    if values {
        let map: serde_json::Map<String, serde_json::Value> = catalog
            .values(None)
            .into_iter()
            .map(|(url, value)| (url.to_string(), value.clone()))
            .collect();
        print_value(&serde_json::Value::Object(map), None, true)?;
    } else {
        for url in catalog.paths(None) {
            println!("{url}");
        }
    }

    for err in catalog.errors() {
        eprintln!("Warning: {err}");
    }
    Ok(())
}

fn run_dereference(
    source: &str,
    circular: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let policy = match circular {
        "share" => CircularPolicy::Share,
        "error" => CircularPolicy::Error,
        "ignore" => CircularPolicy::Ignore,
        other => {
            eprintln!("Error: unknown circular policy \"{other}\" (expected share, error, or ignore)");
            return Err(2);
        }
    };
    let options = Options::new().circular(policy);
    let out = dereference(source, &options).map_err(|e| report(&e))?;

    if out.catalog.circular() {
        eprintln!(
            "Warning: circular references at {}",
            out.catalog.circular_refs().join(", ")
        );
    }
    print_value(&out.graph.to_value(), output.as_deref(), pretty)
}

fn run_bundle(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let options = Options::default();
    let out = bundle(source, &options).map_err(|e| report(&e))?;
    print_value(&out.value, output.as_deref(), pretty)
}

fn print_value(
    value: &serde_json::Value,
    output: Option<&std::path::Path>,
    pretty: bool,
) -> Result<(), u8> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {e}");
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {e}", path.display());
                3u8
            })?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
