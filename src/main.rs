//! docstruct - inspect rulesets and validate structure documents

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use docstruct::{Prefs, ValidationReport};

#[derive(Parser)]
#[command(name = "docstruct")]
#[command(version, about = "Structure model toolkit for digitized works", long_about = None)]
#[command(after_help = "EXAMPLES:
    docstruct rules ruleset.xml                     List structure types
    docstruct validate ruleset.xml book.xml         Validate a document
    docstruct normalize ruleset.xml book.xml -o out.xml")]
struct Cli {
    /// Log graph operations (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the structure types of a ruleset
    Rules {
        #[arg(value_name = "RULESET")]
        ruleset: PathBuf,
    },
    /// Validate a structure document against a ruleset
    Validate {
        #[arg(value_name = "RULESET")]
        ruleset: PathBuf,

        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read a document and write it back out
    Normalize {
        #[arg(value_name = "RULESET")]
        ruleset: PathBuf,

        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Rules { ruleset } => show_rules(&ruleset).map(|()| true),
        Command::Validate {
            ruleset,
            document,
            json,
        } => validate(&ruleset, &document, json),
        Command::Normalize {
            ruleset,
            document,
            output,
        } => normalize(&ruleset, &document, output.as_deref()).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("docstruct=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn show_rules(path: &Path) -> Result<(), String> {
    let prefs = Prefs::load(path).map_err(|e| e.to_string())?;

    for t in prefs.doc_struct_types() {
        let mut flags = Vec::new();
        if t.is_topmost {
            flags.push("top");
        }
        if t.is_anchor {
            flags.push("anchor");
        }
        if !t.has_file_set {
            flags.push("no-fileset");
        }
        if flags.is_empty() {
            println!("{}", t.name);
        } else {
            println!("{} [{}]", t.name, flags.join(", "));
        }
        if !t.allowed_children().is_empty() {
            println!("  children: {}", t.allowed_children().join(", "));
        }
        for rule in t.metadata_rules() {
            println!("  {:<3} {}", rule.cardinality.code(), rule.md_type.name);
        }
        for rule in t.group_rules() {
            println!("  {:<3} {} (group)", rule.cardinality.code(), rule.group_type.name);
        }
    }
    println!(
        "{} structure types, {} metadata types, {} groups",
        prefs.doc_struct_types().count(),
        prefs.metadata_types().len(),
        prefs.group_types().len()
    );
    Ok(())
}

fn validate(ruleset: &Path, document: &Path, json: bool) -> Result<bool, String> {
    let prefs = Prefs::load(ruleset).map_err(|e| e.to_string())?;
    let doc = docstruct::read_document(document, &prefs).map_err(|e| e.to_string())?;
    let report = docstruct::validate(&doc);

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        print_report(&report, document);
    }
    Ok(report.is_valid())
}

fn print_report(report: &ValidationReport, document: &Path) {
    if report.is_valid() {
        println!("{}: valid", document.display());
        return;
    }
    for d in &report.diagnostics {
        println!("[{}] {d}", d.code());
    }
    println!("{}: {} problem(s)", document.display(), report.len());
}

fn normalize(
    ruleset: &Path,
    document: &Path,
    output: Option<&Path>,
) -> Result<(), String> {
    let prefs = Prefs::load(ruleset).map_err(|e| e.to_string())?;
    let doc = docstruct::read_document(document, &prefs).map_err(|e| e.to_string())?;
    match output {
        Some(path) => {
            docstruct::write_document(&doc, path).map_err(|e| e.to_string())?;
            eprintln!("Wrote {} nodes to {}", doc.len(), path.display());
        }
        None => print!("{}", docstruct::xml::write(&doc)),
    }
    Ok(())
}
