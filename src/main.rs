//! Command-line interface for xmlmodel

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlmodel::models::{parse_content_spec, ChildSymbol, ContentModel, ParseContext};
#[cfg(feature = "cli")]
use xmlmodel::{Document, DocumentOptions, Limits, SymbolTable, ValidationResult};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlmodel")]
#[command(author, version, about = "Content model compiler and XML content validator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a content spec and describe the automaton
    Compile {
        /// Content spec, e.g. "(a, (b | c)*, d?)"
        #[arg(value_name = "SPEC")]
        spec: String,

        /// Print the compiled automaton as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate a child sequence against a content spec
    Check {
        /// Content spec, e.g. "(a, b+)"
        #[arg(value_name = "SPEC")]
        spec: String,

        /// Child element names; `#text` stands for character data
        #[arg(value_name = "CHILD")]
        children: Vec<String>,
    },

    /// Parse a document and validate it against its internal DTD subset
    Validate {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Resolve namespace prefixes
        #[arg(short, long)]
        namespaces: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile { spec, json } => cmd_compile(&spec, json),
        Commands::Check { spec, children } => cmd_check(&spec, &children),
        Commands::Validate { file, namespaces } => cmd_validate(file, namespaces),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn parse_model(spec: &str, symbols: &mut SymbolTable) -> Result<ContentModel, Box<dyn std::error::Error>> {
    Ok(parse_content_spec(spec, symbols, &ParseContext::new())?)
}

#[cfg(feature = "cli")]
fn cmd_compile(spec: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut symbols = SymbolTable::new();
    let model = parse_model(spec, &mut symbols)?;
    let dfa = model.compile(&Limits::default())?;

    if json {
        println!("{}", dfa.to_json()?);
        return Ok(());
    }

    println!("Content model: {}", model.spec.describe(&symbols));
    println!("  Mixed: {}", dfa.is_mixed());
    println!("  Empty content valid: {}", dfa.empty_content_is_valid());
    println!("  States: {}", dfa.state_count());
    println!("  Columns: {}", dfa.column_count());
    for (column, matcher) in dfa.element_map().iter().enumerate() {
        println!("    [{}] {}", column, matcher.describe(&symbols));
    }

    println!("  Transitions:");
    for state in 0..dfa.state_count() as u32 {
        let marker = if dfa.is_final_state(state) { "*" } else { " " };
        let targets: Vec<String> = (0..dfa.column_count())
            .filter_map(|column| {
                dfa.transition(state, column)
                    .map(|next| format!("{} -> {}", column, next))
            })
            .collect();
        println!("   {}{}: {}", marker, state, targets.join(", "));
    }

    if let Err((first, second)) = dfa.check_ambiguity() {
        println!("  Ambiguous: columns {} and {} overlap", first, second);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_check(spec: &str, children: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut symbols = SymbolTable::new();
    let model = parse_model(spec, &mut symbols)?;
    let dfa = model.compile(&Limits::default())?;

    let children: Vec<ChildSymbol> = children
        .iter()
        .map(|child| match child.as_str() {
            "#text" => ChildSymbol::Text,
            name => ChildSymbol::element(symbols.intern(name)),
        })
        .collect();

    match dfa.validate(&children) {
        ValidationResult::Valid => {
            println!("valid");
            Ok(())
        }
        ValidationResult::InvalidAt(index) => {
            println!("invalid at {}", index);
            std::process::exit(1);
        }
        ValidationResult::IncompleteAt(index) => {
            println!("incomplete at {}", index);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_validate(file: PathBuf, namespaces: bool) -> Result<(), Box<dyn std::error::Error>> {
    let options = DocumentOptions::new()
        .with_validate(false)
        .with_namespaces(namespaces);
    let doc = Document::from_file(&file, &options)?;

    for diagnostic in doc.diagnostics() {
        eprintln!("{}", diagnostic);
    }

    let errors = doc.validate();
    if errors.is_empty() {
        println!("✓ Document is valid");
        Ok(())
    } else {
        println!("✗ Document is invalid");
        println!();
        println!("Errors:");
        for error in &errors {
            println!("  - {}", error);
        }
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
