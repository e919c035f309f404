use crate::declarations::SourceFile;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::spec_state::SpecState;
use crate::walker::DeclarationWalker;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Generate an OpenAPI document from `!` annotations in Rust doc comments
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the directory holding the annotated sources
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct Generation {
    pub document: OpenApiDocument,
    pub files_scanned: usize,
    pub files_parsed: usize,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    parse_args_from_parsed(CliArgs::parse())
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Scan, parse, walk and assemble the document for one source tree.
///
/// Files that cannot be read or parsed are skipped with a warning.
///
/// # Errors
///
/// Fails when the tree cannot be scanned or when no `!info` title was found anywhere.
pub fn generate(project_path: &Path) -> Result<Generation> {
    // Step 1: Scan directory for Rust files
    info!("Scanning project directory...");
    let scan_result = FileScanner::new(project_path.to_path_buf())
        .scan()
        .with_context(|| format!("Failed to scan {}", project_path.display()))?;
    info!("Found {} Rust files", scan_result.rust_files.len());

    // Step 2: Parse files into AST, skipping the ones that fail
    info!("Parsing Rust files...");
    let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(|result| match result {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping file: {}", e);
                None
            }
        })
        .collect();
    info!("Successfully parsed {} files", parsed_files.len());

    // Step 3: Walk declarations of every file into one state
    info!("Collecting annotations...");
    let mut state = SpecState::new();
    let mut walker = DeclarationWalker::new(&mut state);
    for parsed in &parsed_files {
        walker.walk_file(&SourceFile::from_parsed(parsed));
    }

    if state.info.title.is_empty() {
        anyhow::bail!(
            "No API annotations found in {}: add a `!info \"Title\" <version>` doc comment line",
            project_path.display()
        );
    }

    info!(
        "Collected {} operations and {} schemas",
        state.operations.len(),
        state.merged_schemas().len()
    );

    // Step 4: Assemble the document
    info!("Building OpenAPI document...");
    let document = OpenApiBuilder::build(&state);

    Ok(Generation {
        document,
        files_scanned: scan_result.rust_files.len(),
        files_parsed: parsed_files.len(),
    })
}

/// Render a document in the requested format.
pub fn render(document: &OpenApiDocument, format: OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Yaml => serialize_yaml(document)?,
        OutputFormat::Json => serialize_json(document)?,
    };
    Ok(content)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let generation = generate(&args.project_path)?;

    info!("Serializing to {:?} format...", args.output_format);
    let content = render(&generation.document, args.output_format)?;

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", generation.files_scanned);
    info!("  - Files parsed: {}", generation.files_parsed);
    info!("  - Paths: {}", generation.document.paths.len());

    Ok(())
}
