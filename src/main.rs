//! Command-line tool generating an OpenAPI document from annotated Rust sources.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! Write YAML to a file:
//! ```bash
//! openapi-from-annotations ./my-api -o openapi.yaml
//! ```
//!
//! Print JSON with debug logging:
//! ```bash
//! openapi-from-annotations ./my-api -f json -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-annotations starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
