// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! OpenBACH scenario CLI
//!
//! Prints sample scenarios, validates scenario documents and prints the wire
//! JSON schema.
//!
//! Usage:
//!
//! ```text
//! openbach-scenario [--pretty] [--output-dir <dir>] sample <if|while|nested> [--output <path>]
//! openbach-scenario validate <FILE>
//! openbach-scenario schema
//! ```

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use openbach_scenario::{Sample, ScenarioDocument, generate_wire_schema, validate_document};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{CliConfig, check_output_dir};

#[derive(Parser)]
#[command(name = "openbach-scenario")]
#[command(about = "Build, validate and describe OpenBACH scenarios")]
#[command(version)]
struct Cli {
    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Directory receiving sample documents
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a sample scenario and print its document
    Sample {
        /// Sample to build: if, while or nested
        name: Sample,
        /// Write the document to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check a scenario document and report errors and warnings
    Validate {
        /// Path to the scenario JSON file
        file: PathBuf,
    },

    /// Print the JSON schema of scenario documents
    Schema,
}

fn main() -> ExitCode {
    // Initialize minimal logging (default to warn if RUST_LOG not set)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = CliConfig::from_env()?;
    if cli.pretty {
        config = config.with_pretty(true);
    }
    if let Some(dir) = cli.output_dir {
        config = config.with_output_dir(dir);
    }

    match cli.command {
        Command::Sample { name, output } => {
            print_sample(&config, name, output)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { file } => validate_file(&file),
        Command::Schema => {
            println!("{}", config.render(&generate_wire_schema())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_sample(config: &CliConfig, sample: Sample, output: Option<PathBuf>) -> Result<()> {
    let scenario = sample
        .scenario()
        .with_context(|| format!("building sample '{}'", sample))?;
    let text = config.render(&scenario.serialize()?)?;

    match config.destination(output.as_deref(), &sample.to_string()) {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                check_output_dir(dir)?;
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating output directory {:?}", dir))?;
            }
            fs::write(&path, text + "\n").with_context(|| format!("writing {:?}", path))?;
            tracing::info!(sample = %sample, path = ?path, "Wrote sample scenario");
            eprintln!("Wrote {:?}", path);
        }
        None => println!("{}", text),
    }

    Ok(())
}

fn validate_file(path: &Path) -> Result<ExitCode> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading scenario file {:?}", path))?;
    let document = ScenarioDocument::from_json_str(&text).map_err(anyhow::Error::msg)?;

    let result = validate_document(&document);
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("error: {}", error);
    }

    if result.is_ok() {
        println!(
            "{}: valid ({} functions, {} warnings)",
            document.name,
            document.openbach_functions.len(),
            result.warnings.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "{}: {} errors, {} warnings",
            document.name,
            result.errors.len(),
            result.warnings.len()
        );
        Ok(ExitCode::FAILURE)
    }
}
