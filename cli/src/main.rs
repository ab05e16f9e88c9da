// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AEGIS Guard CLI
//!
//! The `aegis-guard` binary inspects the security manifest that an
//! application loads into its security handler.
//!
//! ## Commands
//!
//! - `aegis-guard validate [FILE]` - Load and validate a manifest
//! - `aegis-guard show [--paths]` - Print operations, policy chains and handler bindings
//! - `aegis-guard explain <NAMESPACE> <ACTION>` - Show how a request would be checked
//! - `aegis-guard generate [-o FILE]` - Write a sample manifest

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use aegis_guard::commands::manifest;

/// AEGIS Guard - Policy-based authorization for controller actions
#[derive(Parser)]
#[command(name = "aegis-guard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to security manifest (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AEGIS_GUARD_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AEGIS_GUARD_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a security manifest
    Validate {
        /// Path to manifest (default: --config or discovery)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Show the configured operations and handler bindings
    Show {
        /// Show manifest paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Explain how a request for an operation would be checked
    Explain {
        /// Operation namespace, e.g. AccountController
        namespace: String,

        /// Operation action, e.g. Edit
        action: String,
    },

    /// Generate a sample security manifest
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./aegis-guard.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Validate { file }) => manifest::validate(file.or(cli.config)),
        Some(Commands::Show { paths }) => manifest::show(cli.config, paths),
        Some(Commands::Explain { namespace, action }) => manifest::explain(cli.config, &namespace, &action),
        Some(Commands::Generate { output }) => manifest::generate(output),
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
