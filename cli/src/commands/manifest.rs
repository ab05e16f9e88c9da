// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Security manifest commands
//!
//! Commands: validate, show, explain, generate
//!
//! These commands only read the manifest. Policy and handler names are
//! resolved by the host application at startup, so they are printed as
//! written rather than checked against a catalog.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use aegis_guard_core::domain::{OperationIdentity, SecurityError};
use aegis_guard_core::infrastructure::manifest::{HandlerBindingConfig, SecurityManifest, CONFIG_PATH_ENV};

const SAMPLE_MANIFEST: &str = include_str!("../../templates/guard-sample.yaml");

pub fn validate(manifest_path: Option<PathBuf>) -> Result<()> {
    println!("Validating security manifest...");

    let manifest = SecurityManifest::load(manifest_path).context("Failed to load security manifest")?;

    manifest
        .validate()
        .context("Security manifest validation failed")?;

    println!(
        "{}",
        format!(
            "✓ Security manifest '{}' is valid ({} operations, {} handler bindings)",
            manifest.metadata.name,
            manifest.spec.operations.len(),
            manifest.spec.violation_handlers.len()
        )
        .green()
    );

    Ok(())
}

pub fn show(manifest_path: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Manifest discovery paths:".bold());
        match &manifest_path {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./aegis-guard.yaml");
        println!("  4. ~/.aegis/guard.yaml");
        println!("  5. /etc/aegis/guard.yaml");
        println!();
    }

    let manifest = SecurityManifest::load(manifest_path).context("Failed to load security manifest")?;
    print!("{}", render_manifest(&manifest));
    Ok(())
}

pub fn explain(manifest_path: Option<PathBuf>, namespace: &str, action: &str) -> Result<()> {
    let manifest = SecurityManifest::load(manifest_path).context("Failed to load security manifest")?;
    let identity = OperationIdentity::new(namespace, action)?;
    print!("{}", render_explanation(&manifest, &identity));
    Ok(())
}

pub fn generate(output: PathBuf) -> Result<()> {
    std::fs::write(&output, SAMPLE_MANIFEST)
        .with_context(|| format!("Failed to write security manifest to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Security manifest generated: {}", output.display()).green()
    );

    Ok(())
}

fn render_manifest(manifest: &SecurityManifest) -> String {
    let spec = &manifest.spec;
    let mut out = String::new();

    out.push_str(&format!("{}\n", "Security manifest:".bold()));
    out.push_str(&format!("  Name: {}\n", manifest.metadata.name));
    if let Some(version) = &manifest.metadata.version {
        out.push_str(&format!("  Version: {}\n", version));
    }
    out.push_str(&format!("  Identity matching: {:?}\n", spec.identity_matching));
    out.push_str(&format!(
        "  Missing configuration: {}\n",
        if spec.ignore_missing_configuration { "ignored" } else { "fatal" }
    ));
    out.push('\n');

    out.push_str(&format!("{}\n", "Operations:".bold()));
    if spec.operations.is_empty() {
        out.push_str(&format!("  {}\n", "(none)".dimmed()));
    }
    for operation in &spec.operations {
        let chain = if operation.policies.is_empty() {
            "(allow everyone)".to_string()
        } else {
            operation.policies.join(" → ")
        };
        out.push_str(&format!(
            "  {} {}: {}\n",
            operation.namespace.bold(),
            operation.action,
            chain
        ));
    }
    out.push('\n');

    out.push_str(&format!("{}\n", "Violation handlers:".bold()));
    if spec.violation_handlers.is_empty() {
        out.push_str(&format!("  {}\n", "(none, every violation is unhandled)".dimmed()));
    }
    for (position, binding) in spec.violation_handlers.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} → {}\n",
            position + 1,
            describe_binding(binding),
            binding.handler
        ));
    }

    out
}

fn render_explanation(manifest: &SecurityManifest, identity: &OperationIdentity) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", "Operation:".bold(), identity));

    let Some(operation) = manifest.find_operation(identity) else {
        if manifest.spec.ignore_missing_configuration {
            out.push_str(&format!(
                "  {}\n",
                "Not configured. Missing configuration is ignored, so the request is allowed.".yellow()
            ));
        } else {
            let error = SecurityError::MissingConfiguration(identity.clone());
            out.push_str(&format!("  {} {}\n", "Not configured. Request fails:".red(), error));
        }
        return out;
    };

    if operation.policies.is_empty() {
        out.push_str(&format!(
            "  {}\n",
            "Empty policy chain. Every request is allowed.".green()
        ));
        return out;
    }

    out.push_str("  Policies (every policy runs, the first violation is handled):\n");
    for (position, policy) in operation.policies.iter().enumerate() {
        let handler = handler_for(&manifest.spec.violation_handlers, policy)
            .map(|h| h.to_string())
            .unwrap_or_else(|| "unhandled (request fails)".red().to_string());
        out.push_str(&format!("    {}. {} → {}\n", position + 1, policy.bold(), handler));
    }
    out
}

/// First binding that would answer a violation of `policy`.
fn handler_for<'a>(bindings: &'a [HandlerBindingConfig], policy: &str) -> Option<&'a str> {
    bindings
        .iter()
        .find(|binding| binding.policy.as_deref().map_or(true, |p| p == policy))
        .map(|binding| binding.handler.as_str())
}

fn describe_binding(binding: &HandlerBindingConfig) -> String {
    match &binding.policy {
        Some(policy) => format!("policy {}", policy),
        None => "any violation".to_string(),
    }
}
