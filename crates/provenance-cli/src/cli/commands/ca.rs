//! `provenance ca` - Local certificate authority.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use provenance::ca::{summarize, CertificateSummary, LocalCa};
use serde::Serialize;

use super::Context;
use crate::cli::args::{CaArgs, CaCommands};
use crate::output::{field, heading, print_json};

#[derive(Serialize)]
struct CaReport<'a> {
    key_path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_path: Option<&'a Path>,
    #[serde(flatten)]
    summary: CertificateSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_pem: Option<String>,
}

pub fn execute(ctx: &Context, args: CaArgs) -> Result<()> {
    match args.command {
        CaCommands::Init { force, cert_out } => init(ctx, force, cert_out),
        CaCommands::Show { pem } => show(ctx, pem),
    }
}

fn init(ctx: &Context, force: bool, cert_out: Option<PathBuf>) -> Result<()> {
    let key_path = ctx.config.ca_key_path()?;
    if key_path.exists() && !force {
        bail!(
            "CA key already exists at {}\n\
             Certificates already issued were signed with it; pass --force to replace it.",
            key_path.display()
        );
    }
    let cert_path = cert_out.unwrap_or_else(|| key_path.with_file_name("ca-cert.pem"));

    for path in [&key_path, &cert_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let ca = LocalCa::generate(ctx.config.ca.subject.clone())?;
    ca.save_to_files(&key_path, &cert_path)?;
    tracing::info!(path = %key_path.display(), "CA key written");

    let report = CaReport {
        key_path: &key_path,
        certificate_path: Some(&cert_path),
        summary: summarize(ca.certificate_der())?,
        certificate_pem: None,
    };

    if ctx.json() {
        return print_json(&report);
    }
    println!("{} Certificate authority created", "✓".green().bold());
    println!();
    print_report(&report);
    Ok(())
}

fn show(ctx: &Context, pem: bool) -> Result<()> {
    let key_path = ctx.config.ca_key_path()?;
    if !key_path.exists() {
        bail!(
            "no CA key at {}\n\nCreate one with: provenance ca init",
            key_path.display()
        );
    }
    let key_pem = std::fs::read_to_string(&key_path)
        .with_context(|| format!("failed to read {}", key_path.display()))?;
    let ca = LocalCa::from_key_pem(&key_pem, ctx.config.ca.subject.clone())?;

    let report = CaReport {
        key_path: &key_path,
        certificate_path: None,
        summary: summarize(ca.certificate_der())?,
        certificate_pem: pem.then(|| ca.certificate_pem()),
    };

    if ctx.json() {
        return print_json(&report);
    }
    heading("Certificate Authority");
    print_report(&report);
    Ok(())
}

fn print_report(report: &CaReport<'_>) {
    field("Subject", &report.summary.subject);
    field("Serial", &report.summary.serial);
    field("Valid from", report.summary.not_before);
    field("Valid until", report.summary.not_after);
    field("Key", report.key_path.display());
    if let Some(path) = report.certificate_path {
        field("Certificate", path.display());
    }
    if let Some(pem) = &report.certificate_pem {
        println!();
        print!("{pem}");
    }
}
