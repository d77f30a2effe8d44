//! `provenance verify` - Attribute a manifest to its author.

use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use provenance::manifest::ProvenanceReport;
use provenance::ProvenanceLabel;

use super::Context;
use crate::cli::args::VerifyArgs;
use crate::output::{field, print_json};

pub async fn execute(ctx: &Context, args: VerifyArgs) -> Result<()> {
    let app = ctx.open()?;

    let report = if is_url(&args.source) {
        app.provenance.label_uri(&args.source).await?
    } else {
        let raw = std::fs::read(&args.source)
            .with_context(|| format!("failed to read manifest {}", args.source))?;
        app.provenance.label_bytes(&raw).await?
    };

    if ctx.json() {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if args.strict && !report.label.is_verified() {
        bail!("manifest is not attributed to an enrolled identity");
    }
    Ok(())
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn print_report(report: &ProvenanceReport) {
    match &report.label {
        ProvenanceLabel::Verified {
            identity,
            fingerprint,
            active,
        } => {
            println!("{} Verified", "✓".green().bold());
            println!();
            field("Identity", identity);
            field("Fingerprint", fingerprint);
            field(
                "Certificate",
                if *active {
                    "active".green()
                } else {
                    "inactive".yellow()
                },
            );
        }
        ProvenanceLabel::Unverified { reason } => {
            println!("{} Unverified", "✗".yellow().bold());
            println!();
            field("Reason", reason);
        }
    }
    if let Some(hash) = &report.manifest_hash {
        field("Manifest SHA-256", hash);
    }
    if let Some(created) = report.created_at {
        field("Created", created);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::test_support::context;
    use crate::output::OutputFormat;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://cdn.example/m.c2pa"));
        assert!(is_url("http://localhost:9000/bucket/m"));
        assert!(!is_url("./manifests/m.c2pa"));
        assert!(!is_url("s3://bucket/m"));
    }

    #[tokio::test]
    async fn test_garbage_file_is_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.c2pa");
        std::fs::write(&path, b"not cbor").unwrap();
        let ctx = context(dir.path(), OutputFormat::Json);

        let args = || VerifyArgs {
            source: path.display().to_string(),
            strict: false,
        };
        execute(&ctx, args()).await.unwrap();

        let strict = VerifyArgs {
            strict: true,
            ..args()
        };
        assert!(execute(&ctx, strict).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), OutputFormat::Pretty);
        let args = VerifyArgs {
            source: dir.path().join("absent.c2pa").display().to_string(),
            strict: false,
        };
        assert!(execute(&ctx, args).await.is_err());
    }
}
