//! `provenance status` - Certificate held by an identity.

use anyhow::{bail, Result};
use colored::Colorize;
use provenance::enroll::api::CertificateResponse;
use provenance::IdentityId;

use super::Context;
use crate::output::{field, print_json};

pub async fn execute(ctx: &Context, identity: IdentityId) -> Result<()> {
    let app = ctx.open()?;
    let response = app.api.me(identity).await;

    if response.status == 404 {
        if ctx.json() {
            return print_json(&serde_json::json!({ "hasCertificate": false }));
        }
        println!("{} {} holds no certificate", "✗".red().bold(), identity);
        return Ok(());
    }
    if !response.is_success() {
        bail!(
            "certificate lookup failed ({}): {}",
            response.status,
            response.body["error"].as_str().unwrap_or("unknown error")
        );
    }
    if ctx.json() {
        return print_json(&response.body);
    }

    let cert: CertificateResponse = serde_json::from_value(response.body)?;
    let state = if cert.active {
        "active".green()
    } else {
        "inactive".yellow()
    };
    println!("{} {} is enrolled ({})", "✓".green().bold(), identity, state);
    println!();
    field("Fingerprint", &cert.fingerprint);
    field("Enrolled", cert.created_at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::test_support::context;
    use crate::output::OutputFormat;

    #[tokio::test]
    async fn test_unknown_identity_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), OutputFormat::Pretty);
        execute(&ctx, IdentityId::new()).await.unwrap();
    }
}
