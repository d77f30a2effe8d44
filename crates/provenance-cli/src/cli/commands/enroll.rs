//! `provenance enroll` - Proof-of-possession enrollment.

use anyhow::{bail, Result};
use colored::Colorize;
use provenance::enroll::api::{EnrollCertificateRequest, EnrollCertificateResponse};

use super::{read_public_key, Context};
use crate::cli::args::EnrollArgs;
use crate::output::{field, print_json};

pub async fn execute(ctx: &Context, args: EnrollArgs) -> Result<()> {
    if !ctx.config.ca_key_path()?.exists() {
        eprintln!(
            "{} no CA key configured; the certificate will be issued by a throwaway CA (run `provenance ca init`)",
            "warning:".yellow().bold()
        );
    }

    let body = serde_json::to_vec(&EnrollCertificateRequest {
        public_key: read_public_key(&args.public_key)?,
        challenge_signature: args.signature,
    })?;

    let app = ctx.open()?;
    let response = app.api.enroll(args.identity, &body).await;

    if ctx.json() {
        print_json(&response.body)?;
    }
    if !response.is_success() {
        bail!(
            "enrollment rejected ({}): {}",
            response.status,
            response.body["error"].as_str().unwrap_or("unknown error")
        );
    }
    if ctx.json() {
        return Ok(());
    }

    let enrolled: EnrollCertificateResponse = serde_json::from_value(response.body)?;
    println!("{} Certificate issued to {}", "✓".green().bold(), args.identity);
    println!();
    field("Fingerprint", &enrolled.fingerprint);
    field("Active", "no (run `provenance activate` to trust it)");
    println!();
    print!("{}", enrolled.certificate_pem);
    Ok(())
}
