//! `provenance challenge` - The digest a device signs to enroll.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colored::Colorize;
use provenance::enroll::{derive_challenge, parse_public_key};
use serde::Serialize;

use super::{read_public_key, Context};
use crate::cli::args::ChallengeArgs;
use crate::output::{field, print_json};

#[derive(Debug, Serialize)]
struct Challenge {
    identity: String,
    hex: String,
    base64: String,
}

pub fn execute(ctx: &Context, args: &ChallengeArgs) -> Result<()> {
    let public_key_pem = read_public_key(&args.public_key)?;
    // Reject keys enrollment would refuse before anyone signs anything
    parse_public_key(&public_key_pem)?;

    let challenge = challenge_for(args.identity, &public_key_pem);
    if ctx.json() {
        return print_json(&challenge);
    }

    field("Identity", &challenge.identity);
    field("Challenge (hex)", &challenge.hex);
    field("Challenge (base64)", &challenge.base64);
    println!();
    println!(
        "{}",
        "Sign this digest as a prehash with ECDSA P-256 and pass the raw 64-byte r || s, base64 encoded, to `provenance enroll`."
            .dimmed()
    );
    Ok(())
}

fn challenge_for(identity: provenance::IdentityId, public_key_pem: &str) -> Challenge {
    let digest = derive_challenge(identity, public_key_pem);
    Challenge {
        identity: identity.to_string(),
        hex: hex::encode(digest),
        base64: STANDARD.encode(digest),
    }
}
