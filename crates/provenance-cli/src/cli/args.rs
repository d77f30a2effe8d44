//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use provenance::IdentityId;

use crate::output::OutputFormat;

/// Enroll device keys and attribute C2PA manifests to their authors
///
/// Devices prove possession of a P-256 key by signing a challenge derived
/// from their identity; the local CA then issues them a certificate. A
/// manifest signed with that certificate is attributed back to the identity.
#[derive(Parser, Debug)]
#[command(name = "provenance")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(short, long, env = "PROVENANCE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the local certificate authority
    Ca(CaArgs),

    /// Print the challenge a device must sign to enroll
    Challenge(ChallengeArgs),

    /// Enroll a device public key for an identity
    Enroll(EnrollArgs),

    /// Show the certificate held by an identity
    Status(IdentityArgs),

    /// Trust the identity's certificate as its current anchor
    Activate(IdentityArgs),

    /// Stop trusting the identity's certificate without deleting it
    Deactivate(IdentityArgs),

    /// Delete the identity's certificate so it can enroll again
    Revoke(IdentityArgs),

    /// Attribute a C2PA manifest file or URL to its author
    Verify(VerifyArgs),
}

// ============================================================================
// CA command
// ============================================================================

#[derive(Args, Debug)]
pub struct CaArgs {
    #[command(subcommand)]
    pub command: CaCommands,
}

#[derive(Subcommand, Debug)]
pub enum CaCommands {
    /// Generate a CA key and certificate at the configured key path
    Init {
        /// Replace an existing key
        #[arg(long)]
        force: bool,

        /// Where to write the CA certificate (default: next to the key)
        #[arg(long)]
        cert_out: Option<PathBuf>,
    },

    /// Show the CA certificate
    Show {
        /// Also print the PEM
        #[arg(long)]
        pem: bool,
    },
}

// ============================================================================
// Enrollment commands
// ============================================================================

#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// Identity UUID
    pub identity: IdentityId,
}

#[derive(Args, Debug)]
pub struct ChallengeArgs {
    /// Identity UUID
    pub identity: IdentityId,

    /// PEM file holding the device's SubjectPublicKeyInfo
    pub public_key: PathBuf,
}

#[derive(Args, Debug)]
pub struct EnrollArgs {
    /// Identity UUID
    pub identity: IdentityId,

    /// PEM file holding the device's SubjectPublicKeyInfo
    pub public_key: PathBuf,

    /// Base64 of the raw 64-byte r || s signature over the challenge
    pub signature: String,
}

// ============================================================================
// Verify command
// ============================================================================

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Manifest file path, or an http(s) URL to download it from
    pub source: String,

    /// Exit with an error unless the manifest is attributed
    #[arg(long)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_enroll() {
        let cli = Cli::try_parse_from([
            "provenance",
            "-o",
            "json",
            "enroll",
            "0b7d4f4e-2f53-4b4f-9a43-8e1c9f2a6d10",
            "device.pem",
            "c2ln",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(OutputFormat::Json));
        match cli.command {
            Commands::Enroll(args) => {
                assert_eq!(
                    args.identity.to_string(),
                    "0b7d4f4e-2f53-4b4f-9a43-8e1c9f2a6d10"
                );
                assert_eq!(args.public_key, PathBuf::from("device.pem"));
                assert_eq!(args.signature, "c2ln");
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_identity() {
        assert!(Cli::try_parse_from(["provenance", "status", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "provenance",
            "verify",
            "https://cdn.example/m.c2pa",
            "--strict",
            "--no-color",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Verify(VerifyArgs { strict: true, .. })));
    }
}
