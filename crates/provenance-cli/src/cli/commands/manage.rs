//! `provenance activate | deactivate | revoke` - Certificate lifecycle.

use anyhow::Result;
use colored::Colorize;
use provenance::IdentityId;

use super::Context;
use crate::output::print_json;

pub async fn activate(ctx: &Context, identity: IdentityId, active: bool) -> Result<()> {
    ctx.open()?.enrollment.set_active(identity, active).await?;

    if ctx.json() {
        return print_json(&serde_json::json!({ "identity": identity, "active": active }));
    }
    let state = if active { "activated" } else { "deactivated" };
    println!("{} Certificate for {} {}", "✓".green().bold(), identity, state);
    Ok(())
}

pub async fn revoke(ctx: &Context, identity: IdentityId) -> Result<()> {
    ctx.open()?.enrollment.revoke(identity).await?;

    if ctx.json() {
        return print_json(&serde_json::json!({ "identity": identity, "revoked": true }));
    }
    println!(
        "{} Certificate for {} revoked; the identity may enroll again",
        "✓".green().bold(),
        identity
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::test_support::context;
    use crate::output::OutputFormat;
    use provenance::EnrollError;

    #[tokio::test]
    async fn test_unknown_identity() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), OutputFormat::Json);
        let identity = IdentityId::new();

        let err = activate(&ctx, identity, true).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<EnrollError>(),
            Some(&EnrollError::NotFound(identity))
        );
        assert!(revoke(&ctx, identity).await.is_err());
    }
}
