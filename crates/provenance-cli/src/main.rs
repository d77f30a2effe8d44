//! provenance - device enrollment and manifest attribution from the shell.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    provenance_cli::run().await
}
