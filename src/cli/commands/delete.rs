//! `encryptolock delete`: permanently remove a secret.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_service, request_context, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, settings: &Settings, id: &str, force: bool) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete secret {id}? This cannot be undone."))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    service.delete(&ctx, id)?;
    output::success(&format!("Deleted secret {id}"));

    Ok(())
}
