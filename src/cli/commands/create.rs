//! `encryptolock create`: encrypt and store a new secret.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_service, request_context, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{Category, NewSecret};

/// Execute the `create` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    name: &str,
    value: Option<&str>,
    category: Option<Category>,
) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    let secret_value = read_value(name, value)?;

    let mut input = NewSecret::new(name, secret_value.as_str());
    input.category = category;
    let meta = service.create(&ctx, input)?;

    output::success(&format!(
        "Secret '{}' stored as {} ({})",
        meta.name, meta.id, meta.category
    ));
    output::tip(&format!("Read it back: encryptolock reveal {}", meta.id));
    Ok(())
}

/// Determine the secret value from one of three sources.
pub(crate) fn read_value(name: &str, value: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line, it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        return Ok(Zeroizing::new(buf.trim_end().to_string()));
    }

    // Source 3: Interactive secure prompt (default).
    let entered = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {name}"))
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(entered))
}
