//! `encryptolock update`: change a secret's name, value or category.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_service, request_context, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::{Category, SecretUpdate};

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    id: &str,
    name: Option<&str>,
    value: Option<&str>,
    category: Option<Category>,
) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    if value.is_some() {
        output::warning("Value provided on command line, it may appear in shell history.");
    }

    let changes = SecretUpdate {
        name: name.map(str::to_string),
        value: value.map(|v| Zeroizing::new(v.to_string())),
        category,
    };
    let meta = service.update(&ctx, id, changes)?;

    output::success(&format!("Secret '{}' updated", meta.name));
    Ok(())
}
