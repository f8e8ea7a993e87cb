//! `encryptolock get | reveal`: show one secret.

use crate::cli::output;
use crate::cli::{open_service, request_context, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `get` command: metadata only.
pub fn execute(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    let meta = service.get(&ctx, id)?;
    output::print_secret_details(&meta);
    Ok(())
}

/// Execute the `reveal` command.
///
/// Decrypts and prints the value alone to stdout.
pub fn execute_reveal(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    let revealed = service.reveal(&ctx, id)?;
    println!("{}", revealed.value.as_str());
    Ok(())
}
