//! `encryptolock challenge | login | logout`: session management.
//!
//! Usage:
//!   encryptolock challenge 0xAbC...                  # print a message to sign
//!   encryptolock login --message M --signature S --address 0xAbC...
//!   encryptolock logout

use crate::cli::output;
use crate::cli::{open_service, request_context, user_agent, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `challenge` command.
///
/// The message goes to stdout on its own so it can be piped to a signer.
pub fn execute_challenge(cli: &Cli, settings: &Settings, address: &str) -> Result<()> {
    let service = open_service(cli, settings)?;
    let challenge = service.issue_challenge(address)?;

    println!("{}", challenge.message);
    output::note(&format!(
        "Sign this message exactly; it can be used once, until {}.",
        challenge.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    Ok(())
}

/// Execute the `login` command.
///
/// The session token is printed alone on the last line of stdout.
pub fn execute_login(
    cli: &Cli,
    settings: &Settings,
    message: &str,
    signature: &str,
    address: &str,
) -> Result<()> {
    let service = open_service(cli, settings)?;
    let authenticated = service.login(message, signature, address, None, Some(&user_agent()))?;

    output::success(&format!(
        "Logged in as {} (session valid until {})",
        authenticated.owner.address,
        authenticated
            .session
            .expires_at
            .format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output::note("Export it for later commands: export ENCRYPTOLOCK_TOKEN=<token>");
    println!("{}", authenticated.session.token);
    Ok(())
}

/// Execute the `logout` command.
pub fn execute_logout(cli: &Cli, settings: &Settings) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    service.logout(&ctx);
    output::success("Logged out.");
    output::tip("The token stays valid until it expires; unset ENCRYPTOLOCK_TOKEN to drop it.");
    Ok(())
}
