//! `encryptolock audit | purge-audit`: inspect and prune the audit trail.
//!
//! Usage:
//!   encryptolock audit               # show last 50 entries
//!   encryptolock audit --last 20     # show last 20
//!   encryptolock audit --since 7d    # entries from last 7 days
//!   encryptolock purge-audit         # drop entries past the retention horizon

use chrono::{DateTime, Utc};

use crate::audit::{AuditQuery, MAX_RETENTION_DAYS};
use crate::cli::output;
use crate::cli::{open_service, request_context, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `audit` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    last: u32,
    offset: u32,
    since: Option<&str>,
) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    let start_date = match since {
        Some(s) => Some(parse_duration(s)?),
        None => None,
    };

    let query = AuditQuery {
        limit: last,
        offset,
        start_date,
        end_date: None,
    };
    let page = service.audit_trail(&ctx, &query)?;

    if page.items.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    output::print_audit_table(&page);

    Ok(())
}

/// Execute the `purge-audit` command.
pub fn execute_purge(cli: &Cli, settings: &Settings, retention_days: Option<u32>) -> Result<()> {
    let service = open_service(cli, settings)?;
    let days = retention_days.unwrap_or(settings.audit_retention_days);

    let removed = service.purge_audit(days)?;
    output::success(&format!(
        "Removed {removed} audit entr{} older than {days} day(s)",
        if removed == 1 { "y" } else { "ies" }
    ));
    Ok(())
}

/// Parse a human-friendly duration string like "7d", "24h", "30m".
fn parse_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    let (num_str, unit) = if let Some(s) = input.strip_suffix('d') {
        (s, 'd')
    } else if let Some(s) = input.strip_suffix('h') {
        (s, 'h')
    } else if let Some(s) = input.strip_suffix('m') {
        (s, 'm')
    } else {
        return Err(VaultError::Validation(format!(
            "invalid duration '{input}', use a format like 7d, 24h or 30m"
        )));
    };

    let num: i64 = num_str
        .parse()
        .ok()
        .filter(|n| (0..=i64::from(MAX_RETENTION_DAYS)).contains(n))
        .ok_or_else(|| {
            VaultError::Validation(format!(
                "invalid duration '{input}', the number part is not valid"
            ))
        })?;

    let duration = match unit {
        'd' => chrono::Duration::days(num),
        'h' => chrono::Duration::hours(num),
        _ => chrono::Duration::minutes(num),
    };

    Ok(Utc::now() - duration)
}
