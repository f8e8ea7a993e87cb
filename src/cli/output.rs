//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  Status lines go to stderr
//! when a command's stdout is meant to be piped (`reveal`, `login`).

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditAction, AuditEntry};
use crate::vault::{Page, SecretMetadata};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Like `tip`, but on stderr.
pub fn note(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print one page of secret metadata (Id, Name, Category, Created, Updated).
pub fn print_secrets_page(page: &Page<SecretMetadata>) {
    if page.items.is_empty() {
        info("No secrets found.");
        if page.total == 0 {
            tip("Run `encryptolock create <NAME>` to add your first secret.");
        }
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Category", "Created", "Updated"]);

    for s in &page.items {
        table.add_row(vec![
            s.id.clone(),
            s.name.clone(),
            s.category.to_string(),
            s.created_at.format(TIME_FORMAT).to_string(),
            s.updated_at.format(TIME_FORMAT).to_string(),
        ]);
    }

    println!("{table}");
    println!(
        "{}",
        style(format!(
            "Page {} of {} ({} total)",
            page.offset / page.limit.max(1) + 1,
            page.total_pages().max(1),
            page.total
        ))
        .dim()
    );
}

/// Print a single secret's metadata as a two-column table.
pub fn print_secret_details(meta: &SecretMetadata) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Id".to_string(), meta.id.clone()]);
    table.add_row(vec!["Name".to_string(), meta.name.clone()]);
    table.add_row(vec!["Category".to_string(), meta.category.to_string()]);
    table.add_row(vec![
        "Created".to_string(),
        meta.created_at.format(TIME_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Updated".to_string(),
        meta.updated_at.format(TIME_FORMAT).to_string(),
    ]);
    println!("{table}");
}

/// Print audit entries in a formatted table.
pub fn print_audit_table(page: &Page<AuditEntry>) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Action", "Resource", "Outcome", "Details"]);

    for entry in &page.items {
        let outcome = entry
            .metadata
            .get("outcome")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let outcome = match outcome {
            "failure" => style(outcome).red().to_string(),
            other => other.to_string(),
        };

        let details: Vec<String> = entry
            .metadata
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "outcome" | "userAgent"))
            .map(|(k, v)| match v.as_str() {
                Some(s) => format!("{k}={s}"),
                None => format!("{k}={v}"),
            })
            .collect();

        table.add_row(vec![
            entry.created_at.format(TIME_FORMAT).to_string(),
            colorize_action(entry.action),
            entry.resource_id.clone().unwrap_or_else(|| "-".into()),
            outcome,
            if details.is_empty() {
                "-".into()
            } else {
                details.join(" ")
            },
        ]);
    }

    println!(
        "{}",
        style(format!(
            "{} of {} audit entries:",
            page.items.len(),
            page.total
        ))
        .bold()
    );
    println!("{table}");
}

/// Colorize action names for display.
fn colorize_action(action: AuditAction) -> String {
    let name = action.as_str();
    match action {
        AuditAction::CreateSecret | AuditAction::Login => style(name).green().to_string(),
        AuditAction::UpdateSecret => style(name).blue().to_string(),
        AuditAction::DeleteSecret => style(name).red().to_string(),
        AuditAction::ViewSecret | AuditAction::ViewSecrets | AuditAction::SearchSecrets => {
            style(name).cyan().to_string()
        }
        AuditAction::Logout => style(name).yellow().to_string(),
    }
}
