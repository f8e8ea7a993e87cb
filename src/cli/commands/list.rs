//! `encryptolock list | search`: display secrets in a table.

use crate::cli::output;
use crate::cli::{open_service, request_context, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::{Category, ListOptions, SearchOptions};

/// Execute the `list` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    page: u32,
    limit: u32,
    category: Option<Category>,
    search: Option<&str>,
) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    let options = ListOptions {
        category,
        search: search.map(str::to_string),
        ..ListOptions::from_page(page, limit)
    };
    let result = service.list(&ctx, &options)?;

    output::print_secrets_page(&result);
    Ok(())
}

/// Execute the `search` command.
pub fn execute_search(
    cli: &Cli,
    settings: &Settings,
    query: &str,
    page: u32,
    limit: u32,
    category: Option<Category>,
) -> Result<()> {
    let service = open_service(cli, settings)?;
    let ctx = request_context(cli, &service)?;

    let paging = ListOptions::from_page(page, limit);
    let options = SearchOptions {
        category,
        limit: paging.limit,
        offset: paging.offset,
        ..SearchOptions::new(query)
    };
    let result = service.search(&ctx, &options)?;

    output::info(&format!("{} secret(s) match '{}'", result.total, query.trim()));
    output::print_secrets_page(&result);
    Ok(())
}
