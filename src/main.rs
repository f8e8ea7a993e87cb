use clap::Parser;
use encryptolock::cli::commands;
use encryptolock::cli::{load_settings, output, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Load configuration early so a bad config file fails fast.
    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    encryptolock::logging::init(settings.log_format);

    let result = match cli.command {
        Commands::Challenge { ref address } => {
            commands::auth::execute_challenge(&cli, &settings, address)
        }
        Commands::Login {
            ref message,
            ref signature,
            ref address,
        } => commands::auth::execute_login(&cli, &settings, message, signature, address),
        Commands::Logout => commands::auth::execute_logout(&cli, &settings),
        Commands::Create {
            ref name,
            ref value,
            category,
        } => commands::create::execute(&cli, &settings, name, value.as_deref(), category),
        Commands::Get { ref id } => commands::get::execute(&cli, &settings, id),
        Commands::Reveal { ref id } => commands::get::execute_reveal(&cli, &settings, id),
        Commands::List {
            page,
            limit,
            category,
            ref search,
        } => commands::list::execute(&cli, &settings, page, limit, category, search.as_deref()),
        Commands::Search {
            ref query,
            page,
            limit,
            category,
        } => commands::list::execute_search(&cli, &settings, query, page, limit, category),
        Commands::Update {
            ref id,
            ref name,
            ref value,
            category,
        } => commands::update::execute(
            &cli,
            &settings,
            id,
            name.as_deref(),
            value.as_deref(),
            category,
        ),
        Commands::Delete { ref id, force } => commands::delete::execute(&cli, &settings, id, force),
        Commands::Audit {
            last,
            offset,
            ref since,
        } => commands::audit_cmd::execute(&cli, &settings, last, offset, since.as_deref()),
        Commands::PurgeAudit { retention_days } => {
            commands::audit_cmd::execute_purge(&cli, &settings, retention_days)
        }
    };

    if let Err(e) = result {
        let report = e.report(settings.expose_error_details);
        output::error(&report.message);
        if let Some(detail) = report.detail {
            output::note(&detail);
        }
        std::process::exit(1);
    }
}
