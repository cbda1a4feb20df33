use anyhow::Context;

mod cli;
use cli::{CliCommand, USAGE, parse_cli_command, run_command};

use local_calendar::{
    CalendarRegistrar, RegistrarOptions,
    account::{AccountProvisioner, ThreadDelay},
    storage::{SqliteAccountRegistry, SqliteCalendarProvider, config::Config},
};

fn main() -> anyhow::Result<()> {
    let command = match parse_cli_command() {
        Ok(command) => command,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            std::process::exit(2);
        }
    };
    if command == CliCommand::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    setup_logging();

    let config = Config::load_or_create().context("Failed to load configuration")?;
    let registrar = build_registrar(&config)?;

    if let Err(e) = run_command(&registrar, command) {
        tracing::error!("Command failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn build_registrar(
    config: &Config,
) -> anyhow::Result<CalendarRegistrar<SqliteCalendarProvider, SqliteAccountRegistry, ThreadDelay>> {
    let database = &config.provider.database;
    let provider = SqliteCalendarProvider::open(database, config.provider.authority.clone())
        .with_context(|| format!("Failed to open calendar store {}", database.display()))?;
    let registry = SqliteAccountRegistry::open(database)
        .with_context(|| format!("Failed to open account registry {}", database.display()))?;

    let provisioner = AccountProvisioner::new(
        registry,
        ThreadDelay,
        config.identity(),
        config.provider.authority.clone(),
        config.capabilities(),
    )
    .with_settle_delay(config.settle_delay());

    let options = RegistrarOptions {
        authority: config.provider.authority.clone(),
        verify_updates: config.registrar.verify_updates,
        rollback_on_verification_failure: config.registrar.rollback_on_verification_failure,
    };

    Ok(CalendarRegistrar::new(provider, provisioner, options))
}

fn setup_logging() {
    let log_dir = Config::config_dir();

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "local-calendar.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("local-calendar started");
}
