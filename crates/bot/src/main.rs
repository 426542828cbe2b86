mod exit_codes;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use nasiya_config::{BotConfig, ConfigError};
use nasiya_engine::access::AccessList;
use nasiya_engine::locator::aggregate_totals;
use nasiya_engine::money::format_money;
use nasiya_engine::record::Snapshot;
use nasiya_engine::{Desk, TabularStore};
use nasiya_gateway::{
    load_service_account, ApiClient, GatewayError, RetryPolicy, ServiceAccountKey,
    ServiceAccountTokens, SheetsClient, TelegramClient,
};

use exit_codes::*;
use runner::Runner;

#[derive(Parser)]
#[command(name = "nasiya")]
#[command(about = "Installment ledger bot backed by a Google Sheet")]
#[command(version)]
struct Cli {
    /// Config file (default: $NASIYA_CONFIG, then the user config dir)
    #[arg(long, short = 'c', global = true, env = "NASIYA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot and poll for messages until stopped
    Run,
    /// Validate configuration and credentials, then exit
    Check,
    /// Print ledger totals once and exit
    Totals,
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Missing(name) => {
                Some(format!("set {} in the environment, .env or the config file", name))
            }
            ConfigError::Read { .. } => Some("pass --config or set NASIYA_CONFIG".to_string()),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    pub fn credentials(err: GatewayError) -> Self {
        Self {
            code: EXIT_CREDENTIALS,
            message: err.to_string(),
            hint: Some("set credentialsPath to a service-account JSON key".to_string()),
        }
    }

    pub fn sheets(err: impl std::fmt::Display) -> Self {
        Self {
            code: EXIT_SHEETS,
            message: format!("cannot read spreadsheet: {}", err),
            hint: Some("share the sheet with the service account's client_email".to_string()),
        }
    }

    pub fn transport(err: GatewayError) -> Self {
        let hint = err.is_auth().then(|| "check telegramToken".to_string());
        Self { code: EXIT_TRANSPORT, message: format!("chat transport: {}", err), hint }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match cli.command {
        Commands::Run => cmd_run(cli.config),
        Commands::Check => cmd_check(cli.config),
        Commands::Totals => cmd_totals(cli.config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<BotConfig, CliError> {
    let config = BotConfig::load(path.as_deref()).map_err(CliError::config)?;
    config.validate().map_err(CliError::config)?;
    Ok(config)
}

fn load_key(config: &BotConfig) -> Result<ServiceAccountKey, CliError> {
    load_service_account(&config.credentials_path).map_err(CliError::credentials)
}

fn retry_policy(config: &BotConfig) -> RetryPolicy {
    RetryPolicy::with_retries(config.max_retries)
}

fn connect_sheets(config: &BotConfig, key: ServiceAccountKey) -> Result<SheetsClient, CliError> {
    let tokens = ServiceAccountTokens::with_policy(key, config.http_timeout(), retry_policy(config))
        .map_err(CliError::credentials)?;
    log::info!("using service account {}", tokens.client_email());

    let api = ApiClient::new(
        "Google Sheets",
        config.http_timeout(),
        retry_policy(config),
        SheetsClient::error_extractor(),
    )
    .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;

    SheetsClient::with_base_url(
        api,
        Arc::new(tokens),
        &config.spreadsheet_id,
        &config.sheet_name,
        &config.read_range,
        &config.sheets_api_base,
    )
    .map_err(|e| CliError::config(ConfigError::Invalid { key: "sheets_api_base", reason: e.to_string() }))
}

fn connect_telegram(config: &BotConfig) -> Result<TelegramClient, CliError> {
    let api = ApiClient::new(
        "Telegram",
        config.http_timeout(),
        retry_policy(config),
        TelegramClient::error_extractor(),
    )
    .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    Ok(TelegramClient::with_base_url(api, &config.telegram_token, &config.telegram_api_base))
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(path)?;
    log::debug!("{:?}", config);

    let access = AccessList::new(config.allowed_users.iter());
    if access.is_empty() {
        log::warn!("allowedUsers is empty; every sender will be refused");
    }

    let key = load_key(&config)?;
    let sheets = connect_sheets(&config, key)?;
    let telegram = connect_telegram(&config)?;

    let me = telegram.get_me().map_err(CliError::transport)?;
    log::info!("connected as @{}", me.username.as_deref().unwrap_or(&me.first_name));

    let desk = Desk::new(sheets, access, config.desk_settings());
    let snapshot = desk.warm_up().map_err(|e| CliError::sheets(e.store_error()))?;
    log::info!(
        "loaded {} records from {}",
        snapshot.records().count(),
        config.qualified_range(),
    );

    Runner::new(desk, telegram, config.poll_timeout())
        .run()
        .map_err(CliError::transport)
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(path)?;
    let key = load_key(&config)?;

    println!("spreadsheet:     {}", config.spreadsheet_id);
    println!("range:           {}", config.qualified_range());
    println!("telegram token:  <redacted> ({})", config.token_source.as_str());
    println!("allowed users:   {}", config.allowed_users.len());
    println!("service account: {}", key.client_email);
    println!(
        "years:           {}",
        config.layout.years().map(|y| y.to_string()).collect::<Vec<_>>().join(", "),
    );
    println!("ok");
    Ok(())
}

// ============================================================================
// totals
// ============================================================================

fn cmd_totals(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(path)?;
    let key = load_key(&config)?;
    let sheets = connect_sheets(&config, key)?;

    let rows = sheets.fetch_rows().map_err(CliError::sheets)?;
    let snapshot = Snapshot::new(rows);
    let totals = aggregate_totals(&snapshot);

    println!("records: {}", snapshot.records().count());
    println!("Summa:       {}", format_money(totals.summa));
    println!("Berdi:       {}", format_money(totals.berdi));
    println!("Qoldiq:      {}", format_money(totals.qoldiq));
    println!("Nominal Sum: {}", format_money(totals.nominal));
    Ok(())
}
