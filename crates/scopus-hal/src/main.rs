//! Scopus to HAL depositor - Entry Point
//!
//! Reads one export file, builds a TEI notice per record and deposits it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scopus_hal::{
    AliasTable, Config, Credentials, HalClient, LanguageTable, Pipeline, PipelineSettings,
    ReportSink,
    models::RecordState,
    source::{self, InputFormat},
};

#[derive(Parser, Debug)]
#[command(name = "scopus-hal")]
#[command(about = "Deposit Scopus records into HAL as TEI notices")]
#[command(version)]
struct Cli {
    /// Export file to process
    input: PathBuf,

    /// Layout of the input file
    #[arg(long, value_enum, default_value = "scopus-csv")]
    format: InputFormat,

    /// Curated author table (CSV with key, forename, affil_id, idHAL, mail)
    #[arg(long)]
    alias_table: Option<PathBuf>,

    /// JSON object mapping extra language names to ISO codes
    #[arg(long)]
    languages: Option<PathBuf>,

    /// Collection stamp added to every notice (repeatable)
    #[arg(long = "stamp")]
    stamps: Vec<String>,

    /// Directory receiving TEI/<eid>.xml and the run log
    #[arg(long, default_value = "out")]
    output_dir: PathBuf,

    /// Build notices without depositing them
    #[arg(long)]
    dry_run: bool,

    /// Skip the HAL duplicate check
    #[arg(long)]
    skip_duplicate_check: bool,

    /// Leave unmatched affiliations unlinked instead of declaring local structures
    #[arg(long)]
    no_local_structures: bool,

    /// Retries for transient HAL read failures (deposits are never retried)
    #[arg(long, default_value_t = 0, env = "HAL_MAX_RETRIES")]
    max_retries: u32,

    /// HAL account name
    #[arg(long, env = "HAL_USERNAME")]
    username: Option<String>,

    /// HAL account password
    #[arg(long, env = "HAL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %cli.input.display(),
        dry_run = cli.dry_run,
        "Starting Scopus to HAL depositor"
    );

    let credentials = match (cli.username, cli.password) {
        (Some(user), Some(password)) => Some(Credentials::new(user, password)?),
        _ if cli.dry_run => None,
        _ => anyhow::bail!("HAL credentials are required unless --dry-run is set"),
    };

    let settings = PipelineSettings {
        stamps: cli.stamps,
        output_dir: Some(cli.output_dir.clone()),
        upload: !cli.dry_run,
        check_duplicates: !cli.skip_duplicate_check,
        create_local_structures: !cli.no_local_structures,
        ..PipelineSettings::default()
    };
    settings.validate()?;

    let aliases = match &cli.alias_table {
        Some(path) => AliasTable::from_path(path)?,
        None => AliasTable::new(),
    };
    let languages = match &cli.languages {
        Some(path) => LanguageTable::default().with_overrides(path)?,
        None => LanguageTable::default(),
    };
    tracing::info!(aliases = aliases.len(), stamps = ?settings.stamps, "Run configured");

    let records = source::open(&cli.input, cli.format)?;
    let report = ReportSink::create(&cli.output_dir.join("log.csv"))?;
    let mut config = Config::new(credentials);
    config.max_retries = cli.max_retries;
    let client = Arc::new(HalClient::new(config)?);

    let mut pipeline = Pipeline::new(client, settings, aliases, languages, report);
    let summary = pipeline.run(records).await?;

    tracing::info!(
        total = summary.total(),
        deposited = summary.count(RecordState::UploadSuccess),
        built = summary.count(RecordState::Built),
        duplicates = summary.count(RecordState::Duplicate),
        failed = summary.count(RecordState::Failed) + summary.count(RecordState::UploadFailed),
        "Done"
    );

    Ok(())
}
