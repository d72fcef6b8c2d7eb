use crate::infra::{
    expiration_scanner, parse_date, ConfiguredDispatcher, InMemoryBlobStore,
    InMemoryRequirementStore,
};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Args;
use compliance_tracker::config::{AppConfig, ConfigError};
use compliance_tracker::error::AppError;
use compliance_tracker::requirements::{Requirement, RequirementService, ScanReport};
use compliance_tracker::telemetry;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// JSON file of requirement documents (an array, or `{ "requirements": [...] }`)
    #[arg(long)]
    pub(crate) records: PathBuf,
    /// Evaluate as of this date (YYYY-MM-DD, defaults to now)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Override the notification window in days
    #[arg(long)]
    pub(crate) window: Option<u32>,
    /// Send through EmailJS instead of logging each notice
    #[arg(long)]
    pub(crate) send: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// JSON file of requirement documents
    #[arg(long)]
    pub(crate) records: PathBuf,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    List(Vec<Requirement>),
    Wrapped { requirements: Vec<Requirement> },
}

pub(crate) fn load_records(path: &Path) -> Result<Vec<Requirement>, AppError> {
    let raw = std::fs::read(path)?;
    let records = match serde_json::from_slice::<RecordsFile>(&raw)? {
        RecordsFile::List(records) => records,
        RecordsFile::Wrapped { requirements } => requirements,
    };
    info!(path = %path.display(), count = records.len(), "loaded requirement records");
    Ok(records)
}

fn records_service(
    records: Vec<Requirement>,
    config: &AppConfig,
    dispatcher: ConfiguredDispatcher,
) -> RequirementService<InMemoryRequirementStore, InMemoryBlobStore, ConfiguredDispatcher> {
    RequirementService::new(
        Arc::new(InMemoryRequirementStore::from_records(records)),
        Arc::new(InMemoryBlobStore::new(config.storage.public_base_url.clone())),
        expiration_scanner(&config.notifications, dispatcher),
    )
}

pub(crate) fn run_scan(args: ScanArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    if let Some(window) = args.window {
        config.notifications.window_days = i64::from(window);
    }
    let dispatcher = if args.send {
        let email = config.notifications.email.as_ref().ok_or_else(|| {
            ConfigError::IncompleteEmail {
                missing: vec![
                    "EMAILJS_SERVICE_ID",
                    "EMAILJS_TEMPLATE_ID",
                    "EMAILJS_USER_ID",
                ],
            }
        })?;
        ConfiguredDispatcher::from_config(Some(email))
    } else {
        ConfiguredDispatcher::from_config(None)
    };

    let records = load_records(&args.records)?;
    let report = scan_records(records, &config, dispatcher, args.today)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub(crate) fn scan_records(
    records: Vec<Requirement>,
    config: &AppConfig,
    dispatcher: ConfiguredDispatcher,
    today: Option<NaiveDate>,
) -> Result<ScanReport, AppError> {
    let now = match today {
        Some(day) => day.and_time(NaiveTime::MIN),
        None => Local::now().naive_local(),
    };
    let service = records_service(records, config, dispatcher);
    Ok(service.refresh_and_scan(now)?)
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let records = load_records(&args.records)?;
    match &args.output {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_report(records, &config, file)?;
            info!(path = %path.display(), "requirements report written");
        }
        None => write_report(records, &config, io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) fn write_report<W: Write>(
    records: Vec<Requirement>,
    config: &AppConfig,
    writer: W,
) -> Result<(), AppError> {
    let service = records_service(records, config, ConfiguredDispatcher::from_config(None));
    service.refresh()?;
    service.export_csv(writer)?;
    Ok(())
}
