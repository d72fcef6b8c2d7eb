use crate::commands::{run_report, run_scan, ReportArgs, ScanArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use compliance_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "compliance-tracker",
    about = "Track compliance requirements and notify owners before they expire",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one expiration pass over exported requirement records
    Scan(ScanArgs),
    /// Write the requirements CSV report from exported records
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scan(args) => run_scan(args),
        Command::Report(args) => run_report(args),
    }
}
