use crate::demo::{run_demo, run_report, run_sunday, DemoArgs, ReportArgs, SundayArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sunday_registration::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Sunday Registration",
    about = "Run the Sunday service registration intake and inspect its dashboards",
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
    /// Show which Sunday a registration made now (or at --now) would target
    Sunday(SundayArgs),
    /// Print the monthly, yearly, and per-Sunday dashboards from the CSV tables
    Report(ReportArgs),
    /// Submit a sample household into an in-memory store and print the results
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the directory holding the per-community CSV tables
    #[arg(long)]
    pub(crate) data_dir: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sunday(args) => run_sunday(args),
        Command::Report(args) => run_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
