use crate::demo::{run_demo, run_fee_quote, DemoArgs, FeeQuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use permitflow::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "PermitFlow",
    about = "Track regulatory submissions, documents, and approvals from the command line",
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
    /// Quote submission fees against the published schedules
    Fees {
        #[command(subcommand)]
        command: FeesCommand,
    },
    /// Run an end-to-end CLI demo covering the submission lifecycle
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum FeesCommand {
    /// Price a hypothetical submission and project its completion date
    Quote(FeeQuoteArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Authority reference CSV replacing the builtin directory
    #[arg(long, requires = "categories_csv")]
    pub(crate) authorities_csv: Option<PathBuf>,
    /// Category reference CSV replacing the builtin directory
    #[arg(long, requires = "authorities_csv")]
    pub(crate) categories_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Fees {
            command: FeesCommand::Quote(args),
        } => run_fee_quote(args),
        Command::Demo(args) => run_demo(args),
    }
}
