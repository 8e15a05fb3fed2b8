use crate::commands::{run_agency_refresh, run_feed_dump, AgencyRefreshArgs, FeedDumpArgs};
use crate::server;
use agency_hub::config::AppConfig;
use agency_hub::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "agency-hub-api",
    about = "Serve the agency hub API or run its sync jobs from the command line",
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
    /// Inspect the paginated listing feed
    Feed {
        #[command(subcommand)]
        command: FeedCommand,
    },
    /// Run agency batch jobs once and print the outcome
    Agencies {
        #[command(subcommand)]
        command: AgencyCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FeedCommand {
    /// Fetch every page of an agency's feed and print the records as JSON
    Dump(FeedDumpArgs),
}

#[derive(Subcommand, Debug)]
enum AgencyCommand {
    /// Reconcile stored agencies against the agency directory
    Refresh(AgencyRefreshArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// SQLite URL to store records in instead of process memory
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

impl ServeArgs {
    pub(crate) fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = Some(url);
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Feed {
            command: FeedCommand::Dump(args),
        } => run_feed_dump(args).await,
        Command::Agencies {
            command: AgencyCommand::Refresh(args),
        } => run_agency_refresh(args).await,
    }
}
