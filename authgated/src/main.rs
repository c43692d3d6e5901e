use clap::{Parser, Subcommand};
use rst_common::with_tokio::tokio;

use authgated::commands::{
    authorization_handler, connection_handler, AuthorizationArgs, ConnectionArgs,
};
use authgated::errors::DaemonError;
use authgated::svc::daemon::Daemon;

#[derive(Parser)]
#[command(name = "authgated")]
#[command(version = "0.1.0")]
#[command(long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    #[arg(required = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "run")]
    #[command(about = "Polling pending authorizations until interrupted")]
    Run,

    #[command(name = "connection")]
    #[command(about = "Managing paired connections")]
    Connection(ConnectionArgs),

    #[command(name = "authorization")]
    #[command(about = "Listing and deciding pending authorizations")]
    Authorization(AuthorizationArgs),
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let cli = Cli::parse();
    Daemon::init_tracing();

    let daemon = Daemon::new(cli.config.to_owned());
    match cli.command {
        Commands::Run => daemon.run().await?,
        Commands::Connection(args) => {
            let authgate = daemon.authgate().await?;
            connection_handler(&authgate, args.commands).await?
        }
        Commands::Authorization(args) => {
            let authgate = daemon.authgate().await?;
            authorization_handler(&authgate, args.commands).await?
        }
    }

    Ok(())
}
