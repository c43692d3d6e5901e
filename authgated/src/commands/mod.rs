use clap::{Args, Subcommand};

mod gate;
mod handler;
mod types;

pub use gate::ConsoleGate;
pub use handler::{authorization_handler, connection_handler};

#[derive(Args, Clone)]
pub struct ConnectionArgs {
    #[command(subcommand)]
    pub commands: ConnectionCommands,
}

#[derive(Subcommand, Clone)]
#[command(subcommand_help_heading = "Connection")]
pub enum ConnectionCommands {
    Add(ConnectionAddArgs),
    Rename(ConnectionRenameArgs),
    /// issue a fresh key pair for an inactive connection
    Reconnect(ConnectionIdArgs),
    /// revoke the connection on its server, then drop it locally
    Remove(ConnectionIdArgs),
    RemoveAll,
    List,
}

#[derive(Args, Clone)]
pub struct ConnectionAddArgs {
    #[arg(long, required(true))]
    pub base_url: String,

    #[arg(long, required(true))]
    pub access_token: String,

    #[arg(long)]
    pub name: Option<String>,

    /// connection id assigned by the server during pairing
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args, Clone)]
pub struct ConnectionRenameArgs {
    #[arg(long, required(true))]
    pub id: String,

    #[arg(long, required(true))]
    pub name: String,
}

#[derive(Args, Clone)]
pub struct ConnectionIdArgs {
    #[arg(long, required(true))]
    pub id: String,
}

#[derive(Args, Clone)]
pub struct AuthorizationArgs {
    #[command(subcommand)]
    pub commands: AuthorizationCommands,
}

#[derive(Subcommand, Clone)]
#[command(subcommand_help_heading = "Authorization")]
pub enum AuthorizationCommands {
    List,
    Decide(AuthorizationDecideArgs),
}

#[derive(Args, Clone)]
pub struct AuthorizationDecideArgs {
    #[arg(long, required(true))]
    pub connection: String,

    #[arg(long, required(true))]
    pub authorization: String,

    /// deny instead of confirm, denying never asks for user verification
    #[arg(long)]
    pub deny: bool,
}
