use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ostore", about = "Embeddable object store", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "ostore.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Read, write and search objects
    Object(ObjectArgs),
    /// Manage users
    User(UserArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured listen address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ObjectArgs {
    #[command(subcommand)]
    pub action: ObjectAction,
}

#[derive(Subcommand)]
pub enum ObjectAction {
    /// Print objects by uid
    Get {
        #[arg(required = true)]
        uids: Vec<String>,
        /// Act as this user instead of bypassing permissions
        #[arg(long)]
        user: Option<String>,
    },
    /// Create or update objects from a JSON object or array
    Set {
        /// JSON document; read from stdin when absent
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete objects by uid
    Delete {
        #[arg(required = true)]
        uids: Vec<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Search the index
    Query {
        #[arg(required = true, num_args = 1..)]
        expr: Vec<String>,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create or update a user
    Set {
        #[arg(short = 'u', long)]
        username: String,
        #[arg(short = 'p', long)]
        password: Option<String>,
        /// Replace the user's groups
        #[arg(short = 'g', long = "group")]
        groups: Vec<String>,
        #[arg(long)]
        disable: bool,
    },
    /// Show a user
    Get(UserSelector),
    /// Delete a user and end their sessions
    Delete(UserSelector),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("who").required(true).args(["username", "uid"])))]
pub struct UserSelector {
    #[arg(short = 'u', long)]
    pub username: Option<String>,
    #[arg(long)]
    pub uid: Option<String>,
}
