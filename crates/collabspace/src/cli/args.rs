use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "collabspace")]
#[command(about = "Manage collaborative workspaces across local and cloud storage", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known workspaces
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Create a workspace on the main provider
    Create {
        /// Display name
        name: String,

        /// Avatar blob id or URL
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Rename a workspace
    Rename {
        /// Workspace id
        id: String,

        /// New display name
        name: String,
    },

    /// Delete a workspace and its data
    Delete {
        /// Workspace id
        id: String,
    },

    /// Make a workspace public (or private with --off)
    Publish {
        /// Workspace id
        id: String,

        /// Make the workspace private again
        #[arg(long)]
        off: bool,
    },

    /// Store a session token for the cloud service and log in
    Login {
        /// Session token issued by the cloud service
        #[arg(long)]
        token: String,

        /// Cloud service URL (saved to config)
        #[arg(long)]
        server: Option<String>,
    },

    /// Log out of the cloud service
    Logout,

    /// Move a local workspace to the cloud
    EnableCloud {
        /// Workspace id
        id: String,
    },

    /// Write a workspace's document to a file
    Export {
        /// Workspace id
        id: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Create a workspace from an exported file
    Import {
        /// File written by `export`
        path: PathBuf,
    },
}
