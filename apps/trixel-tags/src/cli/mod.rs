//! # trixel-tags CLI Module
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `tag` - Associate a tag with a trixel
//! - `untag` - Remove a tag from a trixel
//! - `tags` - List the tags of a trixel, or every tag in use
//! - `ids` - List the trixels carrying a tag
//! - `counts` - Show every tag with its occurrence count
//! - `status` - Show index totals
//! - `verify` - Cross-check both indices and the count table

mod commands;

use crate::{AppError, Config};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// trixel-tags - tag index for trixels
///
/// Maintains a many-to-many index between numeric trixel ids and free-text
/// tags, queryable in both directions.
#[derive(Parser, Debug)]
#[command(name = "trixel-tags")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the index database [default: trixel-tags.redb]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum, default_value_t = Backend::Redb)]
    pub backend: Backend,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the index lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// redb database file
    Redb,
    /// Volatile, lost on exit
    Memory,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Redb => "redb",
            Backend::Memory => "memory",
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory served for unmatched paths
        #[arg(short, long)]
        static_dir: Option<PathBuf>,
    },

    /// Associate a tag with a trixel
    Tag {
        /// Trixel id (digits)
        trid: String,
        /// Tag text
        tag: String,
    },

    /// Remove a tag from a trixel
    Untag {
        /// Trixel id (digits)
        trid: String,
        /// Tag text
        tag: String,
    },

    /// List tags of a trixel, or all tags when no trixel is given
    Tags {
        /// Trixel id (digits)
        trid: Option<String>,
    },

    /// List trixels carrying a tag
    Ids {
        /// Tag text
        tag: String,
    },

    /// Show every tag with its occurrence count
    Counts,

    /// Show index totals
    Status,

    /// Cross-check both indices and the count table
    Verify,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration: file and environment first, then CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, AppError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(Commands::Serve {
        host,
        port,
        static_dir,
    }) = &cli.command
    {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(dir) = static_dir {
            config.server.static_dir = Some(dir.clone());
        }
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli)?;
    let engine = open_engine(&config, cli.backend)?;
    let json = cli.json;

    match cli.command {
        Some(Commands::Serve { .. }) => cmd_serve(engine, config, cli.backend).await,
        Some(Commands::Tag { trid, tag }) => cmd_tag(&engine, &trid, &tag, json),
        Some(Commands::Untag { trid, tag }) => cmd_untag(&engine, &trid, &tag, json),
        Some(Commands::Tags { trid }) => cmd_tags(&engine, trid.as_deref(), json),
        Some(Commands::Ids { tag }) => cmd_ids(&engine, &tag, json),
        Some(Commands::Counts) => cmd_counts(&engine, json),
        Some(Commands::Verify) => cmd_verify(&engine, json),
        Some(Commands::Status) | None => cmd_status(&engine, &config, cli.backend, json),
    }
}
