//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use track_downloader::TaskStatus;

/// Queue and track music downloads from a track catalog.
///
/// Tracks are looked up in a JSON catalog file, resolved to a playable
/// address, and downloaded as "{artist} - {title}.mp3".
#[derive(Parser, Debug)]
#[command(name = "track-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Treat the current connection as metered instead of Wi-Fi
    #[arg(long, global = true)]
    pub metered: bool,

    /// Config file (default: $XDG_CONFIG_HOME/track-downloader/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Task database file
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Directory downloads are written to
    #[arg(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Catalog service base url used to resolve download addresses
    #[arg(long, global = true, value_name = "URL")]
    pub resolver_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download one track from the catalog
    Enqueue {
        /// JSON catalog file (array of tracks)
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Track id to download
        #[arg(long)]
        id: String,
    },

    /// Download several tracks behind a single confirmation
    Batch {
        /// JSON catalog file (array of tracks)
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Track ids to download (default: every track in the catalog)
        #[arg(long = "id")]
        ids: Vec<String>,
    },

    /// List download tasks
    Tasks {
        /// Only show tasks in this status (queued, running, done, failed)
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },

    /// Delete the files of local tracks
    Remove {
        /// JSON catalog file (array of tracks)
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,

        /// Track ids to delete; more than one asks for confirmation
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
    },
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    value.parse()
}
