use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Stitch elevation regions from SRTM .hgt tiles
#[derive(Parser)]
#[command(name = "hgtstitch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing .hgt files
    #[arg(short, long, env = "HGTSTITCH_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the remote tile dataset
    #[arg(short, long, env = "HGTSTITCH_BASE_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about a single SRTM tile
    Info {
        /// Path to .hgt file, or tile name (e.g., N37W123)
        tile: String,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Stitch a bounding box into one raw grid, fetching missing tiles
    Region {
        /// Southern boundary latitude
        #[arg(long)]
        start_lat: f64,

        /// Western boundary longitude
        #[arg(long)]
        start_lon: f64,

        /// Northern boundary latitude
        #[arg(long)]
        end_lat: f64,

        /// Eastern boundary longitude
        #[arg(long)]
        end_lon: f64,

        /// Output file for the raw grid (big-endian i16, north row first)
        #[arg(short, long)]
        output: PathBuf,

        /// Write a JSON metadata sidecar next to the output
        #[arg(short, long)]
        json: bool,
    },

    /// List the valid tile files in the data directory
    List,

    /// Check whether a filename is a valid tile name
    Check {
        /// Filename or path to validate
        name: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { tile, json } => commands::info::run(cli.data_dir, tile, json),
        Commands::Region {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            output,
            json,
        } => commands::region::run(
            cli.data_dir,
            cli.base_url,
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            output,
            json,
        ),
        Commands::List => commands::list::run(cli.data_dir),
        Commands::Check { name } => commands::check::run(&name),
    }
}
