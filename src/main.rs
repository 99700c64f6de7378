use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use animap::config::{self, Config};
use animap::{AniListClient, Catalog, Mapper, ParsedTitle};

#[derive(Parser)]
#[command(name = "animap")]
#[command(about = "Map anime release titles to AniList entries", long_about = None)]
struct Cli {
    /// Config file path (defaults to the app data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how a release title is cleaned up, without searching
    Normalize { title: String },
    /// Search AniList directly
    Search { query: String },
    /// Map one release title
    Map {
        title: String,
        /// Use this AniList id instead of matching
        #[arg(long)]
        id: Option<i64>,
    },
    /// Map every line of a file
    Batch { file: PathBuf },
    /// Delete expired cache files
    CachePurge,
}

// Normalize command output
#[derive(Serialize)]
struct NormalizeOutput {
    raw: String,
    normalized: String,
    base: String,
    season: Option<u32>,
}

impl From<ParsedTitle> for NormalizeOutput {
    fn from(parsed: ParsedTitle) -> Self {
        NormalizeOutput {
            raw: parsed.raw,
            normalized: parsed.normalized,
            base: parsed.base,
            season: parsed.season,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_settings(path: Option<PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = path.unwrap_or_else(config::get_config_path);
    let mut config = config::load_config(&path)?;
    config.apply_env_overrides();
    info!("Loaded config from {:?}", path);
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Command::Normalize { title } = &cli.command {
        return print_json(&NormalizeOutput::from(ParsedTitle::parse(title)));
    }

    let config = load_settings(cli.config)?;
    let client = AniListClient::from_config(&config)?;

    match cli.command {
        Command::Normalize { .. } => Ok(()),
        Command::Search { query } => print_json(&client.search(&query)?),
        Command::Map { title, id } => print_json(&Mapper::new(client).map(&title, id)?),
        Command::Batch { file } => {
            let contents = fs::read_to_string(&file)?;
            let titles: Vec<&str> = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            print_json(&Mapper::new(client).map_batch(&titles)?)
        }
        Command::CachePurge => {
            let removed = client.cache().purge_expired()?;
            println!("Removed {} expired cache entries from {:?}", removed, client.cache().dir());
            Ok(())
        }
    }
}
