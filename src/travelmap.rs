use std::path::{Path, PathBuf};

use clap::Parser;

mod config;
mod geometry;
mod gui;
mod map;
mod remote;
mod travel;

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about = "World map of visited countries with travel history.", long_about = None)]
struct Cli {
    /// Load the travel dataset from a local JSON file (implies --offline)
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Country boundary GeoJSON path or http(s) URL, overriding the config
    #[arg(long, value_name = "PATH")]
    geometry: Option<String>,

    /// Skip the remote dataset fetch and keep the bundled data
    #[arg(long)]
    offline: bool,
}

impl Cli {
    fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.data {
            if !path.is_file() {
                return Err(format!("Data file does not exist: {:?}", path));
            }
        }
        if let Some(source) = &self.geometry {
            let is_url = source.starts_with("http://") || source.starts_with("https://");
            if !is_url && !Path::new(source).is_file() {
                return Err(format!("Geometry source does not exist: {}", source));
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(msg) = cli.validate() {
        eprintln!("{}", msg);
        std::process::exit(1);
    }

    let ctx = config::AppContext::load()?;

    let (travel, offline) = match &cli.data {
        // a local dataset override is authoritative; don't let the remote
        // store supersede it
        Some(path) => (travel::TravelData::load_json(path)?, true),
        None => (travel::fallback(), cli.offline),
    };

    log::info!("starting with {} visited countries", travel.len());

    let app = gui::MapApp::new(ctx, travel, cli.geometry.clone(), offline);
    app.run()?;
    Ok(())
}
