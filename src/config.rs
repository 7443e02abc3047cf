use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "travelmap.conf";

/// Carto Positron without labels, the base layer under the country polygons.
pub const DEFAULT_TILE_URL: &str =
    "https://basemaps.cartocdn.com/light_nolabels/{z}/{x}/{y}.png";

pub const TILE_ATTRIBUTION: &str = "© CARTO © OpenStreetMap contributors";

// --- GUI ---

#[derive(Serialize, Deserialize, Clone)]
pub struct GuiConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub font_scale: Option<f32>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self { width: Some(1280), height: Some(800), font_scale: Some(1.0) }
    }
}

// --- Map ---

#[derive(Serialize, Deserialize, Clone)]
pub struct MapConfig {
    /// Slippy tile URL template with {z}/{x}/{y} placeholders.
    pub tile_url: String,
    /// Country boundary GeoJSON: a filesystem path or an http(s) URL.
    pub geometry_source: String,
    pub initial_lon: f64,
    pub initial_lat: f64,
    pub initial_zoom: f64,
    /// Ceiling for the selection fit so small countries don't fill the window.
    pub max_fit_zoom: f64,
    /// Camera transition length for both selection fit and reset.
    pub transition_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: DEFAULT_TILE_URL.to_owned(),
            geometry_source: "assets/countries.geojson".to_owned(),
            initial_lon: 15.0,
            initial_lat: 20.0,
            initial_zoom: 1.8,
            max_fit_zoom: 7.0,
            transition_ms: 1000,
        }
    }
}

// --- Remote store ---

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct RemoteConfig {
    /// Base URL of the hosted table store; unset means bundled data only.
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
struct Config {
    #[serde(default)]
    gui: GuiConfig,
    #[serde(default)]
    map: MapConfig,
    #[serde(default)]
    remote: RemoteConfig,
}

/// Loaded configuration plus where it came from.
pub struct AppContext {
    pub config_path: PathBuf,
    pub gui: GuiConfig,
    pub map: MapConfig,
    pub remote: RemoteConfig,
}

impl AppContext {
    pub fn load() -> anyhow::Result<Self> {
        let config_dir = dirs::config_dir().context("no config dir found")?;
        fs::create_dir_all(&config_dir)?;
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let cfg: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?;

            // Write back defaults if new sections are missing
            let raw_value: toml::Value = toml::from_str(&content).unwrap_or(toml::Value::Integer(0));
            let missing = ["gui", "map", "remote"]
                .iter()
                .any(|section| raw_value.get(section).is_none());
            if missing {
                let toml_str = toml::to_string_pretty(&cfg)?;
                fs::write(&config_path, toml_str)?;
            }
            cfg
        } else {
            let cfg = Config::default();
            let toml_str = toml::to_string_pretty(&cfg)?;
            fs::write(&config_path, toml_str)?;
            log::info!("wrote default config to {}", config_path.display());
            cfg
        };

        Ok(Self { config_path, gui: config.gui, map: config.map, remote: config.remote })
    }

    /// Persist the window size on exit so the next launch opens the same way.
    pub fn save_window_size(&self, width: u32, height: u32) -> anyhow::Result<()> {
        let content = fs::read_to_string(&self.config_path)?;
        let mut cfg: Config = toml::from_str(&content)?;
        cfg.gui.width = Some(width);
        cfg.gui.height = Some(height);
        let toml_str = toml::to_string_pretty(&cfg)?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }
}
