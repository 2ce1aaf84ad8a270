use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_wasm_dir() -> String {
    "./wasm".to_string()
}

fn default_page_path() -> String {
    "./src/ui/index.html".to_string()
}

/// Server-side settings: where to bind and where the static assets live.
/// Every field has a default, so a config file only needs the fields it
/// wants to change.
#[derive(Deserialize, Debug, Clone)]
pub struct HarnessConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory the runtime support files (`/wasm/<name>`) are served from.
    #[serde(default = "default_wasm_dir")]
    pub wasm_dir: String,
    /// The demo page served at `/`.
    #[serde(default = "default_page_path")]
    pub page_path: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            wasm_dir: default_wasm_dir(),
            page_path: default_page_path(),
        }
    }
}

impl HarnessConfig {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if !Path::new(config_path).exists() {
            return Err(format!("Config file not found at: {}", config_path).into());
        }

        let mut file = File::open(config_path)
            .map_err(|e| format!("Failed to open config file {}: {}", config_path, e))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| format!("Failed to read config file {}: {}", config_path, e))?;

        let config: HarnessConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to deserialize JSON from {}: {}", config_path, e))?;

        Ok(config)
    }
}
