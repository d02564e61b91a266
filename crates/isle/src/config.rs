use isle_common::{isle_config_dir, parse_level};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::geometry::Rectangle;
use crate::shell::XDG_SHELL_VERSION;

fn default_xdg_wm_base_version() -> u32 {
    XDG_SHELL_VERSION
}

fn default_ping_interval_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_name() -> String {
    "HEADLESS-1".to_string()
}
fn default_output_width() -> i32 {
    1920
}
fn default_output_height() -> i32 {
    1080
}
fn default_refresh() -> i32 {
    60000
}
fn default_make() -> String {
    "Isle".to_string()
}
fn default_model() -> String {
    "Headless".to_string()
}

fn default_outputs() -> Vec<OutputConfig> {
    vec![OutputConfig::default()]
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub shell: ShellConfig,
    pub logging: LoggingConfig,
    #[serde(rename = "output", default = "default_outputs")]
    pub outputs: Vec<OutputConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: ShellConfig::default(),
            logging: LoggingConfig::default(),
            outputs: default_outputs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ShellConfig {
    #[serde(default = "default_xdg_wm_base_version")]
    pub xdg_wm_base_version: u32,
    /// How often windows are pinged; 0 disables the liveness check.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            xdg_wm_base_version: default_xdg_wm_base_version(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(default = "default_output_name")]
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_output_width")]
    pub width: i32,
    #[serde(default = "default_output_height")]
    pub height: i32,
    /// mHz, as wl_output reports it.
    #[serde(default = "default_refresh")]
    pub refresh: i32,
    #[serde(default = "default_make")]
    pub make: String,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: default_output_name(),
            x: 0,
            y: 0,
            width: default_output_width(),
            height: default_output_height(),
            refresh: default_refresh(),
            make: default_make(),
            model: default_model(),
        }
    }
}

impl OutputConfig {
    pub fn geometry(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.width.max(1), self.height.max(1))
    }
}

impl Config {
    pub fn load() -> Self {
        let user_config = isle_config_dir().join("config.toml");
        let system_config = PathBuf::from("/etc/isle/config.toml");

        for path in [user_config, system_config] {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", path.display(), e);
                }
            }
        }

        log::info!("Using default configuration");
        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        if config.outputs.is_empty() {
            config.outputs = default_outputs();
        }
        Ok(config)
    }

    pub fn log_level(&self) -> LevelFilter {
        parse_level(&self.logging.level).unwrap_or(LevelFilter::Info)
    }

    pub fn xdg_wm_base_version(&self) -> u32 {
        self.shell.xdg_wm_base_version.clamp(1, XDG_SHELL_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.xdg_wm_base_version(), XDG_SHELL_VERSION);
        assert_eq!(config.log_level(), LevelFilter::Info);
        assert_eq!(config.shell.ping_interval_ms, 5000);
        assert_eq!(config.outputs.len(), 1);
        assert_eq!(config.outputs[0].geometry(), Rectangle::new(0, 0, 1920, 1080));
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
            [shell]
            xdg_wm_base_version = 3
            ping_interval_ms = 0

            [logging]
            level = "debug"

            [[output]]
            name = "LEFT"
            width = 1280
            height = 1024

            [[output]]
            name = "RIGHT"
            x = 1280
            refresh = 144000
            "#,
        )
        .unwrap();

        assert_eq!(config.xdg_wm_base_version(), 3);
        assert_eq!(config.shell.ping_interval_ms, 0);
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.outputs[0].geometry(), Rectangle::new(0, 0, 1280, 1024));
        assert_eq!(config.outputs[1].geometry(), Rectangle::new(1280, 0, 1920, 1080));
        assert_eq!(config.outputs[1].refresh, 144000);
        assert_eq!(config.outputs[1].make, "Isle");
    }

    #[test]
    fn test_version_is_clamped() {
        let config = Config::parse("[shell]\nxdg_wm_base_version = 42\n").unwrap();
        assert_eq!(config.xdg_wm_base_version(), XDG_SHELL_VERSION);
        assert_eq!(config.outputs.len(), 1);
    }

    #[test]
    fn test_bad_level_falls_back_to_info() {
        let config = Config::parse("[logging]\nlevel = \"loud\"\n").unwrap();
        assert_eq!(config.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::parse("[shell\n").is_err());
    }
}
