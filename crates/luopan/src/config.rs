use crate::engine::RingSpec;
use crate::engine::tables;
use crate::events::AppEvent;
use crate::orientation::{DEFAULT_MANUAL_STEP, OrientationSettings};
use crate::theme::{Theme, ThemeName, ThemeOverride, ThemeRegistry};
use async_channel::Sender;
use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::path::PathBuf;
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

/// Where heading samples come from.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    DeserializeFromStr,
    SerializeDisplay,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum SensorKind {
    /// Headings pushed over the command socket.
    #[default]
    Feed,
    /// No sensor; keyboard and socket rotation only.
    Manual,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Overrides the theme's damping factor when set.
    pub damping_factor: Option<f64>,
    pub manual_step: f64,
    pub sensor: SensorKind,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            damping_factor: None,
            manual_step: DEFAULT_MANUAL_STEP,
            sensor: SensorKind::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub theme: ThemeName,
    #[serde(default)]
    pub orientation: OrientationConfig,
    #[serde(default)]
    pub themes: Vec<ThemeOverride>,
    #[serde(default)]
    pub rings: Vec<RingSpec>,
}

impl Config {
    /// Configured rings, or the classic four when none are given.
    pub fn ring_specs(&self) -> Vec<RingSpec> {
        if self.rings.is_empty() {
            tables::default_rings()
        } else {
            self.rings.clone()
        }
    }

    pub fn theme_registry(&self) -> ThemeRegistry {
        ThemeRegistry::with_overrides(&self.themes)
    }

    pub fn orientation_settings(&self, theme: &Theme) -> OrientationSettings {
        let mut settings = OrientationSettings::from_theme(theme);
        match self.orientation.damping_factor {
            Some(d) if d > 0.0 && d <= 1.0 => settings.damping_factor = d,
            Some(d) => log::warn!(
                "orientation.damping_factor {} outside (0, 1], using {}",
                d,
                settings.damping_factor
            ),
            None => {}
        }
        if self.orientation.manual_step.is_finite() {
            settings.manual_step = self.orientation.manual_step;
        } else {
            log::warn!("orientation.manual_step is not finite, using {}", DEFAULT_MANUAL_STEP);
        }
        settings
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "troia", "luopan").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    let config_path = get_config_path()?;

    let s = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(config::Environment::with_prefix("LUOPAN"))
        .build()?;

    Ok(s.try_deserialize()?)
}

pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;
    Ok(s.try_deserialize()?)
}

/// Loads the config file, falling back to built-in defaults when it is
/// missing or broken.
pub fn load_or_default() -> Config {
    match load_config() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    }
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

pub const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher error: {}", e);
            return;
        }
    };
    let config_dir = match config_path.parent() {
        Some(p) => p.to_path_buf(),
        None => return,
    };

    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create watcher: {}", e);
            return;
        }
    };

    if let Err(e) = watcher.watch(&config_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch config directory: {}", e);
        return;
    }

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if relevant
                    && event.paths.iter().any(|p| p == &config_path)
                    && tx.send(AppEvent::ConfigReload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CompassEngine, CompassLayout, ConfigWarning, GroupLayout, Lenient};

    #[test]
    fn test_bundled_config_parses() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.theme, ThemeName::Compass);
        assert_eq!(config.orientation.sensor, SensorKind::Feed);
        assert_eq!(config.orientation.manual_step, 90.0);
        assert!(config.rings.is_empty());
        assert_eq!(config.ring_specs().len(), 4);
    }

    #[test]
    fn test_sensor_kind_deserialization() {
        let cases = vec![
            ("\"feed\"", SensorKind::Feed),
            ("\"Manual\"", SensorKind::Manual),
            ("\"MANUAL\"", SensorKind::Manual),
        ];
        for (json, expected) in cases {
            let deserialized: SensorKind = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized, expected);
        }
        assert!(serde_json::from_str::<SensorKind>("\"gyro\"").is_err());
    }

    #[test]
    fn test_rings_and_overrides_from_toml() {
        let toml = r##"
            theme = "night"

            [orientation]
            damping_factor = 0.5
            sensor = "manual"

            [[themes]]
            name = "dark"
            pointer = "#ff0000"
            heading_offset = 12.5

            [[rings]]
            label = "八方"
            start_angle = 22.5
            font_size = 14
            cells = ["北", "东北", "东", "东南", "南", "西南", "西", "西北"]

            [[rings]]
            label = ["卦", "五行"]
            group_layout = "nested"
            vertical = "sometimes"
            cells = [["坎", "水"], ["离", "火"]]
        "##;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.theme, ThemeName::Dark);
        assert_eq!(config.orientation.sensor, SensorKind::Manual);
        assert_eq!(config.rings.len(), 2);
        assert_eq!(config.rings[0].font_size, Some(Lenient::Valid(14.0)));
        assert_eq!(config.rings[1].group_layout, Some(GroupLayout::Nested));

        let registry = config.theme_registry();
        let theme = registry.get(config.theme);
        assert_eq!(theme.heading_offset, 12.5);
        let settings = config.orientation_settings(theme);
        assert_eq!(settings.damping_factor, 0.5);
        assert_eq!(settings.heading_offset, 12.5);

        let mut engine = CompassEngine::new(CompassLayout::default());
        let warnings = engine.set_compass_data(config.ring_specs());
        assert_eq!(warnings, vec![ConfigWarning::InvalidVertical { ring: 1 }]);
        assert_eq!(engine.resolve_cell_at(0, 45.0).unwrap().as_str(), "东北");
    }

    #[test]
    fn test_bad_damping_override_keeps_theme_value() {
        let config = parse_config("[orientation]\ndamping_factor = 3.0\n").unwrap();
        let registry = config.theme_registry();
        let theme = registry.get(ThemeName::Compass);
        let settings = config.orientation_settings(theme);
        assert_eq!(settings.damping_factor, theme.animation.damping_factor);
    }
}
