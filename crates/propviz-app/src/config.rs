//! Runtime configuration loaded from a TOML file.
//!
//! Every key is optional; missing sections fall back to the compile-time
//! defaults in `propviz_core::constants`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use propviz_core::constants::*;
use propviz_core::enums::CoordinateMode;
use propviz_core::types::{GeoPoint, Viewport};
use propviz_render::HeatmapParams;
use propviz_sim::EngineConfig;

use crate::backend::HttpSettings;
use crate::wire::FilterPreset;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub view: ViewSection,
    #[serde(default)]
    pub playback: PlaybackSection,
    #[serde(default)]
    pub heatmap: HeatmapSection,
    #[serde(default)]
    pub profile: ProfileSection,
    #[serde(default)]
    pub interference: InterferenceSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub base_url: String,
    /// Scenario loaded as the scene in map mode.
    pub scenario_id: String,
    pub timeout_ms: u64,
    /// Restore the pre-drag position when a move is rejected.
    pub rollback_on_failure: bool,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            scenario_id: "demo".into(),
            timeout_ms: 10_000,
            rollback_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSection {
    pub mode: CoordinateMode,
    pub width: f64,
    pub height: f64,
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub show_lines: bool,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            mode: CoordinateMode::Grid,
            width: 1024.0,
            height: 640.0,
            center_lat: 10.4236,
            center_lon: -75.5253,
            zoom: 13.0,
            show_lines: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSection {
    pub period_ms: u64,
    pub moving_entity: String,
    pub speed: f64,
    pub snap: bool,
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            period_ms: PLAYBACK_PERIOD_MS,
            moving_entity: DEFAULT_MOVING_ENTITY_ID.into(),
            speed: 1.0,
            snap: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapSection {
    pub radius_px: u32,
    pub max_alpha: f64,
    pub radius_km: f64,
    pub step_m: u32,
    pub f_rx_mhz: f64,
    pub window_khz: f64,
    pub filter: FilterPreset,
}

impl Default for HeatmapSection {
    fn default() -> Self {
        Self {
            radius_px: HEAT_RADIUS_PX,
            max_alpha: HEAT_MAX_ALPHA,
            radius_km: HEAT_REQUEST_RADIUS_KM,
            step_m: HEAT_REQUEST_STEP_M,
            f_rx_mhz: DEFAULT_RX_FREQUENCY_MHZ,
            window_khz: DEFAULT_WINDOW_KHZ,
            filter: FilterPreset::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSection {
    pub frequency_mhz: f64,
    pub k_factor: f64,
    pub samples: u32,
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            frequency_mhz: DEFAULT_RX_FREQUENCY_MHZ,
            k_factor: DEFAULT_K_FACTOR,
            samples: PROFILE_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferenceSection {
    pub f_rx_mhz: f64,
    pub window_khz: f64,
    pub max_order: u32,
}

impl Default for InterferenceSection {
    fn default() -> Self {
        Self {
            f_rx_mhz: DEFAULT_RX_FREQUENCY_MHZ,
            window_khz: INTERFERENCE_WINDOW_KHZ,
            max_order: INTERFERENCE_MAX_ORDER,
        }
    }
}

pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ClientConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

impl ClientConfig {
    pub fn map_center(&self) -> GeoPoint {
        GeoPoint::new(self.view.center_lat, self.view.center_lon)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            mode: self.view.mode,
            viewport: Viewport::new(self.view.width, self.view.height),
            map_center: self.map_center(),
            map_zoom: self.view.zoom,
            playback_period: Duration::from_millis(self.playback.period_ms),
            moving_entity_id: self.playback.moving_entity.clone(),
            rollback_on_commit_failure: self.backend.rollback_on_failure,
            heatmap: HeatmapParams {
                radius_px: self.heatmap.radius_px,
                max_alpha: self.heatmap.max_alpha,
            },
            profile_samples: self.profile.samples,
            show_lines: self.view.show_lines,
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self.backend.base_url.clone(),
            mode: self.view.mode,
            scenario_id: self.backend.scenario_id.clone(),
            filter: self.heatmap.filter,
            timeout: Duration::from_millis(self.backend.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.playback.period_ms, 600);
        assert_eq!(config.heatmap.filter, FilterPreset::Bpf200k);
    }

    #[test]
    fn test_partial_sections() {
        let config: ClientConfig = toml::from_str(
            r#"
            [backend]
            base_url = "http://radio.local/api"
            rollback_on_failure = true

            [view]
            mode = "Map"
            zoom = 15.0

            [heatmap]
            max_alpha = 0.4
            filter = "cavity_8p"

            [interference]
            max_order = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://radio.local/api");
        assert_eq!(config.backend.scenario_id, "demo");
        assert_eq!(config.view.mode, CoordinateMode::Map);
        assert_eq!(config.view.width, 1024.0);
        assert_eq!(config.heatmap.filter, FilterPreset::Cavity8p);
        assert_eq!(config.interference.max_order, 4);
        assert_eq!(config.interference.window_khz, 500.0);

        let engine = config.engine_config();
        assert!(engine.rollback_on_commit_failure);
        assert_eq!(engine.map_zoom, 15.0);
        assert!((engine.heatmap.max_alpha - 0.4).abs() < 1e-12);
        assert_eq!(engine.heatmap.radius_px, HEAT_RADIUS_PX);
    }

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config(Path::new("/nonexistent/propviz.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/propviz.toml"));
    }
}
