use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VisualizerError};
use crate::graphics::mapper::{Hsla, MapperStyle, GRADIENT_ALPHA, GRADIENT_LIGHTNESS, SMOOTHING_SPAN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Filled ring with the radial gradient.
    RingFill,
    /// Ring outline stroked with the radial gradient.
    RingStroke,
    /// Classic left-to-right trace.
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopePreset {
    pub name: String,
    pub mode: RenderMode,
    pub parameters: PresetParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetParameters {
    /// Painted over the whole canvas before every frame.
    pub background: Hsla,
    pub gradient_lightness: [f32; 4],
    pub gradient_alpha: f32,
    pub smoothing_span: usize,
    pub line_width: f32,
    /// Line mode only; the ring modes take their color from the gradient.
    pub line_color: Hsla,
}

impl Default for PresetParameters {
    fn default() -> Self {
        Self {
            background: Hsla::new(200.0, 50.0, 15.0, 0.5),
            gradient_lightness: GRADIENT_LIGHTNESS,
            gradient_alpha: GRADIENT_ALPHA,
            smoothing_span: SMOOTHING_SPAN,
            line_width: 2.0,
            line_color: Hsla::new(200.0, 50.0, 80.0, 0.8),
        }
    }
}

impl ScopePreset {
    pub fn mapper_style(&self) -> MapperStyle {
        MapperStyle {
            smoothing_span: self.parameters.smoothing_span,
            lightness: self.parameters.gradient_lightness,
            alpha: self.parameters.gradient_alpha,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| VisualizerError::Preset(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}

pub struct PresetManager {
    presets: Vec<ScopePreset>,
}

impl PresetManager {
    pub fn new() -> Self {
        let presets = vec![
            ScopePreset {
                name: "ring".to_string(),
                mode: RenderMode::RingFill,
                parameters: PresetParameters::default(),
            },
            ScopePreset {
                name: "ring-outline".to_string(),
                mode: RenderMode::RingStroke,
                parameters: PresetParameters::default(),
            },
            ScopePreset {
                name: "line".to_string(),
                mode: RenderMode::Line,
                parameters: PresetParameters {
                    line_width: 1.0,
                    ..PresetParameters::default()
                },
            },
        ];

        Self { presets }
    }

    pub fn get(&self, name: &str) -> Result<&ScopePreset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                VisualizerError::Preset(format!(
                    "unknown preset '{}' (available: {})",
                    name,
                    self.names().join(", ")
                ))
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn get_presets(&self) -> &[ScopePreset] {
        &self.presets
    }
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ring_matches_stock_look() {
        let manager = PresetManager::new();
        let ring = manager.get("ring").unwrap();
        assert_eq!(ring.mode, RenderMode::RingFill);
        assert_eq!(ring.mapper_style(), MapperStyle::default());
        assert_eq!(ring.parameters.background.to_string(), "hsla(200,50%,15%,0.5)");
    }

    #[test]
    fn lookup_is_case_insensitive_and_reports_choices() {
        let manager = PresetManager::new();
        assert_eq!(manager.get("LINE").unwrap().mode, RenderMode::Line);

        let err = manager.get("plasma").unwrap_err().to_string();
        assert!(err.contains("ring, ring-outline, line"), "{err}");
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let preset = ScopePreset::from_json(
            r#"{
                "name": "dim",
                "mode": "ring-stroke",
                "parameters": { "smoothing_span": 32, "background": { "hue": 0, "saturation": 0, "lightness": 0, "alpha": 0.2 } }
            }"#,
        )
        .unwrap();

        assert_eq!(preset.mode, RenderMode::RingStroke);
        assert_eq!(preset.parameters.smoothing_span, 32);
        assert_eq!(preset.parameters.background.alpha, 0.2);
        assert_eq!(preset.parameters.gradient_lightness, GRADIENT_LIGHTNESS);
    }

    #[test]
    fn bad_json_is_a_preset_error() {
        let err = ScopePreset::from_json(r#"{ "name": "x", "mode": "spiral", "parameters": {} }"#).unwrap_err();
        assert!(matches!(err, VisualizerError::Preset(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("ringscope-preset-{}.json", std::process::id()));
        let preset = PresetManager::new().get("line").unwrap().clone();
        std::fs::write(&path, serde_json::to_string_pretty(&preset).unwrap()).unwrap();

        let loaded = ScopePreset::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, preset);
    }
}
