use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Visual and tempo parameters for a level, as produced by the external theme
/// generator. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelTheme {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Tempo in beats per minute.
    pub bpm: f64,
    pub colors: Palette,
    pub building_shape: BuildingShape,
    pub block_shape: BlockShape,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
}

fn default_difficulty() -> u8 {
    3
}

impl Default for LevelTheme {
    fn default() -> Self {
        Self {
            name: "Neon Genesis".to_string(),
            description: "A classic cyberpunk starter theme.".to_string(),
            bpm: 120.0,
            colors: Palette {
                primary: "#00ffcc".to_string(),
                secondary: "#ff00ff".to_string(),
                accent: "#ffff00".to_string(),
                background: "#050510".to_string(),
            },
            building_shape: BuildingShape::Spiral,
            block_shape: BlockShape::Box,
            difficulty: default_difficulty(),
        }
    }
}

impl LevelTheme {
    /// Parses a theme from JSON and validates it. Missing or malformed fields
    /// are reported instead of being replaced by defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let theme: Self = serde_json::from_str(text)?;
        theme.validate()?;
        Ok(theme)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(EngineError::theme(
                "bpm",
                format!("tempo must be a positive number, got {}", self.bpm),
            ));
        }
        self.colors.validate()
    }

    /// Duration of one eighth note at this theme's tempo.
    pub fn seconds_per_eighth(&self) -> f64 {
        crate::beat::seconds_per_eighth(self.bpm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
}

impl Palette {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("colors.primary", &self.primary),
            ("colors.secondary", &self.secondary),
            ("colors.accent", &self.accent),
            ("colors.background", &self.background),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(EngineError::theme(field, "palette entry is empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingShape {
    Tower,
    Bridge,
    Spiral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockShape {
    Box,
    Cylinder,
    Dodecahedron,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNTHWAVE: &str = r##"{
        "name": "Night Drive",
        "bpm": 96,
        "colors": {
            "primary": "#ff2d95",
            "secondary": "#2de2e6",
            "accent": "#f6019d",
            "background": "#0d0221"
        },
        "buildingShape": "tower",
        "blockShape": "cylinder"
    }"##;

    #[test]
    fn parses_generator_output() {
        let theme = LevelTheme::from_json(SYNTHWAVE).unwrap();
        assert_eq!(theme.bpm, 96.0);
        assert_eq!(theme.building_shape, BuildingShape::Tower);
        assert_eq!(theme.block_shape, BlockShape::Cylinder);
        assert_eq!(theme.difficulty, 3);
        assert!(theme.description.is_empty());
    }

    #[test]
    fn rejects_non_positive_tempo() {
        let text = SYNTHWAVE.replace("\"bpm\": 96", "\"bpm\": 0");
        let err = LevelTheme::from_json(&text).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTheme { field: "bpm", .. }));
    }

    #[test]
    fn rejects_missing_palette() {
        let text = r#"{ "name": "x", "bpm": 120, "buildingShape": "spiral", "blockShape": "box" }"#;
        assert!(matches!(LevelTheme::from_json(text), Err(EngineError::Json(_))));
    }

    #[test]
    fn rejects_blank_palette_entry() {
        let mut theme = LevelTheme::default();
        theme.colors.accent = "  ".to_string();
        let err = theme.validate().unwrap_err();
        assert!(err.to_string().contains("colors.accent"));
    }

    #[test]
    fn default_theme_runs_eighths_at_quarter_second() {
        let theme = LevelTheme::default();
        assert!(theme.validate().is_ok());
        assert_eq!(theme.seconds_per_eighth(), 0.25);
    }
}
