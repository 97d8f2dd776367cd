use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for quizdocx
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package reading
    pub extraction: ExtractionConfig,
    /// Legacy formula rasterization and OCR
    pub legacy: LegacyConfig,
    /// Word export
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Paragraphs containing any of these are treated as header noise
    pub noise_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Rasterization density (DPI)
    pub density: u32,
    /// Gray level at or above which a pixel counts as background
    pub white_threshold: u8,
    /// Margin kept around the ink when the bitmap goes to OCR
    pub ocr_padding: u32,
    /// Margin kept around the ink when the bitmap stays an image
    pub image_padding: u32,
    pub contrast: f32,
    pub sharpness: f32,

    /// Timeouts (seconds)
    pub raster_timeout_secs: u64,
    pub office_timeout_secs: u64,
    pub wmf2eps_timeout_secs: u64,
    pub eps_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub ocr_timeout_secs: u64,

    /// OCR command; `{input}` is replaced by the prepared image path
    pub ocr_command: String,
    /// Smallest side of a bitmap handed to OCR
    pub ocr_min_dimension: u32,
    /// White border added around a bitmap handed to OCR
    pub ocr_border: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub font: String,
    pub font_size_pt: u32,
    /// Render width of images that carry no stored width
    pub default_image_width_cm: f64,
    pub max_image_width_cm: f64,
    pub fetch_timeout_secs: u64,
    /// Background of answer/analysis sections in teacher mode
    pub shading_fill: String,
    pub user_agent: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            noise_patterns: ["2026年", "学校:", "学校：", "姓名:", "姓名："]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for LegacyConfig {
    fn default() -> Self {
        LegacyConfig {
            density: 300,
            white_threshold: 248,
            ocr_padding: 20,
            image_padding: 5,
            contrast: 1.4,
            sharpness: 1.8,

            raster_timeout_secs: 60,
            office_timeout_secs: 60,
            wmf2eps_timeout_secs: 15,
            eps_timeout_secs: 30,
            probe_timeout_secs: 10,
            ocr_timeout_secs: 120,

            ocr_command: "pix2tex {input}".to_string(),
            ocr_min_dimension: 80,
            ocr_border: 25,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            font: "方正仿宋".to_string(),
            font_size_pt: 12,
            default_image_width_cm: 4.0,
            max_image_width_cm: 16.0,
            fetch_timeout_secs: 15,
            shading_fill: "F2F2F2".to_string(), // Light Gray
            user_agent: concat!("quizdocx/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load configuration from config directory
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::get_config_path() {
            if config_path.exists() {
                let content = fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&content)?;
                log::debug!("Loaded configuration from {}", config_path.display());
                return Ok(config);
            }
        }

        // Return default configuration if no config found
        Ok(Config::default())
    }

    /// Save configuration to config directory
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::get_config_path() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = toml::to_string_pretty(self)?;
            fs::write(&config_path, content)?;
        }

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quizdocx").join("config.toml"))
    }

    /// Initialize default config file
    pub fn init_default() -> Result<()> {
        let config = Config::default();
        config.save()?;
        Ok(())
    }
}

impl ExportConfig {
    /// Font size in the half-points used by `w:sz`
    pub fn font_half_points(&self) -> u32 {
        self.font_size_pt * 2
    }

    /// Shading fill as a bare `RRGGBB` value, falling back to light gray
    pub fn shading_hex(&self) -> String {
        hex_color(&self.shading_fill).unwrap_or_else(|| "F2F2F2".to_string())
    }
}

/// Normalize a hex color string to `RRGGBB`
pub fn hex_color(hex: &str) -> Option<String> {
    // Remove # if present
    let hex = hex.trim().trim_start_matches('#');

    // Support both 6-character (RGB) and 8-character (RGBA) hex codes
    // For RGBA, A is ignored
    match hex.len() {
        6 | 8 if hex.chars().all(|c| c.is_ascii_hexdigit()) => Some(hex[0..6].to_uppercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str("[legacy]\ndensity = 150\n").unwrap();
        assert_eq!(config.legacy.density, 150);
        assert_eq!(config.legacy.white_threshold, 248);
        assert_eq!(config.export.font, "方正仿宋");
        assert!(config.extraction.noise_patterns.contains(&"姓名：".to_string()));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.legacy.ocr_command, "pix2tex {input}");
        assert_eq!(parsed.export.max_image_width_cm, 16.0);
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#f2f2f2"), Some("F2F2F2".to_string()));
        assert_eq!(hex_color("F2F2F2FF"), Some("F2F2F2".to_string()));
        assert_eq!(hex_color("gray"), None);
    }
}
