//! Player settings and preferences
//!
//! Stored inside the persisted profile (see [`crate::persistence`]). Every
//! field has a default so older saves missing a field still load.

use serde::{Deserialize, Serialize};

use crate::persistence::PersistedData;

pub const MIN_TILT_SENSITIVITY: f32 = 0.5;
pub const MAX_TILT_SENSITIVITY: f32 = 2.0;

/// Color vision deficiency palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorblindMode {
    #[default]
    None,
    Protanopia,
    Deuteranopia,
    Tritanopia,
}

impl ColorblindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorblindMode::None => "none",
            ColorblindMode::Protanopia => "protanopia",
            ColorblindMode::Deuteranopia => "deuteranopia",
            ColorblindMode::Tritanopia => "tritanopia",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Some(ColorblindMode::None),
            "protanopia" => Some(ColorblindMode::Protanopia),
            "deuteranopia" => Some(ColorblindMode::Deuteranopia),
            "tritanopia" => Some(ColorblindMode::Tritanopia),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,

    // === Controls ===
    /// Device tilt gain (0.5 - 2.0)
    pub tilt_sensitivity: f32,
    pub invert_tilt_x: bool,
    pub invert_tilt_y: bool,

    // === Accessibility ===
    /// Reduced motion (minimize shake, flashes)
    pub reduced_motion: bool,
    pub high_contrast: bool,
    pub colorblind_mode: ColorblindMode,

    // === HUD ===
    #[serde(rename = "showFPS")]
    pub show_fps: bool,
    /// Live run telemetry overlay
    pub show_telemetry: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            music_volume: 0.7,
            sfx_volume: 0.8,

            tilt_sensitivity: 1.0,
            invert_tilt_x: false,
            invert_tilt_y: false,

            reduced_motion: false,
            high_contrast: false,
            colorblind_mode: ColorblindMode::None,

            show_fps: false,
            show_telemetry: false,
        }
    }
}

fn unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

impl Settings {
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = unit(volume, self.master_volume);
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = unit(volume, self.music_volume);
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = unit(volume, self.sfx_volume);
    }

    pub fn set_tilt_sensitivity(&mut self, sensitivity: f32) {
        if sensitivity.is_finite() {
            self.tilt_sensitivity = sensitivity.clamp(MIN_TILT_SENSITIVITY, MAX_TILT_SENSITIVITY);
        }
    }

    /// Effective music level after the master volume
    pub fn effective_music_volume(&self) -> f32 {
        self.master_volume * self.music_volume
    }

    pub fn effective_sfx_volume(&self) -> f32 {
        self.master_volume * self.sfx_volume
    }

    /// Pull hand-edited or stale values back into range
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        self.master_volume = unit(self.master_volume, defaults.master_volume);
        self.music_volume = unit(self.music_volume, defaults.music_volume);
        self.sfx_volume = unit(self.sfx_volume, defaults.sfx_volume);
        if !self.tilt_sensitivity.is_finite() {
            self.tilt_sensitivity = defaults.tilt_sensitivity;
        }
        self.tilt_sensitivity = self
            .tilt_sensitivity
            .clamp(MIN_TILT_SENSITIVITY, MAX_TILT_SENSITIVITY);
    }

    /// Load settings from the persisted profile
    pub fn load() -> Self {
        let mut settings = PersistedData::load().settings;
        settings.sanitize();
        settings
    }

    /// Save settings into the persisted profile
    pub fn save(&self) {
        let settings = self.clone();
        if let Err(err) = PersistedData::update(|data| data.settings = settings) {
            log::warn!("Failed to save settings: {err}");
        } else {
            log::info!("Settings saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.master_volume, 1.0);
        assert_eq!(settings.music_volume, 0.7);
        assert_eq!(settings.sfx_volume, 0.8);
        assert_eq!(settings.tilt_sensitivity, 1.0);
        assert_eq!(settings.colorblind_mode, ColorblindMode::None);
        assert!(!settings.show_fps);
    }

    #[test]
    fn test_setters_clamp() {
        let mut settings = Settings::default();
        settings.set_master_volume(1.5);
        settings.set_sfx_volume(-0.2);
        settings.set_music_volume(f32::NAN);
        settings.set_tilt_sensitivity(5.0);
        assert_eq!(settings.master_volume, 1.0);
        assert_eq!(settings.sfx_volume, 0.0);
        assert_eq!(settings.music_volume, 0.7);
        assert_eq!(settings.tilt_sensitivity, MAX_TILT_SENSITIVITY);
        settings.set_tilt_sensitivity(0.1);
        assert_eq!(settings.tilt_sensitivity, MIN_TILT_SENSITIVITY);
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["showFPS"], false);
        assert_eq!(json["tiltSensitivity"], 1.0);
        assert_eq!(json["colorblindMode"], "none");
        assert!(json.get("show_fps").is_none());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"masterVolume":0.25,"colorblindMode":"tritanopia"}"#).unwrap();
        assert_eq!(settings.master_volume, 0.25);
        assert_eq!(settings.colorblind_mode, ColorblindMode::Tritanopia);
        assert_eq!(settings.sfx_volume, 0.8);
    }

    #[test]
    fn test_sanitize() {
        let mut settings = Settings {
            master_volume: 3.0,
            tilt_sensitivity: f32::INFINITY,
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.master_volume, 1.0);
        assert_eq!(settings.tilt_sensitivity, 1.0);
    }

    #[test]
    fn test_colorblind_mode_names() {
        assert_eq!(ColorblindMode::from_str("Deuteranopia"), Some(ColorblindMode::Deuteranopia));
        assert_eq!(ColorblindMode::from_str("off"), Some(ColorblindMode::None));
        assert_eq!(ColorblindMode::from_str("sepia"), None);
        assert_eq!(ColorblindMode::Protanopia.as_str(), "protanopia");
    }

    #[test]
    fn test_save_then_load() {
        let mut settings = Settings::default();
        settings.invert_tilt_y = true;
        settings.set_master_volume(0.5);
        settings.save();
        assert_eq!(Settings::load(), settings);
    }
}
