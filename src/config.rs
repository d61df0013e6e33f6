// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline configuration
//!
//! A [`Config`] is built once when the pipeline starts and handed to the
//! decode worker and capture coordinator. Nothing reads configuration after
//! that point, so changes only take effect for the next session.

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Named option keys accepted by [`Config::from_options`]
pub mod keys {
    pub const DECODE_QR: &str = "preferences_decode_QR";
    pub const DECODE_DATA_MATRIX: &str = "preferences_decode_Data_Matrix";
    pub const DECODE_AZTEC: &str = "preferences_decode_Aztec";
    pub const DECODE_PDF417: &str = "preferences_decode_PDF417";
    pub const PLAY_BEEP: &str = "preferences_play_beep";
    pub const VIBRATE: &str = "preferences_vibrate";
    pub const FRONT_LIGHT_MODE: &str = "preferences_front_light_mode";
    pub const AUTO_FOCUS: &str = "preferences_auto_focus";
    pub const INVERT_SCAN: &str = "preferences_invert_scan";
    pub const DISABLE_CONTINUOUS_FOCUS: &str = "preferences_disable_continuous_focus";
}

/// Torch behaviour when a session opens
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum FrontLightMode {
    /// Torch on for the whole session
    On,
    /// Torch off
    #[default]
    Off,
    /// Follow ambient light (no light sensor here, behaves like `Off`)
    Auto,
}

impl FrontLightMode {
    /// Parse the option string form (`"ON"`, `"OFF"`, `"AUTO"`, any case)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ON" => Some(Self::On),
            "OFF" => Some(Self::Off),
            "AUTO" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Two-dimensional symbologies the pipeline can be asked to decode
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum DecodeFormat {
    QrCode,
    DataMatrix,
    Aztec,
    Pdf417,
}

impl DecodeFormat {
    /// All formats for iteration
    pub const ALL: [DecodeFormat; 4] = [
        DecodeFormat::QrCode,
        DecodeFormat::DataMatrix,
        DecodeFormat::Aztec,
        DecodeFormat::Pdf417,
    ];

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            DecodeFormat::QrCode => "QR Code",
            DecodeFormat::DataMatrix => "Data Matrix",
            DecodeFormat::Aztec => "Aztec",
            DecodeFormat::Pdf417 => "PDF417",
        }
    }
}

impl std::fmt::Display for DecodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Decoder hints, fixed for the lifetime of a decode worker
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DecodeHints {
    /// Symbologies the decoder should look for
    pub formats: BTreeSet<DecodeFormat>,
    /// Character set used to interpret byte-mode payloads
    pub character_set: Option<String>,
}

impl DecodeHints {
    /// Check whether a format was requested
    pub fn allows(&self, format: DecodeFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// A value in the named option map
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Look for QR codes
    pub decode_qr: bool,
    /// Look for Data Matrix codes
    pub decode_data_matrix: bool,
    /// Look for Aztec codes
    pub decode_aztec: bool,
    /// Look for PDF417 codes
    pub decode_pdf417: bool,
    /// Beep when a code is read
    pub play_beep: bool,
    /// Vibrate when a code is read
    pub vibrate: bool,
    /// Torch behaviour
    pub front_light_mode: FrontLightMode,
    /// Run the periodic auto-focus manager while previewing
    pub auto_focus: bool,
    /// Invert luminance before decoding (light codes on dark backgrounds)
    pub invert_scan: bool,
    /// Prefer single auto-focus cycles over continuous focus modes
    pub disable_continuous_focus: bool,
    /// Character set hint passed to the decoder
    pub character_set: Option<String>,
    /// Delay used by consumers that restart preview automatically
    pub restart_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decode_qr: true,
            decode_data_matrix: true,
            decode_aztec: false,
            decode_pdf417: false,
            play_beep: true,
            vibrate: false,
            front_light_mode: FrontLightMode::Off,
            auto_focus: true,
            invert_scan: false,
            disable_continuous_focus: false,
            character_set: None,
            restart_delay_ms: crate::constants::timing::DEFAULT_RESTART_DELAY_MS,
        }
    }
}

impl Config {
    /// Build a config from the named option map
    ///
    /// Missing keys and values of the wrong type keep their defaults.
    /// Unknown keys are ignored.
    pub fn from_options(options: &HashMap<String, OptionValue>) -> Self {
        let defaults = Self::default();

        let get_bool = |key: &str, default: bool| match options.get(key) {
            Some(OptionValue::Bool(value)) => *value,
            Some(other) => {
                debug!(key, value = ?other, "Ignoring non-boolean option");
                default
            }
            None => default,
        };

        let front_light_mode = match options.get(keys::FRONT_LIGHT_MODE) {
            Some(OptionValue::Str(value)) => {
                FrontLightMode::parse(value).unwrap_or(defaults.front_light_mode)
            }
            _ => defaults.front_light_mode,
        };

        Self {
            decode_qr: get_bool(keys::DECODE_QR, defaults.decode_qr),
            decode_data_matrix: get_bool(keys::DECODE_DATA_MATRIX, defaults.decode_data_matrix),
            decode_aztec: get_bool(keys::DECODE_AZTEC, defaults.decode_aztec),
            decode_pdf417: get_bool(keys::DECODE_PDF417, defaults.decode_pdf417),
            play_beep: get_bool(keys::PLAY_BEEP, defaults.play_beep),
            vibrate: get_bool(keys::VIBRATE, defaults.vibrate),
            front_light_mode,
            auto_focus: get_bool(keys::AUTO_FOCUS, defaults.auto_focus),
            invert_scan: get_bool(keys::INVERT_SCAN, defaults.invert_scan),
            disable_continuous_focus: get_bool(
                keys::DISABLE_CONTINUOUS_FOCUS,
                defaults.disable_continuous_focus,
            ),
            ..defaults
        }
    }

    /// Default config file location (`<config dir>/qrcapture/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qrcapture").join("config.json"))
    }

    /// Load a config from a JSON file
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("{}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Self::default(),
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Formats enabled by the toggles
    pub fn enabled_formats(&self) -> BTreeSet<DecodeFormat> {
        DecodeFormat::ALL
            .into_iter()
            .filter(|format| match format {
                DecodeFormat::QrCode => self.decode_qr,
                DecodeFormat::DataMatrix => self.decode_data_matrix,
                DecodeFormat::Aztec => self.decode_aztec,
                DecodeFormat::Pdf417 => self.decode_pdf417,
            })
            .collect()
    }

    /// Build the decoder hints for a new worker
    ///
    /// An explicit, non-empty `requested` set wins over the toggles.
    pub fn decode_hints(&self, requested: Option<&[DecodeFormat]>) -> DecodeHints {
        let formats = match requested {
            Some(formats) if !formats.is_empty() => formats.iter().copied().collect(),
            _ => self.enabled_formats(),
        };

        DecodeHints {
            formats,
            character_set: self.character_set.clone(),
        }
    }

    /// Whether the torch should be switched on when a session opens
    pub fn torch_on_open(&self) -> bool {
        match self.front_light_mode {
            FrontLightMode::On => true,
            FrontLightMode::Off => false,
            FrontLightMode::Auto => {
                info!("Automatic front light needs a light sensor, keeping torch off");
                false
            }
        }
    }
}
