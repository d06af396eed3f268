//! Quality presets, audio tiers and resolution targets.
//!
//! These are the lookup tables behind the simple-options mode. Every lookup
//! is total: unknown input degrades to a default instead of failing.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Hardware AV1 encoder (Intel Quick Sync).
pub const HW_VIDEO_ENCODER: &str = "av1_qsv";

/// Software AV1 encoder.
pub const SW_VIDEO_ENCODER: &str = "libaom-av1";

/// Audio encoder used for every simple-mode job.
pub const AUDIO_ENCODER: &str = "libopus";

/// Encoding speed / quality trade-off chosen by the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    UltraFast,
    Fast,
    #[default]
    Balanced,
    Quality,
    Slow,
    UltraSlow,
}

impl QualityPreset {
    /// All presets, fastest first.
    pub const ALL: [QualityPreset; 6] = [
        QualityPreset::UltraFast,
        QualityPreset::Fast,
        QualityPreset::Balanced,
        QualityPreset::Quality,
        QualityPreset::Slow,
        QualityPreset::UltraSlow,
    ];

    /// Parse a preset name. Unknown or empty names resolve to [`QualityPreset::Balanced`].
    pub fn parse(name: &str) -> Self {
        Self::try_parse(name).unwrap_or_default()
    }

    /// Parse a preset name, returning `None` when it is not recognised.
    pub fn try_parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ultrafast" => Some(Self::UltraFast),
            "fast" => Some(Self::Fast),
            "balanced" => Some(Self::Balanced),
            "quality" => Some(Self::Quality),
            "slow" => Some(Self::Slow),
            "ultraslow" => Some(Self::UltraSlow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltraFast => "ultrafast",
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Quality => "quality",
            Self::Slow => "slow",
            Self::UltraSlow => "ultraslow",
        }
    }

    /// Short human-readable description shown in logs and the CLI.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UltraFast => "Maximum speed, lower quality (good for testing)",
            Self::Fast => "Fast encoding with good quality",
            Self::Balanced => "Balanced speed and quality (recommended)",
            Self::Quality => "High quality, slower encoding",
            Self::Slow => "Very high quality, slow encoding",
            Self::UltraSlow => "Maximum quality, extremely slow encoding",
        }
    }

    /// Encoder flags for this preset, without the leading `-c:v <encoder>`.
    fn encoder_flags(&self, hardware: bool) -> &'static [&'static str] {
        if hardware {
            match self {
                Self::UltraFast => &["-preset", "veryfast", "-look_ahead_depth", "10"],
                Self::Fast => &["-preset", "faster", "-look_ahead_depth", "20"],
                Self::Balanced => &["-preset", "slow", "-look_ahead_depth", "30"],
                Self::Quality => &["-preset", "slow", "-look_ahead_depth", "40"],
                Self::Slow => &["-preset", "slower", "-look_ahead_depth", "60"],
                Self::UltraSlow => &["-preset", "veryslow", "-look_ahead_depth", "120"],
            }
        } else {
            match self {
                Self::UltraFast => &["-crf", "35", "-b:v", "0", "-cpu-used", "8", "-row-mt", "1"],
                Self::Fast => &["-crf", "30", "-b:v", "0", "-cpu-used", "6", "-row-mt", "1"],
                Self::Balanced => &["-crf", "30", "-b:v", "0", "-cpu-used", "4", "-row-mt", "1"],
                Self::Quality => &["-crf", "30", "-b:v", "0", "-cpu-used", "2", "-row-mt", "1"],
                Self::Slow => &["-crf", "30", "-b:v", "0", "-cpu-used", "1", "-row-mt", "1"],
                Self::UltraSlow => &[
                    "-crf", "30", "-b:v", "0", "-cpu-used", "0", "-row-mt", "1", "-tiles", "2x2",
                ],
            }
        }
    }

    /// Full video codec arguments for this preset.
    pub fn video_args(&self, hardware: bool) -> Vec<String> {
        let encoder = if hardware {
            HW_VIDEO_ENCODER
        } else {
            SW_VIDEO_ENCODER
        };

        let mut args = vec!["-c:v".to_string(), encoder.to_string()];
        args.extend(self.encoder_flags(hardware).iter().map(|s| s.to_string()));
        args
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QualityPreset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

/// Whether `name` is one of the recognised preset names.
pub fn is_valid_preset(name: &str) -> bool {
    QualityPreset::try_parse(name).is_some()
}

/// Description for a preset given by name, or `"Unknown preset"`.
pub fn preset_description(name: &str) -> &'static str {
    QualityPreset::try_parse(name)
        .map(|p| p.description())
        .unwrap_or("Unknown preset")
}

/// Video codec arguments for a preset given by name.
///
/// Unrecognised names produce the same arguments as `balanced`.
pub fn preset_args(name: &str, hardware: bool) -> Vec<String> {
    QualityPreset::parse(name).video_args(hardware)
}

/// Audio bitrate tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl AudioQuality {
    /// Parse a tier name; anything other than `low`/`high` is medium.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn bitrate(&self) -> &'static str {
        match self {
            Self::Low => "64k",
            Self::Medium => "128k",
            Self::High => "256k",
        }
    }

    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            AUDIO_ENCODER.to_string(),
            "-b:a".to_string(),
            self.bitrate().to_string(),
        ]
    }
}

/// Resolve a resolution label to an ffmpeg `scale` target.
///
/// Named resolutions map to fixed dimensions; anything else is passed
/// through verbatim so callers can supply `w:h` or an expression.
pub fn scale_target(resolution: &str) -> String {
    match resolution.trim().to_ascii_lowercase().as_str() {
        "480p" => "854:480".to_string(),
        "720p" => "1280:720".to_string(),
        "1080p" => "1920:1080".to_string(),
        "4k" | "2160p" => "3840:2160".to_string(),
        _ => resolution.to_string(),
    }
}
