//! Transcoding job model.
//!
//! A [`Job`] names an input and an output file and describes how to encode
//! it, either through [`SimpleOptions`] (a preset-driven option set) or
//! through raw ffmpeg argument groups ("advanced mode").
//!
//! Simple options are translated into the three argument groups exactly once,
//! when the job is deserialized. The translated job serializes with its
//! argument groups filled in, so decoding it again is a no-op.

mod command;
mod preset;

pub use command::{derive_arguments, DerivedArguments, DEFAULT_GLOBAL_ARGS, DEFAULT_HW_DEVICE};
pub use preset::{
    is_valid_preset, preset_args, preset_description, scale_target, AudioQuality, QualityPreset,
    AUDIO_ENCODER, HW_VIDEO_ENCODER, SW_VIDEO_ENCODER,
};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// User-friendly encoding options, translated into ffmpeg arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleOptions {
    pub quality_preset: QualityPreset,
    /// Target resolution (`480p`, `720p`, `1080p`, `4k`, `original`, or a raw scale target).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resolution: String,
    pub keep_original_resolution: bool,
    pub use_hardware_acceleration: bool,
    /// Seek position, in any format ffmpeg accepts for `-ss`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trim_from: String,
    /// Duration to keep after `trim_from`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trim_duration: String,
    /// `low`, `medium` or `high`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub audio_quality: String,
}

/// A single transcoding request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JobPayload")]
pub struct Job {
    pub input_file_path: String,
    pub output_file_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub input_container_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_container_type: String,
    /// `"true"` (any case) marks a dry run.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dry_run: String,
    /// ffmpeg `-init_hw_device` spec. Owned by the worker tier.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hardware_device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simple_options: Option<SimpleOptions>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub global_arguments: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub input_arguments: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_arguments: String,
}

/// Wire form of a [`Job`] before simple options are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobPayload {
    input_file_path: String,
    output_file_path: String,
    input_container_type: String,
    output_container_type: String,
    #[serde(deserialize_with = "string_or_bool")]
    dry_run: String,
    hardware_device: String,
    simple_options: Option<SimpleOptions>,
    global_arguments: String,
    input_arguments: String,
    output_arguments: String,
}

impl From<JobPayload> for Job {
    fn from(payload: JobPayload) -> Self {
        let mut job = Job {
            input_file_path: payload.input_file_path,
            output_file_path: payload.output_file_path,
            input_container_type: payload.input_container_type,
            output_container_type: payload.output_container_type,
            dry_run: payload.dry_run,
            hardware_device: payload.hardware_device,
            simple_options: payload.simple_options,
            global_arguments: payload.global_arguments,
            input_arguments: payload.input_arguments,
            output_arguments: payload.output_arguments,
        };

        if job.simple_options.is_some() && !job.is_advanced_mode() {
            job.apply_simple_options();
        }

        job
    }
}

/// Accept `"dry_run": true` as well as the string form.
fn string_or_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Bool(bool),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Text(s)) => s,
        Some(Flag::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}

impl Job {
    /// Create a job with only the required paths set.
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input_file_path: input.into(),
            output_file_path: output.into(),
            ..Default::default()
        }
    }

    /// Decode a job from JSON, applying simple-option derivation.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check that both file paths are present.
    pub fn validate(&self) -> Result<()> {
        if self.input_file_path.is_empty() {
            return Err(Error::MissingField("input_file_path"));
        }
        if self.output_file_path.is_empty() {
            return Err(Error::MissingField("output_file_path"));
        }
        Ok(())
    }

    /// True iff any raw argument group is set.
    pub fn is_advanced_mode(&self) -> bool {
        !self.global_arguments.is_empty()
            || !self.input_arguments.is_empty()
            || !self.output_arguments.is_empty()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.eq_ignore_ascii_case("true")
    }

    /// Whether simple options ask for hardware encoding.
    pub fn wants_hardware_acceleration(&self) -> bool {
        self.simple_options
            .as_ref()
            .is_some_and(|opts| opts.use_hardware_acceleration)
    }

    /// Fill the argument groups from `simple_options`.
    ///
    /// Does nothing when there are no simple options.
    pub fn apply_simple_options(&mut self) {
        if let Some(opts) = &self.simple_options {
            let derived = derive_arguments(opts);
            self.global_arguments = derived.global;
            self.input_arguments = derived.input;
            self.output_arguments = derived.output;
        }
    }

    /// Structured view of the job for submission logging.
    pub fn summary(&self) -> JobSummary<'_> {
        let opts = self.simple_options.as_ref();
        JobSummary {
            advanced: self.is_advanced_mode() && opts.is_none(),
            dry_run: self.is_dry_run(),
            preset: opts.map(|o| o.quality_preset).unwrap_or_default(),
            hardware_acceleration: opts.is_some_and(|o| o.use_hardware_acceleration),
            audio_quality: opts
                .map(|o| AudioQuality::parse(&o.audio_quality))
                .unwrap_or_default(),
            resolution: opts.map(|o| o.resolution.as_str()).unwrap_or(""),
            keep_original_resolution: opts.is_some_and(|o| o.keep_original_resolution),
            has_global_args: !self.global_arguments.is_empty(),
            has_input_args: !self.input_arguments.is_empty(),
            has_output_args: !self.output_arguments.is_empty(),
        }
    }
}

/// Loggable summary of a job, see [`Job::summary`].
#[derive(Debug, Clone, Copy)]
pub struct JobSummary<'a> {
    /// Submitted with raw arguments rather than simple options.
    pub advanced: bool,
    pub dry_run: bool,
    pub preset: QualityPreset,
    pub hardware_acceleration: bool,
    pub audio_quality: AudioQuality,
    pub resolution: &'a str,
    pub keep_original_resolution: bool,
    pub has_global_args: bool,
    pub has_input_args: bool,
    pub has_output_args: bool,
}
