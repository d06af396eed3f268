//! ffmpeg argument construction.

use super::preset::{scale_target, AudioQuality};
use super::{Job, SimpleOptions};

/// Global flags used when a job carries none of its own.
pub const DEFAULT_GLOBAL_ARGS: &str = "-y -hide_banner";

/// Device initialised when hardware acceleration is requested without an explicit device.
pub const DEFAULT_HW_DEVICE: &str = "vaapi=va:/dev/dri/renderD128";

/// Argument groups derived from [`SimpleOptions`], each whitespace-delimited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedArguments {
    pub global: String,
    pub input: String,
    pub output: String,
}

/// Translate simple options into global, input and output argument groups.
///
/// Timestamps and scale targets are single argv tokens, so any whitespace a
/// submitter put inside them is dropped before they are joined.
pub fn derive_arguments(opts: &SimpleOptions) -> DerivedArguments {
    let trim_from = single_token(&opts.trim_from);
    let trim_duration = single_token(&opts.trim_duration);

    let mut input = Vec::new();
    if !trim_from.is_empty() {
        input.extend(["-ss".to_string(), trim_from]);
        if !trim_duration.is_empty() {
            input.extend(["-t".to_string(), trim_duration]);
        }
    }

    let mut output = opts.quality_preset.video_args(opts.use_hardware_acceleration);

    let resolution = single_token(&opts.resolution);
    if !resolution.is_empty()
        && !resolution.eq_ignore_ascii_case("original")
        && !opts.keep_original_resolution
    {
        output.extend(["-vf".to_string(), format!("scale={}", scale_target(&resolution))]);
    }

    output.extend(AudioQuality::parse(&opts.audio_quality).audio_args());

    DerivedArguments {
        global: DEFAULT_GLOBAL_ARGS.to_string(),
        input: input.join(" "),
        output: output.join(" "),
    }
}

fn single_token(value: &str) -> String {
    value.split_ascii_whitespace().collect()
}

fn split_args(args: &str) -> impl Iterator<Item = String> + '_ {
    args.split_ascii_whitespace().map(str::to_string)
}

impl Job {
    /// Build the full ffmpeg argument vector for this job.
    ///
    /// Order is fixed: device init, global flags, input flags, `-i <input>`,
    /// output flags, output path.
    pub fn build_command(&self) -> Vec<String> {
        let mut args = Vec::new();

        if !self.hardware_device.is_empty() {
            args.extend(["-init_hw_device".to_string(), self.hardware_device.clone()]);
        } else if self.wants_hardware_acceleration() {
            args.extend(["-init_hw_device".to_string(), DEFAULT_HW_DEVICE.to_string()]);
        }

        // Raw argument groups win over simple options once either is present.
        let derived = match &self.simple_options {
            Some(opts) if !self.is_advanced_mode() => Some(derive_arguments(opts)),
            _ => None,
        };

        match &derived {
            Some(d) => args.extend(split_args(&d.global)),
            None if !self.global_arguments.is_empty() => {
                args.extend(split_args(&self.global_arguments))
            }
            None => args.extend(split_args(DEFAULT_GLOBAL_ARGS)),
        }

        match &derived {
            Some(d) => args.extend(split_args(&d.input)),
            None => args.extend(split_args(&self.input_arguments)),
        }

        args.extend(["-i".to_string(), self.input_file_path.clone()]);

        match &derived {
            Some(d) => args.extend(split_args(&d.output)),
            None => args.extend(split_args(&self.output_arguments)),
        }

        args.push(self.output_file_path.clone());
        args
    }

    /// Render the command line for display (dry runs, logs, the CLI).
    pub fn command_line(&self, program: &str) -> String {
        let mut line = program.to_string();
        for arg in self.build_command() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}
