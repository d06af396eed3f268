//! Default work function: run ffmpeg with the job's argument vector.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use transcodeflow_core::Job;

use super::work::{ExecutionError, WorkFunction};
use crate::config::WorkerConfig;

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    hardware_device: Option<String>,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            hardware_device: None,
        }
    }

    /// Device applied to jobs that do not name one.
    pub fn with_hardware_device(mut self, device: impl Into<String>) -> Self {
        self.hardware_device = Some(device.into()).filter(|d| !d.is_empty());
        self
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        let transcoder = Self::new(&config.ffmpeg_path);
        match &config.hardware_device {
            Some(device) => transcoder.with_hardware_device(device.clone()),
            None => transcoder,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn prepare(&self, mut job: Job) -> Job {
        if job.hardware_device.is_empty() {
            if let Some(device) = &self.hardware_device {
                job.hardware_device = device.clone();
            }
        }
        job
    }

    /// The command line this transcoder would run for `job`.
    pub fn command_line(&self, job: Job) -> String {
        self.prepare(job).command_line(&self.program.to_string_lossy())
    }
}

#[async_trait]
impl WorkFunction for FfmpegTranscoder {
    async fn execute(&self, job: Job) -> Result<String, ExecutionError> {
        let job = self.prepare(job);
        let program = self.program.to_string_lossy().to_string();

        if job.is_dry_run() {
            let line = job.command_line(&program);
            tracing::info!(command = %line, "Dry run, not executing");
            return Ok(line);
        }

        let args = job.build_command();
        tracing::debug!(program = %program, args = ?args, "Running transcoder");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExecutionError::Launch {
                program: program.clone(),
                source,
            })?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(captured)
        } else {
            Err(ExecutionError::Exit {
                program,
                status: output.status.to_string(),
                output: captured,
            })
        }
    }
}
