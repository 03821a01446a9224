use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use revfeed::demux::{DemuxConfig, DEFAULT_QUEUE_CAPACITY};
use revfeed::frame::FrameConfig;
use revfeed::SessionConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod replay;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a data server, score its revisions and send the results back.
    Run(RunArgs),
    /// Score a recorded frame stream from disk.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Data server address (host:port).
    #[arg(short = 'd', long = "input", alias = "data-server", value_name = "ADDR")]
    pub data_server: String,
    /// Authentication token.
    #[arg(
        short = 'a',
        long = "auth",
        alias = "auth-token",
        value_name = "TOKEN",
        env = "REVFEED_AUTH_TOKEN",
        hide_env_values = true
    )]
    pub auth_token: String,
    /// Give up when the server sends nothing for this long (e.g. 30s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub read_timeout: Option<String>,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Recorded frame stream.
    pub path: PathBuf,
    /// Write result rows to this file instead of stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct TuningArgs {
    /// Metadata records buffered ahead of revision processing.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    /// Revision channel buffer size (e.g. 32MiB, 512KiB).
    #[arg(long, default_value = "32MiB")]
    pub revision_buffer: String,
    /// Largest accepted frame payload. Default: the revision buffer size.
    #[arg(long, value_name = "SIZE")]
    pub max_frame_size: Option<String>,
    /// Interval between progress log lines (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub progress_interval: String,
}

impl TuningArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        if self.queue_capacity == 0 {
            return Err(CliError::new(USAGE, "queue capacity must be greater than zero"));
        }
        let revision_buffer = parse_size(&self.revision_buffer)?;
        let max_payload_size = match &self.max_frame_size {
            Some(size) => parse_size(size)?,
            None => revision_buffer,
        };

        Ok(SessionConfig {
            frame: FrameConfig { max_payload_size },
            demux: DemuxConfig {
                queue_capacity: self.queue_capacity,
                revision_buffer,
            },
            progress_interval: parse_duration(&self.progress_interval)?,
        })
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse a byte size with an optional binary unit (`B`, `KiB`, `MiB`, `GiB`).
pub fn parse_size(input: &str) -> CliResult<usize> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let multiplier: usize = match unit.trim() {
        "" | "B" => 1,
        "KiB" => 1024,
        "MiB" => 1024 * 1024,
        "GiB" => 1024 * 1024 * 1024,
        other => {
            return Err(CliError::new(
                USAGE,
                format!("unsupported size unit {other:?} (use B, KiB, MiB or GiB)"),
            ))
        }
    };
    let value: usize = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid size value: {input:?}")))?;

    match value.checked_mul(multiplier) {
        Some(0) => Err(CliError::new(USAGE, "size must be greater than zero")),
        Some(size) => Ok(size),
        None => Err(CliError::new(USAGE, format!("size too large: {input}"))),
    }
}
