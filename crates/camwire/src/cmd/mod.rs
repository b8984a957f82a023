use std::path::PathBuf;
use std::time::Duration;

use camwire_client::{
    CameraConfig, SensorSettings, Setting, DEFAULT_COMMAND_PORT, DEFAULT_HOST, DEFAULT_IMAGE_PORT,
};
use clap::{Args, Subcommand};

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod fov;
pub mod gain;
pub mod get;
pub mod probe;
pub mod set;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream frames and print one line per frame.
    Stream(StreamArgs),
    /// Read a setting, or `all` of them.
    Get(GetArgs),
    /// Write a setting.
    Set(SetArgs),
    /// Show or set the sensor readout window.
    Fov(FovArgs),
    /// Show or set the per-channel digital gain.
    DigitalGain(GainArgs),
    /// Check that both camera ports answer.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, camera: &CameraArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, camera.to_config()?, format),
        Command::Get(args) => get::run(args, camera.to_config()?, format),
        Command::Set(args) => set::run(args, camera.to_config()?, format),
        Command::Fov(args) => fov::run(args, camera.to_config()?, format),
        Command::DigitalGain(args) => gain::run(args, camera.to_config()?, format),
        Command::Probe(args) => probe::run(args, camera.to_config()?, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the camera is. Accepted before or after the subcommand.
#[derive(Args, Debug, Clone)]
pub struct CameraArgs {
    /// Camera host name or address.
    #[arg(long, env = "CAMWIRE_HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,
    /// Image stream port.
    #[arg(long, env = "CAMWIRE_IMAGE_PORT", default_value_t = DEFAULT_IMAGE_PORT, global = true)]
    pub image_port: u16,
    /// Command port.
    #[arg(long, env = "CAMWIRE_COMMAND_PORT", default_value_t = DEFAULT_COMMAND_PORT, global = true)]
    pub command_port: u16,
    /// Connection timeout (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s", global = true)]
    pub connect_timeout: String,
}

impl CameraArgs {
    pub fn to_config(&self) -> CliResult<CameraConfig> {
        let timeout = parse_timeout(&self.connect_timeout)?;
        let mut config = CameraConfig {
            image_port: self.image_port,
            command_port: self.command_port,
            ..CameraConfig::new(self.host.clone())
        };
        config.image.connect_timeout = Some(timeout);
        config.command.connect_timeout = Some(timeout);
        Ok(config)
    }
}

/// Settings facade for the configured camera.
pub fn open_settings(config: &CameraConfig) -> SensorSettings {
    SensorSettings::new(config.command_addr(), config.command.clone())
}

pub fn parse_setting(name: &str) -> CliResult<Setting> {
    name.parse::<Setting>()
        .map_err(|err| client_error("invalid setting", err))
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Write each frame payload to this directory.
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Setting name (e.g. exp-time, DGAIN_GR) or `all`.
    pub setting: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Setting name (e.g. exp-time, DGAIN_GR).
    pub setting: String,
    /// New value, parsed by the setting's wire type.
    #[arg(allow_hyphen_values = true)]
    pub value: String,
    /// Leave the change pending instead of committing it.
    #[arg(long)]
    pub no_commit: bool,
}

#[derive(Args, Debug)]
pub struct FovArgs {
    /// Set the window before reading it back.
    #[arg(long, num_args = 4, value_names = ["X", "Y", "W", "H"], allow_negative_numbers = true)]
    pub set: Option<Vec<i32>>,
    /// Leave the change pending instead of committing it.
    #[arg(long, requires = "set")]
    pub no_commit: bool,
}

#[derive(Args, Debug)]
pub struct GainArgs {
    /// Set the gains before reading them back.
    #[arg(long, num_args = 4, value_names = ["GR", "GB", "R", "B"])]
    pub set: Option<Vec<f32>>,
    /// Leave the change pending instead of committing it.
    #[arg(long, requires = "set")]
    pub no_commit: bool,
}

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_args(timeout: &str) -> CameraArgs {
        CameraArgs {
            host: "cam.local".to_string(),
            image_port: 7000,
            command_port: 7001,
            connect_timeout: timeout.to_string(),
        }
    }

    #[test]
    fn parse_timeout_units() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_timeout_invalid() {
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("bad").is_err());
        assert!(parse_timeout(" ").is_err());
    }

    #[test]
    fn camera_args_fill_config() {
        let config = camera_args("500ms").to_config().unwrap();
        assert_eq!(config.image_addr(), "cam.local:7000");
        assert_eq!(config.command_addr(), "cam.local:7001");
        assert_eq!(config.image.connect_timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.command.connect_timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn unknown_setting_is_usage_error() {
        let err = parse_setting("zoom").unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
