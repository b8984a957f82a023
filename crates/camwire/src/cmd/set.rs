use camwire_client::CameraConfig;
use camwire_frame::Value;
use serde::Serialize;

use crate::cmd::{open_settings, parse_setting, SetArgs};
use crate::exit::{client_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct SetOutput {
    setting: camwire_client::Setting,
    value: Value,
    committed: bool,
}

pub fn run(args: SetArgs, config: CameraConfig, format: OutputFormat) -> CliResult<i32> {
    let setting = parse_setting(&args.setting)?;
    let value = Value::parse(setting.wire_type(), &args.value)
        .map_err(|err| frame_error(&format!("invalid value for {setting}"), err))?;
    let commit = !args.no_commit;

    let mut settings = open_settings(&config);
    settings
        .set(setting, value.clone(), commit)
        .map_err(|err| client_error(&format!("set {setting} failed"), err))?;

    let fields = [
        ("setting", setting.to_string()),
        ("value", value.to_string()),
        ("committed", commit.to_string()),
    ];
    let out = SetOutput {
        setting,
        value,
        committed: commit,
    };
    print_record(&out, &fields, format);
    Ok(SUCCESS)
}
