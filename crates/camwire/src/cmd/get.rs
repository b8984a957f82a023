use camwire_client::CameraConfig;

use crate::cmd::{open_settings, parse_setting, GetArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_settings, OutputFormat};

pub fn run(args: GetArgs, config: CameraConfig, format: OutputFormat) -> CliResult<i32> {
    let mut settings = open_settings(&config);

    let values = if args.setting.eq_ignore_ascii_case("all") {
        settings
            .snapshot()
            .map_err(|err| client_error("get failed", err))?
    } else {
        let setting = parse_setting(&args.setting)?;
        let value = settings
            .get(setting)
            .map_err(|err| client_error(&format!("get {setting} failed"), err))?;
        vec![(setting, value)]
    };

    print_settings(&values, format);
    Ok(SUCCESS)
}
