use camwire_client::CameraConfig;

use crate::cmd::{open_settings, GainArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: GainArgs, config: CameraConfig, format: OutputFormat) -> CliResult<i32> {
    let mut settings = open_settings(&config);

    if let Some([gr, gb, r, b]) = args.set.as_deref() {
        settings
            .set_digital_gain(*gr, *gb, *r, *b, !args.no_commit)
            .map_err(|err| client_error("setting digital gain failed", err))?;
    }

    let gain = settings
        .get_digital_gain()
        .map_err(|err| client_error("reading digital gain failed", err))?;

    let fields = [
        ("gr", gain.gr.to_string()),
        ("gb", gain.gb.to_string()),
        ("r", gain.r.to_string()),
        ("b", gain.b.to_string()),
    ];
    print_record(&gain, &fields, format);
    Ok(SUCCESS)
}
