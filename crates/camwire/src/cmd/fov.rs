use camwire_client::CameraConfig;

use crate::cmd::{open_settings, FovArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: FovArgs, config: CameraConfig, format: OutputFormat) -> CliResult<i32> {
    let mut settings = open_settings(&config);

    // clap enforces exactly four values.
    if let Some([x, y, width, height]) = args.set.as_deref() {
        settings
            .set_field_of_view(*x, *y, *width, *height, !args.no_commit)
            .map_err(|err| client_error("setting field of view failed", err))?;
    }

    let fov = settings
        .get_field_of_view()
        .map_err(|err| client_error("reading field of view failed", err))?;

    let fields = [
        ("x", fov.x.to_string()),
        ("y", fov.y.to_string()),
        ("width", fov.width.to_string()),
        ("height", fov.height.to_string()),
    ];
    print_record(&fov, &fields, format);
    Ok(SUCCESS)
}
