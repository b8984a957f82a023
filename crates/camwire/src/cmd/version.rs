use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("camwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: camwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("CAMWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("transport: {}", camwire_transport::TcpTransport::transport_name());
    println!(
        "default_ports: image={}, command={}",
        camwire_client::DEFAULT_IMAGE_PORT,
        camwire_client::DEFAULT_COMMAND_PORT
    );
    println!(
        "features: async={}, sim={}, cli=true",
        cfg!(feature = "async"),
        cfg!(feature = "sim")
    );

    Ok(SUCCESS)
}
