//! Demo binary: load a JSON config, build the physical layer, bind it to
//! an audio device, and run one of a handful of roles against it.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use acoustic_app::config;
use acoustic_app::device;
use acoustic_app::ping;
use acoustic_core::crc::Crc8;
use acoustic_core::line_codec::LineCodec;
use acoustic_core::PhysicalLayer;
use acoustic_proto::PhysicalLayerError;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Acoustic packet modem demo")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Use an in-process loopback instead of the host's audio device
    /// (useful for testing without a sound card).
    #[arg(long)]
    loopback: bool,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Sends one message, read from `inputFile` or stdin if omitted.
    Send,
    /// Prints every reassembled message to `outputFile` or stdout.
    Listen,
    /// Sends a message and waits for an echo, reporting round-trip time.
    Ping { message: String },
    /// Echoes every received message back to the sender.
    Pong,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let (config, file_config) = config::load_config(&cli.config)?;
    let line_codec = std::sync::Arc::new(LineCodec::new());
    let crc = Crc8::new();
    let (layer, callbacks) = PhysicalLayer::new(config, line_codec, crc);

    if cli.loopback {
        let _device = device::spawn_loopback_device(callbacks);
        run_role(&cli.role, &layer, &file_config)
    } else {
        let _device = device::open_default_duplex_stream(callbacks)?;
        run_role(&cli.role, &layer, &file_config)
    }
}

/// `file_config.time`, expressed as a deadline from now; `None` if no
/// duration bound was configured.
fn deadline_from(file_config: &config::FileConfig) -> Option<Instant> {
    file_config.time.map(|secs| Instant::now() + Duration::from_secs(secs))
}

fn run_role(
    role: &Role,
    layer: &PhysicalLayer,
    file_config: &config::FileConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match role {
        Role::Send => {
            let mut payload = Vec::new();
            match &file_config.input_file {
                Some(path) => std::fs::File::open(path)?.read_to_end(&mut payload)?,
                None => std::io::stdin().read_to_end(&mut payload)?,
            };
            layer.async_send(payload)?;
            Ok(())
        }
        Role::Listen => {
            let deadline = deadline_from(file_config);
            loop {
                let message = match ping::read_until(layer, deadline) {
                    Ok(message) => message,
                    Err(PhysicalLayerError::Cancelled) if deadline.is_some() => return Ok(()),
                    Err(e) => return Err(e.into()),
                };
                match &file_config.output_file {
                    Some(path) => std::fs::File::create(path)?.write_all(&message)?,
                    None => std::io::stdout().write_all(&message)?,
                }
            }
        }
        Role::Ping { message } => {
            let deadline = deadline_from(file_config);
            let rtt = ping::ping_once(layer, message.as_bytes(), deadline)?;
            println!("round trip: {rtt:?}");
            Ok(())
        }
        Role::Pong => ping::pong_loop(layer).map_err(Into::into),
    }
}
