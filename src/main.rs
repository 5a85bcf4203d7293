// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use mtick::audio;
use mtick::config::{init_metronome_and_controller, Overrides};
use mtick::controller::keyboard;
use mtick::tempo::{TimeSignature, MAX_BPM, MIN_BPM};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A visual metronome for the terminal."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the metronome and reads commands from the keyboard.
    Start {
        /// The path to the YAML configuration file.
        #[arg[short, long]]
        config: Option<PathBuf>,
        /// The starting tempo in beats per minute.
        #[arg[short, long]]
        bpm: Option<u32>,
        /// The starting time signature, e.g. 6/8.
        #[arg[short, long]]
        signature: Option<TimeSignature>,
        /// The audio output device.
        #[arg[short, long]]
        device: Option<String>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the supported time signatures.
    Signatures {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            config,
            bpm,
            signature,
            device,
        } => {
            let overrides = Overrides {
                bpm,
                time_signature: signature,
                device,
            };

            // The keyboard driver blocks on stdin, so the runtime is shut down
            // without waiting for it.
            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(async {
                let mut controller = init_metronome_and_controller(
                    config.as_deref(),
                    &overrides,
                    Arc::new(keyboard::Driver::new()),
                )?;
                controller.join().await?;
                Ok::<(), Box<dyn Error>>(())
            });
            runtime.shutdown_background();
            result?;
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Signatures {} => {
            println!("Time signatures:");
            for time_signature in TimeSignature::ALL {
                println!(
                    "- {} ({} beats per measure)",
                    time_signature,
                    time_signature.beats_per_measure()
                );
            }
            println!("\nTempo range: {}-{} BPM", MIN_BPM, MAX_BPM);
        }
    }

    Ok(())
}
