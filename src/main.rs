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
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use padlight::config::Padlight;
use padlight::midi;
use padlight::scheduler::Scheduler;
use tracing_subscriber::EnvFilter;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=DMX lighting controller
After=network-online.target

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/padlight
ExecStart=/usr/local/bin/padlight start "$PADLIGHT_CONFIG"
ExecReload=/bin/kill -HUP $MAINPID

[Install]
WantedBy=multi-user.target
Alias=padlight.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A DMX lighting controller driven from a MIDI pad surface."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start sends Art-Net frames and listens to the MIDI surface until Ctrl-C.
    Start {
        /// The path to the config file.
        config: String,
    },
    /// Lists the available MIDI input/output devices.
    MidiDevices {},
    /// Resolves and prints the patch.
    Patch {
        /// The path to the config file.
        config: String,
        /// Writes the resolved patch to the configured patch file.
        #[arg(short, long)]
        save: bool,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => {
            let config = Padlight::load(&PathBuf::from(config))?;
            let mut scheduler = Scheduler::from_config(&config)?;
            if !scheduler.connect() {
                return Err("unable to open the Art-Net socket".into());
            }
            scheduler.reconnect_midi();
            scheduler.run().await?;
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Patch { config, save } => {
            let config = Padlight::load(&PathBuf::from(config))?;
            let mut registry = config.registry();
            let mut resolver = config.patch(registry.fixtures_mut())?;
            resolver.refresh(registry.fixtures());

            println!("Patch (fixtures: {}):", registry.len());
            for fixture in registry.fixtures() {
                let channels = match resolver.channel_map().get(&fixture.id) {
                    Some(slots) => slots
                        .iter()
                        .map(|slot| i32::from(*slot).to_string())
                        .collect::<Vec<String>>()
                        .join(", "),
                    None => "unpatched".to_string(),
                };
                println!(
                    "- {} ({}, {}): {}",
                    fixture.id,
                    fixture.name,
                    resolver.mode_of(fixture),
                    channels
                );
            }

            let conflicts = resolver.conflicts();
            if conflicts.is_empty() {
                println!("\nNo address conflicts.");
            } else {
                println!("\nAddress conflicts (count: {}):", conflicts.len());
                for index in conflicts {
                    let fixture = &registry.fixtures()[*index];
                    println!(
                        "- {} ({}..={})",
                        fixture.id,
                        fixture.start_address,
                        fixture.end_address()
                    );
                }
            }

            if save {
                let Some(path) = config.patch_file() else {
                    return Err("no patch_file configured".into());
                };
                resolver.document().save(path)?;
                println!("\nSaved patch to {}.", path.display());
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
