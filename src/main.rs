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
use clap::{crate_version, Parser, Subcommand};
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use padbank::audio;
use padbank::config::SamplerConfig;
use padbank::controller::{keyboard, Controller, Router};
use padbank::sampler::{
    write_json_lines, ClipCache, ClipSource, ProgressMonitor, SamplerEngine, StopScope,
};
use padbank::util::{duration_minutes_seconds, relative_display};

/// Sample rate used by verify when the config has no audio section.
const VERIFY_SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A pad sampler for live performance."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads a sampler config, decodes its clips and reports any problems.
    Verify {
        /// The path to the sampler configuration.
        config: PathBuf,
    },
    /// Starts the sampler with keyboard control on stdin.
    ///
    /// Prompts and status lines go to stderr, leaving stdout for events. Typed input has no
    /// key-up, so a hold pad triggered through `key` keeps sounding until `release <pad>` or
    /// `stop`.
    Start {
        /// The path to the sampler configuration.
        config: PathBuf,
        /// Print engine events to stdout as JSON lines.
        #[arg(long)]
        events: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
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
        Commands::Verify { config } => {
            let config = SamplerConfig::load(&config)?;
            let sample_rate = config
                .audio()
                .map(|audio| audio.sample_rate())
                .unwrap_or(VERIFY_SAMPLE_RATE);
            let clips = ClipCache::new(sample_rate, config.base_path());
            let failures = clips.preload(&config.clip_refs());

            for bank in config.banks() {
                println!(
                    "{} ({}){}",
                    bank.name(),
                    bank.id(),
                    bank.shortcut_key()
                        .map(|key| format!(" [{key}]"))
                        .unwrap_or_default()
                );
                for pad in bank.pads() {
                    let duration = clips
                        .resolve(&pad.clip())
                        .map(|clip| duration_minutes_seconds(clip.duration()))
                        .unwrap_or_else(|_| "missing".to_string());
                    println!(
                        "  - {} ({}): {} {}% {}{}",
                        pad.name(),
                        pad.id(),
                        pad.trigger_mode(),
                        (pad.volume() * 100.0).round(),
                        duration,
                        pad.shortcut_key()
                            .map(|key| format!(" [{key}]"))
                            .unwrap_or_default()
                    );
                }
            }
            println!(
                "{} clips loaded, {} KiB",
                config.clip_refs().len() - failures.len(),
                clips.total_memory_usage() / 1024
            );

            if !failures.is_empty() {
                println!("Unresolved clips:");
                for (clip, e) in failures.iter() {
                    println!(
                        "- {}: {}",
                        relative_display(config.base_path(), &clips.path_for(clip)),
                        e
                    );
                }
                return Err(format!("{} clips could not be loaded", failures.len()).into());
            }
        }
        Commands::Start { config, events } => {
            let config = SamplerConfig::load(&config)?;
            let device = audio::get_device(config.audio())?;

            let clips = Arc::new(ClipCache::new(device.sample_rate(), config.base_path()));
            let failures = clips.preload(&config.clip_refs());
            if !failures.is_empty() {
                warn!(
                    failed = failures.len(),
                    "Some clips could not be loaded, their pads will stay silent"
                );
            }

            let options = config.engine().options(device.sample_rate())?;
            let engine = Arc::new(SamplerEngine::new(
                options,
                clips.clone(),
                config.mix().settings(),
            ));
            engine.load_banks(config.banks());

            if events {
                let events_rx = engine.subscribe();
                thread::Builder::new()
                    .name("event-printer".to_string())
                    .spawn(move || {
                        if let Err(e) = write_json_lines(events_rx, io::stdout()) {
                            warn!(err = %e, "Event output closed");
                        }
                    })?;
            }

            let mut stream = device.start(engine.create_mixer(device.channels()))?;
            let mut monitor =
                ProgressMonitor::spawn(engine.clone(), config.engine().progress_interval()?)?;
            info!(device = %device, "Sampler started");

            let router = Router::new(
                engine.clone(),
                config.shortcuts()?,
                config.banks().iter().map(|bank| bank.id().clone()).collect(),
            );
            let mut controller = Controller::new(router, Arc::new(keyboard::Driver::new()))?;
            controller.join().await?;

            engine.stop_all(&StopScope::Global);
            monitor.stop();
            stream.stop();
            info!("Sampler stopped");
        }
    }

    Ok(())
}
