// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use duration_string::DurationString;
use stemsync::{
    config,
    simulator::{self, Options},
    stems::Model,
    util::parse_volume_assignment,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Synchronized playback of separated stems."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the separation models and the stems they produce.
    Models {},
    /// Verifies an engine config and prints the resulting settings.
    CheckConfig {
        /// The path to the engine config.
        path: String,
    },
    /// Plays simulated stems with drifting clocks and reports how well they stayed in sync.
    Simulate {
        /// A stem list file. The first stem is the master.
        #[arg(short, long, conflicts_with = "model")]
        stems: Option<String>,
        /// A separation model to take the stem names from.
        #[arg(short, long, default_value = "htdemucs_ft")]
        model: String,
        /// The session ID used to build stem URLs.
        #[arg(long, default_value = "simulation")]
        session: String,
        /// The base URL used to build stem URLs.
        #[arg(long, default_value = "http://localhost:8000")]
        base_url: String,
        /// The path to an engine config.
        #[arg(short, long)]
        config: Option<String>,
        /// The length of the simulated track.
        #[arg(long, default_value = "30s")]
        length: String,
        /// How long to play for.
        #[arg(long, default_value = "10s")]
        run_for: String,
        /// The largest clock skew a follower may have, e.g. 0.01 for 1%.
        #[arg(long, default_value_t = 0.01)]
        max_skew: f64,
        /// The chance per step that a follower jumps.
        #[arg(long, default_value_t = 0.0)]
        hiccups: f64,
        /// The random seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Stems to mute. May be repeated.
        #[arg(long)]
        mute: Vec<String>,
        /// Stem volumes in the form <STEM>=<VOLUME>. May be repeated.
        #[arg(long)]
        volume: Vec<String>,
    },
}

fn parse_duration(value: &str) -> Result<std::time::Duration, Box<dyn Error>> {
    Ok(DurationString::from_string(value.to_string())?.into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Models {} => {
            println!("Models (max stems: {}):", Model::max_stems());
            for model in Model::all() {
                println!(
                    "- {} ({}): {}",
                    model.id(),
                    model.display_name(),
                    model.description()
                );
                println!("  stems: {}", model.stems().join(", "));
            }
        }
        Commands::CheckConfig { path } => {
            let settings = config::load_settings(Some(&PathBuf::from(&path)))?;
            println!("{} is valid:", path);
            println!("{}", settings);
        }
        Commands::Simulate {
            stems,
            model,
            session,
            base_url,
            config: config_path,
            length,
            run_for,
            max_skew,
            hiccups,
            seed,
            mute,
            volume,
        } => {
            let stems = match stems {
                Some(path) => config::load_stems(&PathBuf::from(path))?,
                None => config::stems_for_model(&model, &base_url, &session)?,
            };
            let settings = config::load_settings(config_path.map(PathBuf::from).as_deref())?;

            let mut volumes = Vec::with_capacity(volume.len());
            for assignment in volume.iter() {
                volumes.push(parse_volume_assignment(assignment)?);
            }

            let options = Options {
                length: parse_duration(&length)?,
                run_for: parse_duration(&run_for)?,
                max_skew,
                hiccup_chance: hiccups,
                seed,
                mute,
                volumes,
                ..Default::default()
            };

            let report = simulator::run(stems, settings, &options).await?;
            print!("{}", serde_yml::to_string(&report)?);
        }
    }

    Ok(())
}
