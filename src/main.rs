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
use tracing_subscriber::EnvFilter;

use xrns_export::archive::{self, SONG_XML};
use xrns_export::config::ExportConfig;
use xrns_export::convert::ConversionMode;
use xrns_export::export::Exporter;
use xrns_export::project::Song;
use xrns_export::wav::WavReader;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Exports the samples of a Renoise song as WAV files, keeping their loop points."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exports every sample of a song into a directory.
    Export {
        /// The .xrns file to export from.
        archive: PathBuf,
        /// The directory to write samples to. Created if missing.
        output_dir: PathBuf,
        /// How looped samples are written: "tag" keeps the whole sample and
        /// records the loop, "trim" keeps only the looped frames.
        #[arg(short, long)]
        mode: Option<ConversionMode>,
        /// An export config file (YAML or TOML).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Only export samples that loop.
        #[arg(short, long)]
        loops_only: bool,
        /// Number of samples to convert in parallel.
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Keep the extracted archive instead of deleting it.
        #[arg(long)]
        keep_work_dir: bool,
    },
    /// Lists the instruments and samples of a song.
    List {
        /// The .xrns file to read.
        archive: PathBuf,
    },
    /// Prints the format and loop of a WAV file.
    Inspect {
        /// The WAV file to read.
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Export {
            archive,
            output_dir,
            mode,
            config,
            loops_only,
            jobs,
            keep_work_dir,
        } => {
            let mut export_config = match config {
                Some(path) => ExportConfig::load(&path)?,
                None => ExportConfig::default(),
            };
            if let Some(mode) = mode {
                export_config = export_config.with_mode(mode);
            }
            if loops_only {
                export_config = export_config.with_include_unlooped(false);
            }
            if let Some(jobs) = jobs {
                export_config = export_config.with_jobs(jobs);
            }
            if keep_work_dir {
                export_config = export_config.with_keep_work_dir(true);
            }

            let report = Exporter::new(export_config).run(&archive, &output_dir)?;

            for (_, destination) in report.converted() {
                println!("{}", destination.display());
            }
            for (descriptor, reason) in report.skipped() {
                println!(
                    "Skipped instrument {:02}, sample {} ({})",
                    descriptor.instrument_index, descriptor, reason
                );
            }
            if let Some(work_dir) = report.work_dir() {
                println!("Work directory: {}", work_dir.display());
            }

            let failures: Vec<_> = report.failed().collect();
            if !failures.is_empty() {
                for (_, error) in failures.iter() {
                    eprintln!("Failed: {}", error);
                }
                return Err(format!("{} sample(s) failed to export", failures.len()).into());
            }
        }
        Commands::List { archive } => {
            let song = Song::parse(&archive::read_entry_to_string(&archive, SONG_XML)?)?;

            if song.instruments().is_empty() {
                println!("No instruments found.");
                return Ok(());
            }

            println!("Instruments (count: {}):", song.instruments().len());
            for instrument in song.instruments() {
                println!("- {:02}: {}", instrument.index, instrument.name);
                for sample in instrument.samples.iter() {
                    println!("  - {}", sample);
                }
            }
        }
        Commands::Inspect { path } => {
            let reader = WavReader::open(&path)?;

            println!("{}", path.display());
            println!("Format: {}", reader.format());
            println!("Frames: {}", reader.frame_count());
            match reader.sampler() {
                Some(sampler) if !sampler.loops.is_empty() => {
                    println!("Loops:");
                    for sample_loop in sampler.loops.iter() {
                        println!(
                            "- {}: {:?} {}..{}",
                            sample_loop.identifier,
                            sample_loop.loop_type,
                            sample_loop.start,
                            sample_loop.end
                        );
                    }
                }
                _ => println!("No loops."),
            }
        }
    }

    Ok(())
}
