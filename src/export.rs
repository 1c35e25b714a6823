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

//! Drives an export run: unpack the song, then convert every sample.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, span, warn, Level};

use crate::archive::{self, ArchiveError, SAMPLE_DATA_DIR, SONG_XML};
use crate::config::ExportConfig;
use crate::convert::{convert_sample, Conversion, ConversionError};
use crate::normalize::{normalize_to_pcm16, NormalizeError};
use crate::paths::{destination_path, find_sample_source};
use crate::project::{ProjectError, SampleDescriptor, Song};

/// Errors that stop an export run before any sample is converted.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ExportError {
    fn io(path: &Path, source: io::Error) -> ExportError {
        ExportError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors that fail a single sample. The rest of the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Unable to look up sample data in {path}: {source}")]
    Lookup {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Unable to create {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Convert(#[from] ConversionError),
}

/// Why a sample was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The sample has no loop and unlooped samples are excluded.
    Unlooped,
    /// The archive holds no data for the sample.
    NoSampleData,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unlooped => write!(f, "no loop"),
            SkipReason::NoSampleData => write!(f, "no sample data"),
        }
    }
}

#[derive(Debug)]
pub enum SampleOutcome {
    Converted {
        destination: PathBuf,
        conversion: Conversion,
    },
    Skipped(SkipReason),
    Failed(SampleError),
}

/// What happened to one sample.
#[derive(Debug)]
pub struct SampleResult {
    pub descriptor: SampleDescriptor,
    pub outcome: SampleOutcome,
}

/// The result of an export run, one entry per sample in song order.
#[derive(Debug, Default)]
pub struct ExportReport {
    results: Vec<SampleResult>,
    work_dir: Option<PathBuf>,
}

impl ExportReport {
    pub fn results(&self) -> &[SampleResult] {
        &self.results
    }

    /// Destination of every converted sample.
    pub fn converted(&self) -> impl Iterator<Item = (&SampleDescriptor, &Path)> {
        self.results.iter().filter_map(|result| match &result.outcome {
            SampleOutcome::Converted { destination, .. } => {
                Some((&result.descriptor, destination.as_path()))
            }
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&SampleDescriptor, SkipReason)> {
        self.results.iter().filter_map(|result| match &result.outcome {
            SampleOutcome::Skipped(reason) => Some((&result.descriptor, *reason)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&SampleDescriptor, &SampleError)> {
        self.results.iter().filter_map(|result| match &result.outcome {
            SampleOutcome::Failed(error) => Some((&result.descriptor, error)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// The extracted archive, if it was kept.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }
}

/// Exports the samples of a song archive.
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Exporter {
        Exporter { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Exports every sample of `archive` into `out_dir`.
    ///
    /// Samples are converted in parallel. A failing sample is recorded in the
    /// report and does not stop the others.
    pub fn run(&self, archive: &Path, out_dir: &Path) -> Result<ExportReport, ExportError> {
        let span = span!(Level::INFO, "export", archive = %archive.display());
        let _enter = span.enter();

        let work_dir = tempfile::Builder::new()
            .prefix("xrns-export-")
            .tempdir()
            .map_err(|e| ExportError::io(&std::env::temp_dir(), e))?;

        let extracted = archive::extract(archive, work_dir.path())?;
        debug!(files = extracted.len(), work_dir = ?work_dir.path(), "Extracted archive");

        let song = Song::load(&work_dir.path().join(SONG_XML))?;
        let samples: Vec<&SampleDescriptor> = song.samples().collect();

        let normalized_dir = work_dir.path().join("normalized");
        fs::create_dir_all(&normalized_dir).map_err(|e| ExportError::io(&normalized_dir, e))?;
        fs::create_dir_all(out_dir).map_err(|e| ExportError::io(out_dir, e))?;

        let dirs = Dirs {
            sample_data: work_dir.path().join(SAMPLE_DATA_DIR),
            normalized: normalized_dir,
            out: out_dir.to_path_buf(),
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.jobs().unwrap_or(0))
            .thread_name(|i| format!("xrns-export-{i}"))
            .build()?;
        info!(
            samples = samples.len(),
            threads = pool.current_num_threads(),
            mode = %self.config.mode(),
            "Exporting samples"
        );

        let results = pool.install(|| {
            samples
                .par_iter()
                .map(|descriptor| SampleResult {
                    descriptor: (*descriptor).clone(),
                    outcome: self.export_sample(descriptor, &dirs),
                })
                .collect::<Vec<SampleResult>>()
        });

        let mut report = ExportReport {
            results,
            work_dir: None,
        };
        if self.config.keep_work_dir() {
            let kept = work_dir.keep();
            info!(work_dir = ?kept, "Keeping work directory");
            report.work_dir = Some(kept);
        }

        info!(
            converted = report.converted().count(),
            skipped = report.skipped().count(),
            failed = report.failed().count(),
            "Export finished"
        );
        Ok(report)
    }

    fn export_sample(&self, descriptor: &SampleDescriptor, dirs: &Dirs) -> SampleOutcome {
        match self.try_export_sample(descriptor, dirs) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    instrument = descriptor.instrument_index,
                    sample = descriptor.sample_index,
                    err = %e,
                    "Sample export failed"
                );
                SampleOutcome::Failed(e)
            }
        }
    }

    fn try_export_sample(
        &self,
        descriptor: &SampleDescriptor,
        dirs: &Dirs,
    ) -> Result<SampleOutcome, SampleError> {
        if !descriptor.loop_enabled() && !self.config.include_unlooped() {
            return Ok(SampleOutcome::Skipped(SkipReason::Unlooped));
        }

        let source = find_sample_source(&dirs.sample_data, descriptor).map_err(|e| {
            SampleError::Lookup {
                path: dirs.sample_data.display().to_string(),
                source: e,
            }
        })?;
        let Some(source) = source else {
            debug!(
                instrument = descriptor.instrument_index,
                sample = descriptor.sample_index,
                "No sample data"
            );
            return Ok(SampleOutcome::Skipped(SkipReason::NoSampleData));
        };

        let normalized = dirs.normalized.join(format!(
            "{:03}-{:03}.wav",
            descriptor.instrument_index, descriptor.sample_index
        ));
        let frames = normalize_to_pcm16(&source, &normalized)?;
        debug!(source = ?source, frames, "Normalized sample");

        let destination = destination_path(&dirs.out, descriptor, self.config.mode());
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| SampleError::CreateDir {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let conversion = convert_sample(descriptor, &normalized, &destination, self.config.mode())?;
        if let Err(e) = fs::remove_file(&normalized) {
            debug!(path = ?normalized, err = %e, "Unable to remove normalized file");
        }

        info!(path = ?destination, "Wrote sample");
        Ok(SampleOutcome::Converted {
            destination,
            conversion,
        })
    }
}

struct Dirs {
    sample_data: PathBuf,
    normalized: PathBuf,
    out: PathBuf,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use tempfile::tempdir;

    use super::*;
    use crate::convert::ConversionMode;
    use crate::testutil::{write_wav_with_bits, write_zip};
    use crate::wav::WavReader;

    const SONG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<RenoiseSong doc_version="63">
  <Instruments>
    <Instrument>
      <Name>Strings</Name>
      <SampleGenerator>
        <Samples>
          <Sample>
            <Name>Violin</Name>
            <LoopMode>Forward</LoopMode>
            <LoopStart>100</LoopStart>
            <LoopEnd>300</LoopEnd>
          </Sample>
          <Sample>
            <Name>Pluck</Name>
            <LoopMode>Off</LoopMode>
          </Sample>
          <Sample>
            <Name>Broken</Name>
            <LoopMode>Forward</LoopMode>
            <LoopStart>10</LoopStart>
            <LoopEnd>5000</LoopEnd>
          </Sample>
          <Sample>
            <Name>Empty</Name>
            <LoopMode>Off</LoopMode>
          </Sample>
        </Samples>
      </SampleGenerator>
    </Instrument>
  </Instruments>
</RenoiseSong>"#;

    /// Encodes a mono 24-bit ramp, the kind of data found in an archive.
    fn encoded_sample(dir: &Path, name: &str, frames: i32) -> Result<Vec<u8>, Box<dyn Error>> {
        let path = dir.join(name);
        let samples = (0..frames).map(|i| i * 256).collect::<Vec<i32>>();
        write_wav_with_bits(path.clone(), vec![samples], 44100, 24)?;
        Ok(fs::read(path)?)
    }

    fn write_song(dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
        let archive = dir.join("song.xrns");
        write_zip(
            &archive,
            &[
                ("Song.xml", SONG.as_bytes().to_vec()),
                (
                    "SampleData/Instrument00 (Strings)/Sample00 (Violin).wav",
                    encoded_sample(dir, "violin.wav", 1000)?,
                ),
                (
                    "SampleData/Instrument00 (Strings)/Sample01 (Pluck).wav",
                    encoded_sample(dir, "pluck.wav", 50)?,
                ),
                (
                    "SampleData/Instrument00 (Strings)/Sample02 (Broken).wav",
                    encoded_sample(dir, "broken.wav", 200)?,
                ),
            ],
        )?;
        Ok(archive)
    }

    fn outcome_names(report: &ExportReport) -> Vec<(String, &'static str)> {
        report
            .results()
            .iter()
            .map(|result| {
                let outcome = match result.outcome {
                    SampleOutcome::Converted { .. } => "converted",
                    SampleOutcome::Skipped(_) => "skipped",
                    SampleOutcome::Failed(_) => "failed",
                };
                (result.descriptor.sample_name.clone(), outcome)
            })
            .collect()
    }

    #[test]
    fn test_export_tag() -> Result<(), Box<dyn Error>> {
        let tempdir = tempdir()?;
        let archive = write_song(tempdir.path())?;
        let out = tempdir.path().join("out");

        let report = Exporter::new(ExportConfig::default().with_jobs(2)).run(&archive, &out)?;

        assert_eq!(
            outcome_names(&report),
            vec![
                ("Violin".to_string(), "converted"),
                ("Pluck".to_string(), "converted"),
                ("Broken".to_string(), "failed"),
                ("Empty".to_string(), "skipped"),
            ]
        );
        assert!(report.has_failures());
        assert!(report.work_dir().is_none());
        assert_eq!(
            report.skipped().map(|(_, reason)| reason).collect::<Vec<_>>(),
            vec![SkipReason::NoSampleData]
        );

        let violin = out.join("Instrument00 (Strings)/Sample00 (Violin).wav");
        let reader = WavReader::open(&violin)?;
        assert_eq!(reader.format().sample_width, 2);
        assert_eq!(reader.frame_count(), 1000);
        let sampler = reader.sampler().expect("loop chunk");
        assert_eq!(sampler.loops[0].start, 100);
        assert_eq!(sampler.loops[0].end, 300);

        let pluck = WavReader::open(&out.join("Instrument00 (Strings)/Sample01 (Pluck).wav"))?;
        assert_eq!(pluck.frame_count(), 50);
        assert!(pluck.sampler().is_none());

        // The failed sample leaves nothing behind.
        assert!(!out
            .join("Instrument00 (Strings)/Sample02 (Broken).wav")
            .exists());
        Ok(())
    }

    #[test]
    fn test_export_trim_loops_only() -> Result<(), Box<dyn Error>> {
        let tempdir = tempdir()?;
        let archive = write_song(tempdir.path())?;
        let out = tempdir.path().join("out");

        let config = ExportConfig::default()
            .with_mode(ConversionMode::Trim)
            .with_include_unlooped(false)
            .with_jobs(1);
        let report = Exporter::new(config).run(&archive, &out)?;

        assert_eq!(
            outcome_names(&report),
            vec![
                ("Violin".to_string(), "converted"),
                ("Pluck".to_string(), "skipped"),
                ("Broken".to_string(), "failed"),
                ("Empty".to_string(), "skipped"),
            ]
        );
        match &report.results()[0].outcome {
            SampleOutcome::Converted { conversion, .. } => {
                assert_eq!(*conversion, Conversion::Trimmed { frames: 200 })
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let violin =
            WavReader::open(&out.join("Instrument00 (Strings)/Sample00 (Violin)-loop.wav"))?;
        assert_eq!(violin.frame_count(), 200);
        assert!(violin.sampler().is_none());
        assert!(!out.join("Instrument00 (Strings)/Sample01 (Pluck).wav").exists());

        match &report.results()[2].outcome {
            SampleOutcome::Failed(SampleError::Convert(e)) => assert_eq!(e.sample_index, 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_keep_work_dir() -> Result<(), Box<dyn Error>> {
        let tempdir = tempdir()?;
        let archive = write_song(tempdir.path())?;

        let report = Exporter::new(ExportConfig::default().with_keep_work_dir(true))
            .run(&archive, &tempdir.path().join("out"))?;

        let work_dir = report.work_dir().expect("work dir kept").to_path_buf();
        assert!(work_dir.join("Song.xml").is_file());
        fs::remove_dir_all(work_dir)?;
        Ok(())
    }

    #[test]
    fn test_archive_without_song() -> Result<(), Box<dyn Error>> {
        let tempdir = tempdir()?;
        let archive = tempdir.path().join("empty.xrns");
        write_zip(&archive, &[("readme.txt", b"nothing here".to_vec())])?;

        let result =
            Exporter::new(ExportConfig::default()).run(&archive, &tempdir.path().join("out"));
        assert!(matches!(result, Err(ExportError::Project(ProjectError::Io { .. }))));

        let result = Exporter::new(ExportConfig::default())
            .run(&tempdir.path().join("missing.xrns"), &tempdir.path().join("out"));
        assert!(matches!(result, Err(ExportError::Archive(_))));
        Ok(())
    }
}
