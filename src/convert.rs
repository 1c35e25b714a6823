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

//! Per-sample conversion: passthrough, trim or tag.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::project::SampleDescriptor;
use crate::wav::{WavError, WavReader, WavWriter};

/// Frames moved per read when copying a whole stream.
const COPY_BLOCK_FRAMES: u32 = 4096;

/// What to do with samples that loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Keep only the looped frames and drop the loop metadata.
    #[serde(alias = "Trim")]
    Trim,
    /// Keep every frame and record the loop in a `smpl` chunk.
    #[default]
    #[serde(alias = "Tag")]
    Tag,
}

impl FromStr for ConversionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trim" | "Trim" => Ok(ConversionMode::Trim),
            "tag" | "Tag" => Ok(ConversionMode::Tag),
            _ => Err(format!("Unsupported conversion mode: {}", s)),
        }
    }
}

impl ConversionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::Trim => "trim",
            ConversionMode::Tag => "tag",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome of a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// The sample does not loop and was copied unchanged.
    Copied { bytes: u64 },
    /// Only the looped frames were kept.
    Trimmed { frames: u32 },
    /// All frames were kept and the loop was recorded.
    Tagged {
        frames: u32,
        loop_start: u32,
        loop_end: u32,
    },
}

/// A conversion failure, tagged with the sample it happened on.
#[derive(Debug, thiserror::Error)]
#[error("Instrument {instrument_index}, sample {sample_index} ({sample_name}): {source}")]
pub struct ConversionError {
    pub instrument_index: usize,
    pub sample_index: usize,
    pub sample_name: String,
    #[source]
    pub source: WavError,
}

impl ConversionError {
    fn new(descriptor: &SampleDescriptor, source: WavError) -> ConversionError {
        ConversionError {
            instrument_index: descriptor.instrument_index,
            sample_index: descriptor.sample_index,
            sample_name: descriptor.sample_name.clone(),
            source,
        }
    }
}

/// Converts the WAV file at `source` into `dest`.
///
/// The source is validated before `dest` is created. If the conversion fails
/// after that, the partially written `dest` is removed.
pub fn convert_sample(
    descriptor: &SampleDescriptor,
    source: &Path,
    dest: &Path,
    mode: ConversionMode,
) -> Result<Conversion, ConversionError> {
    let reader = WavReader::open(source).map_err(|e| ConversionError::new(descriptor, e))?;
    let file = File::create(dest).map_err(|e| {
        ConversionError::new(
            descriptor,
            WavError::Io(io::Error::new(e.kind(), format!("{}: {}", dest.display(), e))),
        )
    })?;

    let result = convert_reader(descriptor, reader, BufWriter::new(file), mode);
    if result.is_err() {
        if let Err(e) = fs::remove_file(dest) {
            warn!(path = ?dest, err = %e, "Unable to remove partially written file");
        }
    }
    result
}

/// Converts a WAV stream into `dest`.
pub fn convert_stream<R: Read + Seek, W: Write>(
    descriptor: &SampleDescriptor,
    source: R,
    dest: W,
    mode: ConversionMode,
) -> Result<Conversion, ConversionError> {
    let reader = WavReader::new(source).map_err(|e| ConversionError::new(descriptor, e))?;
    convert_reader(descriptor, reader, dest, mode)
}

fn convert_reader<R: Read + Seek, W: Write>(
    descriptor: &SampleDescriptor,
    reader: WavReader<R>,
    dest: W,
    mode: ConversionMode,
) -> Result<Conversion, ConversionError> {
    debug!(
        instrument = descriptor.instrument_index,
        sample = descriptor.sample_index,
        format = %reader.format(),
        frames = reader.frame_count(),
        mode = %mode,
        "Converting sample"
    );

    let result = match descriptor.loop_region() {
        None => passthrough(reader, dest),
        Some((start, end)) => {
            let frame_count = reader.frame_count();
            if start >= end || end > frame_count {
                Err(WavError::InvalidRange {
                    start,
                    end,
                    frame_count: Some(frame_count),
                })
            } else {
                match mode {
                    ConversionMode::Trim => trim(reader, dest, start, end),
                    ConversionMode::Tag => tag(reader, dest, start, end),
                }
            }
        }
    };

    result.map_err(|e| ConversionError::new(descriptor, e))
}

/// Copies the source container byte for byte.
fn passthrough<R: Read + Seek, W: Write>(
    reader: WavReader<R>,
    mut dest: W,
) -> Result<Conversion, WavError> {
    let mut source = reader.into_rewound_inner()?;
    let bytes = io::copy(&mut source, &mut dest)?;
    dest.flush()?;
    Ok(Conversion::Copied { bytes })
}

/// Writes frames `start..end` into a loop-free container.
fn trim<R: Read + Seek, W: Write>(
    mut reader: WavReader<R>,
    dest: W,
    start: u32,
    end: u32,
) -> Result<Conversion, WavError> {
    let frames = end - start;
    reader.skip_frames(start)?;

    let mut writer = WavWriter::new(dest, reader.format(), frames)?;
    writer.write_frames(&reader.read_frames(frames)?)?;
    writer.close()?;

    Ok(Conversion::Trimmed { frames })
}

/// Writes every frame and records `start..end` as a forward loop.
fn tag<R: Read + Seek, W: Write>(
    mut reader: WavReader<R>,
    dest: W,
    start: u32,
    end: u32,
) -> Result<Conversion, WavError> {
    let frames = reader.frame_count();

    let mut writer = WavWriter::new(dest, reader.format(), frames)?;
    while reader.remaining_frames() > 0 {
        writer.write_frames(&reader.read_frames(COPY_BLOCK_FRAMES)?)?;
    }
    writer.attach_loop_descriptor(start, end)?;
    writer.close()?;

    Ok(Conversion::Tagged {
        frames,
        loop_start: start,
        loop_end: end,
    })
}
