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

//! Instrument and sample metadata read from a song's `Song.xml`.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::debug;

/// Errors raised while reading song metadata.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed song XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Instrument {instrument}, sample {sample}: unknown loop mode \"{value}\"")]
    UnknownLoopMode {
        instrument: usize,
        sample: usize,
        value: String,
    },

    #[error("Instrument {instrument}, sample {sample}: loop is enabled but {field} is missing")]
    MissingLoopBound {
        instrument: usize,
        sample: usize,
        field: &'static str,
    },

    #[error("Instrument {instrument}, sample {sample}: {field} \"{value}\" is not a frame index")]
    InvalidFrameIndex {
        instrument: usize,
        sample: usize,
        field: &'static str,
        value: String,
    },
}

/// How a sample loops during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Forward,
    Backward,
    PingPong,
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Off" => Ok(LoopMode::Off),
            "Forward" => Ok(LoopMode::Forward),
            "Backward" => Ok(LoopMode::Backward),
            "PingPong" => Ok(LoopMode::PingPong),
            _ => Err(format!("Unsupported loop mode: {}", s)),
        }
    }
}

impl LoopMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopMode::Off => "Off",
            LoopMode::Forward => "Forward",
            LoopMode::Backward => "Backward",
            LoopMode::PingPong => "PingPong",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sample to export, with everything the codec needs to know about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescriptor {
    pub instrument_index: usize,
    pub instrument_name: String,
    pub sample_index: usize,
    pub sample_name: String,
    pub loop_mode: LoopMode,
    /// First frame of the loop. Only meaningful when the loop is enabled.
    pub loop_start: u32,
    /// Frame at which the loop ends. Only meaningful when the loop is enabled.
    pub loop_end: u32,
}

impl SampleDescriptor {
    pub fn loop_enabled(&self) -> bool {
        self.loop_mode != LoopMode::Off
    }

    /// The loop bounds, if the sample loops.
    pub fn loop_region(&self) -> Option<(u32, u32)> {
        self.loop_enabled().then_some((self.loop_start, self.loop_end))
    }
}

impl fmt::Display for SampleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}: {}", self.sample_index, self.sample_name)?;
        match self.loop_region() {
            Some((start, end)) => write!(f, " (loop {} {}..{})", self.loop_mode, start, end),
            None => write!(f, " (no loop)"),
        }
    }
}

/// An instrument and the samples it holds, in song order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub index: usize,
    pub name: String,
    pub samples: Vec<SampleDescriptor>,
}

/// The sample metadata of a whole song.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Song {
    instruments: Vec<Instrument>,
}

impl Song {
    /// Reads and parses a `Song.xml` file.
    pub fn load(path: &Path) -> Result<Song, ProjectError> {
        let xml = fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Song::parse(&xml)
    }

    /// Parses the contents of a `Song.xml` file.
    ///
    /// Every `Instrument` element is visited in document order. Its samples are
    /// all of the `Sample` elements beneath it, so both the flat layout of older
    /// songs and the `SampleGenerator` layout of newer ones are understood.
    /// Pattern note columns also use an `Instrument` tag, but only as a text
    /// value, so elements without child elements are not instruments.
    pub fn parse(xml: &str) -> Result<Song, ProjectError> {
        let document = Document::parse(xml)?;

        let instruments = document
            .descendants()
            .filter(|node| {
                node.has_tag_name("Instrument") && node.children().any(|c| c.is_element())
            })
            .enumerate()
            .map(|(index, node)| parse_instrument(index, node))
            .collect::<Result<Vec<Instrument>, ProjectError>>()?;

        debug!(instruments = instruments.len(), "Parsed song metadata");
        Ok(Song { instruments })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Every sample of every instrument, instrument by instrument.
    pub fn samples(&self) -> impl Iterator<Item = &SampleDescriptor> {
        self.instruments
            .iter()
            .flat_map(|instrument| instrument.samples.iter())
    }
}

fn parse_instrument(index: usize, node: Node) -> Result<Instrument, ProjectError> {
    let name = child_text(node, "Name").unwrap_or_default().to_string();

    let samples = node
        .descendants()
        .filter(|child| child.has_tag_name("Sample"))
        .enumerate()
        .map(|(sample_index, sample)| parse_sample(index, &name, sample_index, sample))
        .collect::<Result<Vec<SampleDescriptor>, ProjectError>>()?;

    Ok(Instrument {
        index,
        name,
        samples,
    })
}

fn parse_sample(
    instrument_index: usize,
    instrument_name: &str,
    sample_index: usize,
    node: Node,
) -> Result<SampleDescriptor, ProjectError> {
    let loop_mode = match child_text(node, "LoopMode") {
        Some(value) => {
            LoopMode::from_str(value).map_err(|_| ProjectError::UnknownLoopMode {
                instrument: instrument_index,
                sample: sample_index,
                value: value.to_string(),
            })?
        }
        None => LoopMode::Off,
    };

    let frame_index = |field: &'static str| -> Result<Option<u32>, ProjectError> {
        child_text(node, field)
            .map(|value| {
                value
                    .parse::<u32>()
                    .map_err(|_| ProjectError::InvalidFrameIndex {
                        instrument: instrument_index,
                        sample: sample_index,
                        field,
                        value: value.to_string(),
                    })
            })
            .transpose()
    };
    let loop_start = frame_index("LoopStart")?;
    let loop_end = frame_index("LoopEnd")?;

    let (loop_start, loop_end) = if loop_mode == LoopMode::Off {
        (loop_start.unwrap_or(0), loop_end.unwrap_or(0))
    } else {
        let missing = |field| ProjectError::MissingLoopBound {
            instrument: instrument_index,
            sample: sample_index,
            field,
        };
        (
            loop_start.ok_or_else(|| missing("LoopStart"))?,
            loop_end.ok_or_else(|| missing("LoopEnd"))?,
        )
    };

    Ok(SampleDescriptor {
        instrument_index,
        instrument_name: instrument_name.to_string(),
        sample_index,
        sample_name: child_text(node, "Name").unwrap_or_default().to_string(),
        loop_mode,
        loop_start,
        loop_end,
    })
}

/// Trimmed text of the first direct child element with the given tag name.
fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
}
