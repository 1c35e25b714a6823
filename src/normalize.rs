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

//! Decodes archive sample data into 16-bit PCM WAV files the codec can read.
//!
//! Samples are stored as FLAC (or WAV of any bit depth) inside a song archive.
//! Decoding happens here, once per sample, so the container codec only ever
//! sees 16-bit integer PCM.

use std::fs::File;
use std::io;
use std::path::Path;

use hound::{SampleFormat, WavSpec};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: SymphoniaError,
    },

    #[error("No audio track found in {0}")]
    NoAudioTrack(String),

    #[error("{path} does not specify its {field}")]
    MissingParameter { path: String, field: &'static str },

    #[error("Unable to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: hound::Error,
    },
}

/// Decodes `source` and writes it to `dest` as 16-bit integer PCM, keeping the
/// channel count and sample rate. Returns the number of frames written.
pub fn normalize_to_pcm16(source: &Path, dest: &Path) -> Result<u64, NormalizeError> {
    let source_name = source.display().to_string();
    let decode_error = |e| NormalizeError::Decode {
        path: source_name.clone(),
        source: e,
    };
    let write_error = |e| NormalizeError::Write {
        path: dest.display().to_string(),
        source: e,
    };

    let file = File::open(source).map_err(|e| NormalizeError::Io {
        path: source_name.clone(),
        source: e,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(extension) = source.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| NormalizeError::NoAudioTrack(source_name.clone()))?;
    let track_id = track.id;
    let params = &track.codec_params;

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| NormalizeError::MissingParameter {
            path: source_name.clone(),
            field: "sample rate",
        })?;
    let channels = params
        .channels
        .map(|c| c.count())
        .filter(|count| *count > 0)
        .ok_or_else(|| NormalizeError::MissingParameter {
            path: source_name.clone(),
            field: "channel count",
        })?;

    let mut decoder = get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut writer = hound::WavWriter::create(
        dest,
        WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )
    .map_err(write_error)?;

    // Reused between packets, reallocated if a packet is larger than the last.
    let mut sample_buffer: Option<(SampleBuffer<i16>, usize)> = None;
    let mut frames = 0u64;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // End of file - we're done reading
                break;
            }
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?source, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };
        if decoded.frames() == 0 {
            continue;
        }

        let capacity = decoded.capacity();
        let (buffer, _) = match sample_buffer.take() {
            Some((buffer, buffer_capacity)) if buffer_capacity >= capacity => {
                sample_buffer.insert((buffer, buffer_capacity))
            }
            _ => {
                let spec = *decoded.spec();
                sample_buffer.insert((SampleBuffer::new(capacity as u64, spec), capacity))
            }
        };
        buffer.copy_interleaved_ref(decoded);

        for sample in buffer.samples() {
            writer.write_sample(*sample).map_err(write_error)?;
        }
        frames += (buffer.samples().len() / channels) as u64;
    }

    writer.finalize().map_err(write_error)?;
    debug!(source = ?source, dest = ?dest, frames, "Normalized sample to 16-bit PCM");

    Ok(frames)
}
