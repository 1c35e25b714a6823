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

//! The `smpl` (sampler) chunk.
//!
//! Only single-loop chunks are written. Parsing accepts any number of loops so
//! that files produced elsewhere can be inspected.

use super::error::WavError;
use super::SMPL_CHUNK_ID;

/// Size of the fixed part of the chunk payload, before the loop records.
pub const SAMPLER_HEADER_SIZE: usize = 36;

/// Size of a single loop record.
pub const SAMPLE_LOOP_SIZE: usize = 24;

/// Declared payload size of a chunk carrying exactly one loop and no sampler data.
pub const SINGLE_LOOP_CHUNK_SIZE: u32 = (SAMPLER_HEADER_SIZE + SAMPLE_LOOP_SIZE) as u32;

/// MIDI note at which the sample plays back at its recorded pitch.
pub const DEFAULT_UNITY_NOTE: u32 = 60;

/// Loop type values defined for the `smpl` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopType {
    Forward,
    Alternating,
    Backward,
    Other(u32),
}

impl From<u32> for LoopType {
    fn from(value: u32) -> Self {
        match value {
            0 => LoopType::Forward,
            1 => LoopType::Alternating,
            2 => LoopType::Backward,
            other => LoopType::Other(other),
        }
    }
}

impl From<LoopType> for u32 {
    fn from(value: LoopType) -> Self {
        match value {
            LoopType::Forward => 0,
            LoopType::Alternating => 1,
            LoopType::Backward => 2,
            LoopType::Other(other) => other,
        }
    }
}

/// A single loop record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLoop {
    pub identifier: u32,
    pub loop_type: LoopType,
    /// First frame of the loop.
    pub start: u32,
    /// Frame at which the loop ends.
    pub end: u32,
    pub fraction: u32,
    /// Number of times to play the loop, 0 means forever.
    pub play_count: u32,
}

impl SampleLoop {
    /// An infinite forward loop over `start..end`.
    pub fn forward(start: u32, end: u32) -> Result<SampleLoop, WavError> {
        if start >= end {
            return Err(WavError::InvalidRange {
                start,
                end,
                frame_count: None,
            });
        }

        Ok(SampleLoop {
            identifier: 0,
            loop_type: LoopType::Forward,
            start,
            end,
            fraction: 0,
            play_count: 0,
        })
    }
}

/// The contents of a `smpl` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerChunk {
    pub manufacturer: u32,
    pub product: u32,
    /// Duration of one frame in nanoseconds.
    pub sample_period: u32,
    pub midi_unity_note: u32,
    pub midi_pitch_fraction: u32,
    pub smpte_format: u32,
    pub smpte_offset: u32,
    pub loops: Vec<SampleLoop>,
    /// Declared length of the vendor-specific data following the loops, as
    /// read from a parsed chunk. The data itself is never kept or written.
    sampler_data_size: u32,
}

impl SamplerChunk {
    /// Builds a chunk with a single forward loop, leaving every vendor field at its default.
    pub fn with_loop(frame_rate: u32, sample_loop: SampleLoop) -> SamplerChunk {
        SamplerChunk {
            manufacturer: 0,
            product: 0,
            sample_period: sample_period(frame_rate),
            midi_unity_note: DEFAULT_UNITY_NOTE,
            midi_pitch_fraction: 0,
            smpte_format: 0,
            smpte_offset: 0,
            loops: vec![sample_loop],
            sampler_data_size: 0,
        }
    }

    /// Vendor data length declared by a parsed chunk. Encoded chunks always
    /// declare 0, since the data is not carried over.
    pub fn sampler_data_size(&self) -> u32 {
        self.sampler_data_size
    }

    /// Declared payload size. Written sampler data is always empty.
    pub fn payload_size(&self) -> u32 {
        (SAMPLER_HEADER_SIZE + self.loops.len() * SAMPLE_LOOP_SIZE) as u32
    }

    /// Size of the whole chunk on disk, including its 8-byte header.
    pub fn chunk_size(&self) -> u32 {
        8 + self.payload_size()
    }

    /// Encodes the chunk, header included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.chunk_size() as usize);
        out.extend_from_slice(&SMPL_CHUNK_ID);
        out.extend_from_slice(&self.payload_size().to_le_bytes());

        for value in [
            self.manufacturer,
            self.product,
            self.sample_period,
            self.midi_unity_note,
            self.midi_pitch_fraction,
            self.smpte_format,
            self.smpte_offset,
            self.loops.len() as u32,
            0,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }

        for sample_loop in &self.loops {
            for value in [
                sample_loop.identifier,
                u32::from(sample_loop.loop_type),
                sample_loop.start,
                sample_loop.end,
                sample_loop.fraction,
                sample_loop.play_count,
            ] {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }

        out
    }

    /// Parses a chunk payload (without the 8-byte chunk header).
    pub fn parse(payload: &[u8]) -> Result<SamplerChunk, WavError> {
        if payload.len() < SAMPLER_HEADER_SIZE {
            return Err(WavError::malformed(format!(
                "smpl chunk too small: {} bytes",
                payload.len()
            )));
        }

        let field = |index: usize| read_u32(payload, index * 4);
        let loop_count = field(7) as usize;
        let loops_end = loop_count
            .checked_mul(SAMPLE_LOOP_SIZE)
            .and_then(|size| size.checked_add(SAMPLER_HEADER_SIZE))
            .filter(|end| *end <= payload.len())
            .ok_or_else(|| {
                WavError::malformed(format!(
                    "smpl chunk declares {} loop(s) but holds {} bytes",
                    loop_count,
                    payload.len()
                ))
            })?;

        let loops = payload[SAMPLER_HEADER_SIZE..loops_end]
            .chunks_exact(SAMPLE_LOOP_SIZE)
            .map(|record| SampleLoop {
                identifier: read_u32(record, 0),
                loop_type: LoopType::from(read_u32(record, 4)),
                start: read_u32(record, 8),
                end: read_u32(record, 12),
                fraction: read_u32(record, 16),
                play_count: read_u32(record, 20),
            })
            .collect();

        Ok(SamplerChunk {
            manufacturer: field(0),
            product: field(1),
            sample_period: field(2),
            midi_unity_note: field(3),
            midi_pitch_fraction: field(4),
            smpte_format: field(5),
            smpte_offset: field(6),
            loops,
            sampler_data_size: field(8),
        })
    }
}

/// Nanoseconds per frame, 0 if the rate is unknown.
fn sample_period(frame_rate: u32) -> u32 {
    1_000_000_000u32.checked_div(frame_rate).unwrap_or(0)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
