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
use std::io::Write;

use super::error::WavError;
use super::smpl::SINGLE_LOOP_CHUNK_SIZE;
use super::{PcmFormat, DATA_CHUNK_ID, FMT_CHUNK_ID, RIFF_ID, WAVE_FORMAT_PCM, WAVE_ID};

/// Size of the PCM fmt chunk payload.
pub const FMT_CHUNK_SIZE: u32 = 16;

/// Bytes counted by the RIFF size field when the file holds only fmt and data:
/// "WAVE" (4) + fmt chunk (8 + 16) + data chunk header (8).
pub const BASE_HEADER_OVERHEAD: u32 = 4 + 8 + FMT_CHUNK_SIZE + 8;

/// RIFF size overhead with a single-loop smpl chunk appended after the data.
/// Must track the smpl layout in `smpl.rs`.
pub const LOOP_HEADER_OVERHEAD: u32 = BASE_HEADER_OVERHEAD + 8 + SINGLE_LOOP_CHUNK_SIZE;

/// Length of everything written before the frame payload.
pub const HEADER_LEN: usize = 44;

/// The envelope written in front of the frame payload.
///
/// All sizes are derived from the payload length handed to [`ContainerHeader::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    format: PcmFormat,
    data_chunk_size: u32,
    has_loop_chunk: bool,
}

impl ContainerHeader {
    /// Creates the header for `frame_count` frames of `format`.
    pub fn new(
        format: PcmFormat,
        frame_count: u32,
        has_loop_chunk: bool,
    ) -> Result<ContainerHeader, WavError> {
        let data_chunk_size = u64::from(frame_count) * format.frame_width() as u64;
        let overhead = if has_loop_chunk {
            LOOP_HEADER_OVERHEAD
        } else {
            BASE_HEADER_OVERHEAD
        };

        // The RIFF size field has to hold the payload plus the overhead.
        if data_chunk_size + u64::from(overhead) > u64::from(u32::MAX) {
            return Err(WavError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "{} bytes of frame data do not fit in a RIFF container",
                    data_chunk_size
                ),
            )));
        }

        Ok(ContainerHeader {
            format,
            data_chunk_size: data_chunk_size as u32,
            has_loop_chunk,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn data_chunk_size(&self) -> u32 {
        self.data_chunk_size
    }

    pub fn has_loop_chunk(&self) -> bool {
        self.has_loop_chunk
    }

    /// 36 without a loop chunk, 104 with one.
    pub fn header_overhead(&self) -> u32 {
        if self.has_loop_chunk {
            LOOP_HEADER_OVERHEAD
        } else {
            BASE_HEADER_OVERHEAD
        }
    }

    /// The value of the RIFF size field.
    pub fn total_size(&self) -> u32 {
        self.header_overhead() + self.data_chunk_size
    }

    /// Encodes everything up to and including the data chunk header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let format = &self.format;
        let mut out = Vec::with_capacity(HEADER_LEN);

        out.extend_from_slice(&RIFF_ID);
        out.extend_from_slice(&self.total_size().to_le_bytes());
        out.extend_from_slice(&WAVE_ID);

        out.extend_from_slice(&FMT_CHUNK_ID);
        out.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        out.extend_from_slice(&format.channels.to_le_bytes());
        out.extend_from_slice(&format.frame_rate.to_le_bytes());
        out.extend_from_slice(&format.byte_rate().to_le_bytes());
        out.extend_from_slice(&(format.frame_width() as u16).to_le_bytes());
        out.extend_from_slice(&format.bits_per_sample().to_le_bytes());

        out.extend_from_slice(&DATA_CHUNK_ID);
        out.extend_from_slice(&self.data_chunk_size.to_le_bytes());

        debug_assert_eq!(out.len(), HEADER_LEN);
        out
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), WavError> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }
}
