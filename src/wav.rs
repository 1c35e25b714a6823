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

//! RIFF/WAVE container codec for 16-bit PCM streams.
//!
//! The writer emits files laid out as:
//!
//! ```text
//! RIFF <size> WAVE
//!   fmt  (16 bytes, PCM)
//!   data (frame payload)
//!   smpl (optional, one forward loop)
//! ```

use std::fmt;

pub mod error;
pub mod header;
pub mod reader;
pub mod smpl;
pub mod writer;

pub use error::WavError;
pub use header::ContainerHeader;
pub use reader::WavReader;
pub use smpl::{SampleLoop, SamplerChunk};
pub use writer::WavWriter;

pub const RIFF_ID: [u8; 4] = *b"RIFF";
pub const WAVE_ID: [u8; 4] = *b"WAVE";
pub const FMT_CHUNK_ID: [u8; 4] = *b"fmt ";
pub const DATA_CHUNK_ID: [u8; 4] = *b"data";
pub const SMPL_CHUNK_ID: [u8; 4] = *b"smpl";

/// Format code for integer PCM.
pub const WAVE_FORMAT_PCM: u16 = 0x0001;

/// Format code for WAVE_FORMAT_EXTENSIBLE. The real format lives in the sub-format GUID.
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// The only sample width (in bytes) the codec handles.
pub const SUPPORTED_SAMPLE_WIDTH: u16 = 2;

/// Format parameters shared by readers and writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Bytes per sample for a single channel.
    pub sample_width: u16,
    /// Frames per second.
    pub frame_rate: u32,
}

impl PcmFormat {
    /// Creates a 16-bit PCM format.
    pub fn pcm16(channels: u16, frame_rate: u32) -> PcmFormat {
        PcmFormat {
            channels,
            sample_width: SUPPORTED_SAMPLE_WIDTH,
            frame_rate,
        }
    }

    /// Size of one frame in bytes (the block align).
    pub fn frame_width(&self) -> usize {
        usize::from(self.channels) * usize::from(self.sample_width)
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.frame_rate * u32::from(self.channels) * u32::from(self.sample_width)
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.sample_width * 8
    }

    /// Fails unless this is a format the codec can read and write.
    pub(crate) fn ensure_supported(&self, format_code: u16) -> Result<(), WavError> {
        if self.sample_width != SUPPORTED_SAMPLE_WIDTH {
            return Err(WavError::UnsupportedFormat {
                format_code,
                bits_per_sample: self.bits_per_sample(),
            });
        }
        if self.channels == 0 {
            return Err(WavError::malformed("channel count is zero"));
        }
        if self.frame_rate == 0 {
            return Err(WavError::malformed("frame rate is zero"));
        }
        Ok(())
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channel(s), {}-bit, {} Hz",
            self.channels,
            self.bits_per_sample(),
            self.frame_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_format_derived_values() {
        let format = PcmFormat::pcm16(2, 48000);
        assert_eq!(format.frame_width(), 4);
        assert_eq!(format.byte_rate(), 192000);
        assert_eq!(format.bits_per_sample(), 16);
        assert_eq!(format.to_string(), "2 channel(s), 16-bit, 48000 Hz");
    }

    #[test]
    fn test_pcm_format_rejects_other_widths() {
        let format = PcmFormat {
            channels: 1,
            sample_width: 3,
            frame_rate: 44100,
        };
        assert!(matches!(
            format.ensure_supported(WAVE_FORMAT_PCM),
            Err(WavError::UnsupportedFormat {
                bits_per_sample: 24,
                ..
            })
        ));
        assert!(PcmFormat::pcm16(0, 44100)
            .ensure_supported(WAVE_FORMAT_PCM)
            .is_err());
    }
}
