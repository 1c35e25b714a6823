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
use std::io;

/// Error types for container reading and writing.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("Unsupported audio format: format code {format_code:#06x}, {bits_per_sample} bits per sample (only 16-bit PCM is supported)")]
    UnsupportedFormat {
        format_code: u16,
        bits_per_sample: u16,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame data of {len} bytes is not a multiple of the {frame_width}-byte frame width")]
    Alignment { len: usize, frame_width: usize },

    /// `frame_count` is `None` when the range is empty on its own, before any
    /// frames are known.
    #[error("Invalid loop range {start}..{end}{}", frames_suffix(.frame_count))]
    InvalidRange {
        start: u32,
        end: u32,
        frame_count: Option<u32>,
    },

    #[error("Declared {declared} frame(s) but {written} were written")]
    FrameCountMismatch { declared: u32, written: u32 },
}

fn frames_suffix(frame_count: &Option<u32>) -> String {
    match frame_count {
        Some(frame_count) => format!(" for {} frame(s)", frame_count),
        None => ": start must come before end".to_string(),
    }
}

impl WavError {
    /// A structural problem in the container. These surface as IO errors with
    /// `ErrorKind::InvalidData` so callers can treat them like any unreadable file.
    pub fn malformed(message: impl Into<String>) -> WavError {
        WavError::Io(io::Error::new(io::ErrorKind::InvalidData, message.into()))
    }

    /// True if this error describes a truncated or otherwise malformed container.
    pub fn is_malformed(&self) -> bool {
        matches!(self, WavError::Io(e) if e.kind() == io::ErrorKind::InvalidData
            || e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_messages() {
        let empty = WavError::InvalidRange {
            start: 900,
            end: 100,
            frame_count: None,
        };
        assert_eq!(
            empty.to_string(),
            "Invalid loop range 900..100: start must come before end"
        );

        let out_of_bounds = WavError::InvalidRange {
            start: 10,
            end: 101,
            frame_count: Some(100),
        };
        assert_eq!(
            out_of_bounds.to_string(),
            "Invalid loop range 10..101 for 100 frame(s)"
        );
    }
}
