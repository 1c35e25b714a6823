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
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use super::error::WavError;
use super::smpl::SamplerChunk;
use super::{
    PcmFormat, DATA_CHUNK_ID, FMT_CHUNK_ID, RIFF_ID, SMPL_CHUNK_ID, WAVE_FORMAT_EXTENSIBLE,
    WAVE_FORMAT_PCM, WAVE_ID,
};

/// Upper bound on the fmt chunk size we are willing to buffer.
const MAX_FMT_CHUNK_SIZE: u64 = 1024;

/// Upper bound on the smpl chunk size we are willing to buffer.
const MAX_SMPL_CHUNK_SIZE: u64 = 64 * 1024;

/// Reads raw frames out of a 16-bit PCM RIFF/WAVE stream.
///
/// The header is parsed up front; afterwards the reader behaves like a cursor
/// over the frames of the data chunk.
pub struct WavReader<R> {
    inner: R,
    format: PcmFormat,
    data_start: u64,
    frame_count: u32,
    position: u32,
    sampler: Option<SamplerChunk>,
}

impl WavReader<BufReader<File>> {
    /// Opens a WAV file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WavError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            WavError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        WavReader::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> WavReader<R> {
    /// Parses the container header and positions the cursor on the first frame.
    pub fn new(mut inner: R) -> Result<Self, WavError> {
        let stream_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let mut riff = [0u8; 12];
        inner.read_exact(&mut riff)?;
        if riff[0..4] != RIFF_ID {
            return Err(WavError::malformed("not a RIFF file (missing RIFF header)"));
        }
        if riff[8..12] != WAVE_ID {
            return Err(WavError::malformed("not a WAVE file (missing WAVE format)"));
        }

        let mut format = None;
        let mut data = None;
        let mut sampler = None;

        // Walk every chunk. The RIFF size is not trusted, the stream length is.
        let mut offset = 12u64;
        while offset + 8 <= stream_len {
            inner.seek(SeekFrom::Start(offset))?;
            let mut chunk_header = [0u8; 8];
            inner.read_exact(&mut chunk_header)?;

            let id = [
                chunk_header[0],
                chunk_header[1],
                chunk_header[2],
                chunk_header[3],
            ];
            let size = u64::from(u32::from_le_bytes([
                chunk_header[4],
                chunk_header[5],
                chunk_header[6],
                chunk_header[7],
            ]));
            let body_start = offset + 8;
            let available = stream_len - body_start;

            match id {
                FMT_CHUNK_ID => {
                    if size > MAX_FMT_CHUNK_SIZE || size > available {
                        return Err(WavError::malformed(format!(
                            "fmt chunk of {} bytes is truncated or oversized",
                            size
                        )));
                    }
                    let mut body = vec![0u8; size as usize];
                    inner.read_exact(&mut body)?;
                    format = Some(parse_fmt_chunk(&body)?);
                }
                DATA_CHUNK_ID => {
                    if size > available {
                        warn!(
                            declared = size,
                            available,
                            "Data chunk is shorter than declared, reading what is present"
                        );
                    }
                    data = Some((body_start, size.min(available)));
                }
                SMPL_CHUNK_ID if size <= MAX_SMPL_CHUNK_SIZE && size <= available => {
                    let mut body = vec![0u8; size as usize];
                    inner.read_exact(&mut body)?;
                    match SamplerChunk::parse(&body) {
                        Ok(chunk) => sampler = Some(chunk),
                        Err(e) => warn!(err = %e, "Ignoring unreadable smpl chunk"),
                    }
                }
                _ => {
                    debug!(
                        chunk = %String::from_utf8_lossy(&id),
                        size, "Skipping chunk"
                    );
                }
            }

            // Chunks are word aligned.
            offset = body_start + size + (size % 2);
        }

        let format = format.ok_or_else(|| WavError::malformed("fmt chunk not found"))?;
        let (data_start, data_len) =
            data.ok_or_else(|| WavError::malformed("data chunk not found"))?;

        let frame_count = data_len / format.frame_width() as u64;
        let frame_count = u32::try_from(frame_count)
            .map_err(|_| WavError::malformed("data chunk holds more than u32::MAX frames"))?;

        inner.seek(SeekFrom::Start(data_start))?;

        Ok(WavReader {
            inner,
            format,
            data_start,
            frame_count,
            position: 0,
            sampler,
        })
    }

    /// Reads up to `count` frames of raw little-endian sample bytes.
    /// Fewer frames are returned only when the end of the stream is reached.
    pub fn read_frames(&mut self, count: u32) -> Result<Vec<u8>, WavError> {
        let frames = count.min(self.remaining_frames());
        let mut buffer = vec![0u8; frames as usize * self.format.frame_width()];
        self.inner.read_exact(&mut buffer)?;
        self.position += frames;
        Ok(buffer)
    }

    /// Moves the cursor forward without reading. Returns the number of frames skipped.
    pub fn skip_frames(&mut self, count: u32) -> Result<u32, WavError> {
        let frames = count.min(self.remaining_frames());
        let target = self.position + frames;
        self.inner.seek(SeekFrom::Start(
            self.data_start + u64::from(target) * self.format.frame_width() as u64,
        ))?;
        self.position = target;
        Ok(frames)
    }

    /// Rewinds to the very start of the underlying stream and hands it back.
    pub fn into_rewound_inner(mut self) -> Result<R, WavError> {
        self.inner.seek(SeekFrom::Start(0))?;
        Ok(self.inner)
    }
}

impl<R> WavReader<R> {
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Number of whole frames in the data chunk.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Index of the next frame to be read.
    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn remaining_frames(&self) -> u32 {
        self.frame_count - self.position
    }

    /// The sampler chunk, if the file carries one.
    pub fn sampler(&self) -> Option<&SamplerChunk> {
        self.sampler.as_ref()
    }
}

/// Parses a fmt chunk body into a supported format.
fn parse_fmt_chunk(body: &[u8]) -> Result<PcmFormat, WavError> {
    if body.len() < 16 {
        return Err(WavError::malformed(format!(
            "fmt chunk too small: {} bytes",
            body.len()
        )));
    }

    let u16_at = |offset: usize| u16::from_le_bytes([body[offset], body[offset + 1]]);
    let u32_at = |offset: usize| {
        u32::from_le_bytes([
            body[offset],
            body[offset + 1],
            body[offset + 2],
            body[offset + 3],
        ])
    };

    let mut format_code = u16_at(0);
    let channels = u16_at(2);
    let frame_rate = u32_at(4);
    let block_align = u16_at(12);
    let bits_per_sample = u16_at(14);

    // WAVE_FORMAT_EXTENSIBLE carries the real format code in the first two
    // bytes of the sub-format GUID.
    if format_code == WAVE_FORMAT_EXTENSIBLE {
        if body.len() < 40 {
            return Err(WavError::malformed("extensible fmt chunk too small"));
        }
        format_code = u16_at(24);
    }

    if format_code != WAVE_FORMAT_PCM {
        return Err(WavError::UnsupportedFormat {
            format_code,
            bits_per_sample,
        });
    }
    if bits_per_sample == 0 {
        return Err(WavError::malformed("bits per sample is zero"));
    }

    let format = PcmFormat {
        channels,
        sample_width: bits_per_sample.div_ceil(8),
        frame_rate,
    };
    format.ensure_supported(format_code)?;

    if usize::from(block_align) != format.frame_width() {
        return Err(WavError::malformed(format!(
            "block align {} does not match {} channel(s) of {} bytes",
            block_align, format.channels, format.sample_width
        )));
    }

    Ok(format)
}
