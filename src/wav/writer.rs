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
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::error::WavError;
use super::header::ContainerHeader;
use super::smpl::{SampleLoop, SamplerChunk};
use super::{PcmFormat, WAVE_FORMAT_PCM};

/// Writes a 16-bit PCM RIFF/WAVE container in a single forward pass.
///
/// Frames are buffered until [`WavWriter::close`], at which point every size
/// is known and the header, payload and optional `smpl` chunk are emitted in
/// order. Nothing reaches the underlying writer before then, and the writer
/// never seeks.
pub struct WavWriter<W: Write> {
    inner: W,
    format: PcmFormat,
    declared_frame_count: u32,
    frames: Vec<u8>,
    sample_loop: Option<SampleLoop>,
}

impl WavWriter<BufWriter<File>> {
    /// Creates (or truncates) a WAV file on disk.
    ///
    /// A `declared_frame_count` of 0 defers the frame count to `close`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        format: PcmFormat,
        declared_frame_count: u32,
    ) -> Result<Self, WavError> {
        // Validate before touching the filesystem.
        format.ensure_supported(WAVE_FORMAT_PCM)?;

        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            WavError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        WavWriter::new(BufWriter::new(file), format, declared_frame_count)
    }
}

impl<W: Write> WavWriter<W> {
    pub fn new(inner: W, format: PcmFormat, declared_frame_count: u32) -> Result<Self, WavError> {
        format.ensure_supported(WAVE_FORMAT_PCM)?;
        if declared_frame_count != 0 {
            ContainerHeader::new(format, declared_frame_count, true)?;
        }

        Ok(WavWriter {
            inner,
            format,
            declared_frame_count,
            frames: Vec::new(),
            sample_loop: None,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Number of whole frames buffered so far. `write_frames` keeps this within u32.
    pub fn frames_written(&self) -> u32 {
        (self.frames.len() / self.format.frame_width()) as u32
    }

    /// Appends raw frame bytes. The length must be a whole number of frames.
    pub fn write_frames(&mut self, bytes: &[u8]) -> Result<(), WavError> {
        let frame_width = self.format.frame_width();
        if bytes.len() % frame_width != 0 {
            return Err(WavError::Alignment {
                len: bytes.len(),
                frame_width,
            });
        }

        // Refuse anything the finished container could not describe.
        let total_frames = (self.frames.len() + bytes.len()) / frame_width;
        let total_frames = u32::try_from(total_frames).map_err(|_| too_large(total_frames))?;
        ContainerHeader::new(self.format, total_frames, true)?;

        self.frames.extend_from_slice(bytes);
        Ok(())
    }

    /// Requests a `smpl` chunk with a single forward loop after the data chunk.
    pub fn attach_loop_descriptor(&mut self, start: u32, end: u32) -> Result<(), WavError> {
        self.sample_loop = Some(SampleLoop::forward(start, end)?);
        Ok(())
    }

    /// Writes the container, flushes, and hands back the underlying writer.
    pub fn finalize(mut self) -> Result<W, WavError> {
        let written = self.frames_written();

        let frame_count = if self.declared_frame_count == 0 {
            written
        } else {
            self.declared_frame_count
        };
        if frame_count != written {
            return Err(WavError::FrameCountMismatch {
                declared: frame_count,
                written,
            });
        }

        let header = ContainerHeader::new(self.format, frame_count, self.sample_loop.is_some())?;
        debug!(
            frames = frame_count,
            data_size = header.data_chunk_size(),
            total_size = header.total_size(),
            has_loop = header.has_loop_chunk(),
            "Finalizing WAV container"
        );

        header.write_to(&mut self.inner)?;
        self.inner.write_all(&self.frames)?;
        if let Some(sample_loop) = self.sample_loop {
            let sampler = SamplerChunk::with_loop(self.format.frame_rate, sample_loop);
            self.inner.write_all(&sampler.to_bytes())?;
        }
        self.inner.flush()?;

        Ok(self.inner)
    }

    /// Finalizes the container and releases the underlying writer.
    /// The writer is dropped whether or not finalizing succeeded.
    pub fn close(self) -> Result<(), WavError> {
        self.finalize().map(drop)
    }
}

fn too_large(frames: usize) -> WavError {
    WavError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} frames do not fit in a RIFF container", frames),
    ))
}
