// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::format::{EOF_MARKER, FORMAT_VERSION, FileHeader, FrameRecord, MAGIC, StreamInfo};

/// Streams frames out of a recording without loading it whole.
pub struct RecordingReader {
    info: StreamInfo,
    decoder: zstd::Decoder<'static, BufReader<File>>,
    finished: bool,
}

impl RecordingReader {
    /// Opens a recording file and validates the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the header is invalid.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open recording file: {}", path.display()))?;
        let mut decoder = zstd::Decoder::new(file).context("failed to create zstd decoder")?;

        let header = Self::read_header(&mut decoder)?;

        if header.magic != MAGIC {
            bail!("invalid magic bytes in recording file");
        }
        if header.format_version != FORMAT_VERSION {
            bail!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                header.format_version
            );
        }

        Ok(Self {
            info: header.info,
            decoder,
            finished: false,
        })
    }

    #[must_use]
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Returns the next frame, or `None` once the EOF marker (or a truncated
    /// end of file) is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if frame data is corrupted.
    pub fn next_frame(&mut self) -> Result<Option<FrameRecord>> {
        if self.finished {
            return Ok(None);
        }

        let mut len_buf = [0u8; 4];
        match self.decoder.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finished = true;
                return Ok(None);
            }
            Err(e) => return Err(e).context("failed to read frame length"),
        }

        if len_buf == EOF_MARKER {
            self.finished = true;
            return Ok(None);
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        let mut data = vec![0u8; len];
        self.decoder
            .read_exact(&mut data)
            .context("failed to read frame data")?;

        let frame = postcard::from_bytes(&data).context("failed to deserialize frame")?;
        Ok(Some(frame))
    }

    fn read_header(reader: &mut impl Read) -> Result<FileHeader> {
        let mut len_buf = [0u8; 4];
        reader
            .read_exact(&mut len_buf)
            .context("failed to read header length")?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut data = vec![0u8; len];
        reader
            .read_exact(&mut data)
            .context("failed to read header data")?;

        postcard::from_bytes(&data).context("failed to deserialize file header")
    }
}
