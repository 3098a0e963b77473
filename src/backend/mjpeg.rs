// SPDX-License-Identifier: MIT
//! Motion-JPEG sources: `multipart/x-mixed-replace` over HTTP, or a file of
//! concatenated JPEG images.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use super::jpeg::JpegSplitter;
use super::{Frame, StreamHandle};
use crate::error::StreamError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MjpegHandle {
    splitter: Option<JpegSplitter<Box<dyn BufRead + Send>>>,
    sequence: u64,
}

impl MjpegHandle {
    /// Issues a GET request and checks the response carries JPEG data.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the content type is not
    /// MJPEG.
    pub fn connect(url: &str) -> Result<Self, StreamError> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        let response = agent
            .get(url)
            .call()
            .map_err(|e| StreamError::Http(e.to_string()))?;

        let content_type = response.content_type().to_ascii_lowercase();
        if !content_type.starts_with("multipart/") && content_type != "image/jpeg" {
            return Err(StreamError::Unsupported(format!(
                "{url} serves '{content_type}', expected an MJPEG stream"
            )));
        }

        log::debug!("connected to {url} ({content_type})");
        Ok(Self::from_reader(response.into_reader()))
    }

    /// Opens a file of back-to-back JPEG images.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_file(path: &Path) -> Result<Self, StreamError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }

    fn from_reader(reader: impl Read + Send + 'static) -> Self {
        let buffered: Box<dyn BufRead + Send> = Box::new(BufReader::new(reader));
        Self {
            splitter: Some(JpegSplitter::new(buffered)),
            sequence: 0,
        }
    }
}

impl StreamHandle for MjpegHandle {
    fn read_frame(&mut self) -> Result<Frame, StreamError> {
        let splitter = self
            .splitter
            .as_mut()
            .ok_or_else(|| StreamError::Read("handle is closed".into()))?;
        let image = splitter.next_image()?.ok_or(StreamError::EndOfStream)?;

        let frame = Frame {
            data: image.data,
            width: image.width,
            height: image.height,
            captured_at: Instant::now(),
            sequence: self.sequence,
        };
        self.sequence += 1;
        Ok(frame)
    }

    fn nominal_fps(&self) -> f64 {
        0.0
    }

    fn backend_name(&self) -> &'static str {
        "mjpeg"
    }

    fn close(&mut self) {
        self.splitter = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jpeg::tests::tiny_jpeg;

    #[test]
    fn file_frames_are_numbered_until_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mjpg");
        let mut data = tiny_jpeg(64, 48, 0x10);
        data.extend_from_slice(&tiny_jpeg(64, 48, 0x90));
        std::fs::write(&path, &data).unwrap();

        let mut handle = MjpegHandle::open_file(&path).unwrap();
        let first = handle.read_frame().unwrap();
        let second = handle.read_frame().unwrap();
        assert_eq!((first.sequence, second.sequence), (0, 1));
        assert_eq!((second.width, second.height), (64, 48));
        assert!(matches!(
            handle.read_frame(),
            Err(StreamError::EndOfStream)
        ));
    }

    #[test]
    fn closed_handle_refuses_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mjpeg");
        std::fs::write(&path, tiny_jpeg(8, 8, 0x10)).unwrap();

        let mut handle = MjpegHandle::open_file(&path).unwrap();
        handle.close();
        assert!(matches!(handle.read_frame(), Err(StreamError::Read(_))));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let result = MjpegHandle::open_file(&dir.path().join("absent.mjpg"));
        assert!(matches!(result, Err(StreamError::Io(_))));
    }
}
