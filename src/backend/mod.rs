// SPDX-License-Identifier: MIT
//! Stream backends: the only boundary the capture core depends on.

pub mod jpeg;
pub mod mjpeg;
pub mod replay;
pub mod synthetic;

#[cfg(feature = "gstreamer")]
pub mod gst;

use std::path::Path;
use std::time::Instant;

use crate::error::StreamError;

/// One opaque image buffer pulled from a stream.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: Instant,
    /// Position of this frame within the handle that produced it.
    pub sequence: u64,
}

/// Requested capture resolution. Backends that cannot honour it ignore it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenHint {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl OpenHint {
    /// Builds a hint from CLI-style values where 0 means "unchanged".
    #[must_use]
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self {
            width: (width > 0).then_some(width),
            height: (height > 0).then_some(height),
        }
    }
}

/// An opened connection capable of producing frames.
pub trait StreamHandle {
    /// Blocks until the next frame is available or the read fails.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] when no frame could be produced.
    fn read_frame(&mut self) -> Result<Frame, StreamError>;

    /// Frame rate advertised by the source, or 0 when unknown.
    fn nominal_fps(&self) -> f64;

    fn backend_name(&self) -> &'static str;

    /// Releases the underlying resource. Further reads fail.
    fn close(&mut self) {}
}

pub trait StreamBackend {
    /// Opens `source` and returns a handle ready to read.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] when the source cannot be opened.
    fn open(&mut self, source: &str, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError>;
}

/// How a source identifier is interpreted by [`DefaultBackend`].
#[derive(Debug, PartialEq, Eq)]
pub enum SourceKind<'a> {
    Synthetic(&'a str),
    Device(u32),
    HttpMjpeg(&'a str),
    MjpegFile(&'a Path),
    /// Our own recording, or any media file GStreamer can play.
    File(&'a Path),
    Uri(&'a str),
}

#[must_use]
pub fn classify(source: &str) -> SourceKind<'_> {
    let source = source.trim();

    if let Some(rest) = source.strip_prefix("synthetic:") {
        return SourceKind::Synthetic(rest.trim_start_matches("//"));
    }
    if let Ok(index) = source.parse::<u32>() {
        return SourceKind::Device(index);
    }
    if source.starts_with("http://") {
        return SourceKind::HttpMjpeg(source);
    }
    if source.contains("://") {
        return SourceKind::Uri(source);
    }

    let path = Path::new(source);
    let is_mjpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mjpg") || ext.eq_ignore_ascii_case("mjpeg"));
    if is_mjpeg {
        SourceKind::MjpegFile(path)
    } else {
        SourceKind::File(path)
    }
}

/// Dispatches each source form to the backend able to handle it.
#[derive(Default)]
pub struct DefaultBackend {
    synthetic_opens: u32,
}

impl DefaultBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamBackend for DefaultBackend {
    fn open(&mut self, source: &str, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
        match classify(source) {
            SourceKind::Synthetic(query) => {
                self.synthetic_opens += 1;
                let handle = synthetic::SyntheticHandle::open(query, hint, self.synthetic_opens)?;
                Ok(Box::new(handle))
            }
            SourceKind::HttpMjpeg(url) => Ok(Box::new(mjpeg::MjpegHandle::connect(url)?)),
            SourceKind::MjpegFile(path) => Ok(Box::new(mjpeg::MjpegHandle::open_file(path)?)),
            SourceKind::File(path) => open_file(path, hint),
            SourceKind::Device(index) => open_device(index, hint),
            SourceKind::Uri(uri) => open_uri(uri, hint),
        }
    }
}

fn open_file(path: &Path, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    if !path.is_file() {
        return Err(StreamError::NotOpened(path.display().to_string()));
    }
    if replay::is_recording(path) {
        return Ok(Box::new(replay::ReplayHandle::open(path)?));
    }
    open_media_file(path, hint)
}

#[cfg(feature = "gstreamer")]
fn open_media_file(path: &Path, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    let uri = gst::file_uri(path)?;
    Ok(Box::new(gst::GstHandle::open(&gst::GstSource::Uri(&uri), hint)?))
}

#[cfg(not(feature = "gstreamer"))]
fn open_media_file(path: &Path, _hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    Err(StreamError::Unsupported(format!(
        "{} is not a streamprobe recording (rebuild with --features gstreamer to play media files)",
        path.display()
    )))
}

#[cfg(feature = "gstreamer")]
fn open_device(index: u32, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    Ok(Box::new(gst::GstHandle::open(&gst::GstSource::Device(index), hint)?))
}

#[cfg(not(feature = "gstreamer"))]
fn open_device(index: u32, _hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    Err(StreamError::Unsupported(format!(
        "camera {index} (rebuild with --features gstreamer)"
    )))
}

#[cfg(feature = "gstreamer")]
fn open_uri(uri: &str, hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    Ok(Box::new(gst::GstHandle::open(&gst::GstSource::Uri(uri), hint)?))
}

#[cfg(not(feature = "gstreamer"))]
fn open_uri(uri: &str, _hint: &OpenHint) -> Result<Box<dyn StreamHandle>, StreamError> {
    Err(StreamError::Unsupported(format!(
        "{uri} (rebuild with --features gstreamer)"
    )))
}
