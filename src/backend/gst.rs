// SPDX-License-Identifier: MIT
//! Camera devices and arbitrary URIs (RTSP, HTTP, files) through GStreamer.

use std::path::Path;
use std::time::Instant;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;

use super::{Frame, OpenHint, StreamHandle};
use crate::error::StreamError;

const PREROLL_TIMEOUT_SECS: u64 = 5;
const READ_TIMEOUT_SECS: u64 = 5;

pub enum GstSource<'a> {
    Device(u32),
    Uri(&'a str),
}

pub struct GstHandle {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    pending: Option<gst::Sample>,
    fps: f64,
    sequence: u64,
    closed: bool,
}

/// `file://` URI for a local media file.
///
/// # Errors
///
/// Returns an error if the path cannot be made absolute or encoded.
pub fn file_uri(path: &Path) -> Result<String, StreamError> {
    let absolute = path.canonicalize()?;
    gst::glib::filename_to_uri(&absolute, None)
        .map(|uri| uri.to_string())
        .map_err(|e| StreamError::NotOpened(format!("{}: {e}", path.display())))
}

fn pipeline_description(source: &GstSource<'_>, hint: &OpenHint) -> String {
    let src = match source {
        GstSource::Device(index) => format!("v4l2src device=/dev/video{index}"),
        GstSource::Uri(uri) => format!("uridecodebin uri=\"{uri}\""),
    };

    let mut caps = String::from("video/x-raw,format=BGR");
    if let Some(w) = hint.width {
        caps.push_str(&format!(",width={w}"));
    }
    if let Some(h) = hint.height {
        caps.push_str(&format!(",height={h}"));
    }

    format!(
        "{src} ! videoconvert ! videoscale ! {caps} ! appsink name=sink sync=false max-buffers=2"
    )
}

fn bus_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let msg = bus.timed_pop_filtered(gst::ClockTime::ZERO, &[gst::MessageType::Error])?;
    match msg.view() {
        gst::MessageView::Error(err) => Some(format!(
            "{} ({})",
            err.error(),
            err.debug().unwrap_or_default()
        )),
        _ => None,
    }
}

fn caps_dimensions(sample: &gst::Sample) -> (u32, u32, f64) {
    let Some(structure) = sample.caps().and_then(|caps| caps.structure(0)) else {
        return (0, 0, 0.0);
    };
    let width = structure.get::<i32>("width").unwrap_or(0);
    let height = structure.get::<i32>("height").unwrap_or(0);
    let fps = structure
        .get::<gst::Fraction>("framerate")
        .ok()
        .filter(|f| f.denom() != 0)
        .map_or(0.0, |f| f64::from(f.numer()) / f64::from(f.denom()));
    (
        u32::try_from(width).unwrap_or(0),
        u32::try_from(height).unwrap_or(0),
        fps,
    )
}

impl GstHandle {
    /// Builds and starts the pipeline, waiting for the first sample so a
    /// source that cannot deliver frames fails here rather than on read.
    ///
    /// # Errors
    ///
    /// Returns an error if GStreamer cannot build or start the pipeline or
    /// no frame arrives in time.
    pub fn open(source: &GstSource<'_>, hint: &OpenHint) -> Result<Self, StreamError> {
        gst::init().map_err(|e| StreamError::NotOpened(format!("GStreamer init: {e}")))?;

        let description = pipeline_description(source, hint);
        log::debug!("gstreamer pipeline: {description}");

        let pipeline = gst::parse::launch(&description)
            .map_err(|e| StreamError::NotOpened(format!("invalid pipeline: {e}")))?
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| StreamError::NotOpened("pipeline has no top-level bin".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| StreamError::NotOpened("appsink missing".into()))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| StreamError::NotOpened("sink is not an appsink".into()))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| StreamError::NotOpened(format!("failed to start pipeline: {e:?}")))?;

        let Some(first) =
            appsink.try_pull_sample(gst::ClockTime::from_seconds(PREROLL_TIMEOUT_SECS))
        else {
            let reason = bus_error(&pipeline).unwrap_or_else(|| "no frame received".into());
            pipeline.set_state(gst::State::Null).ok();
            return Err(StreamError::NotOpened(reason));
        };

        let (_, _, fps) = caps_dimensions(&first);

        Ok(Self {
            pipeline,
            appsink,
            pending: Some(first),
            fps,
            sequence: 0,
            closed: false,
        })
    }

    fn next_sample(&mut self) -> Result<gst::Sample, StreamError> {
        if let Some(sample) = self.pending.take() {
            return Ok(sample);
        }
        if let Some(sample) = self
            .appsink
            .try_pull_sample(gst::ClockTime::from_seconds(READ_TIMEOUT_SECS))
        {
            return Ok(sample);
        }
        if self.appsink.is_eos() {
            return Err(StreamError::EndOfStream);
        }
        Err(StreamError::Read(
            bus_error(&self.pipeline).unwrap_or_else(|| "timed out waiting for frame".into()),
        ))
    }
}

impl StreamHandle for GstHandle {
    fn read_frame(&mut self) -> Result<Frame, StreamError> {
        if self.closed {
            return Err(StreamError::Read("handle is closed".into()));
        }

        let sample = self.next_sample()?;
        let buffer = sample
            .buffer()
            .ok_or_else(|| StreamError::Read("sample without buffer".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|e| StreamError::Read(format!("failed to map buffer: {e}")))?;
        let (width, height, _) = caps_dimensions(&sample);

        let frame = Frame {
            data: map.as_slice().to_vec(),
            width,
            height,
            captured_at: Instant::now(),
            sequence: self.sequence,
        };
        self.sequence += 1;
        Ok(frame)
    }

    fn nominal_fps(&self) -> f64 {
        self.fps
    }

    fn backend_name(&self) -> &'static str {
        "gstreamer"
    }

    fn close(&mut self) {
        if !self.closed {
            self.pending = None;
            self.pipeline.set_state(gst::State::Null).ok();
            self.closed = true;
        }
    }
}

impl Drop for GstHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_applies_resolution_hint() {
        let hint = OpenHint {
            width: Some(1280),
            height: None,
        };
        let desc = pipeline_description(&GstSource::Device(1), &hint);
        assert!(desc.starts_with("v4l2src device=/dev/video1 "));
        assert!(desc.contains("video/x-raw,format=BGR,width=1280 !"));

        let desc = pipeline_description(&GstSource::Uri("rtsp://cam/1"), &OpenHint::default());
        assert!(desc.starts_with("uridecodebin uri=\"rtsp://cam/1\""));
        assert!(desc.ends_with("appsink name=sink sync=false max-buffers=2"));
    }

    #[test]
    fn local_files_become_file_uris() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my clip.mp4");
        std::fs::write(&path, b"not really video").unwrap();

        let uri = file_uri(&path).unwrap();
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("/my%20clip.mp4"));
        assert!(file_uri(&dir.path().join("absent.mp4")).is_err());
    }
}
