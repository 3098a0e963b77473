// SPDX-License-Identifier: MIT
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub const MAGIC: [u8; 4] = *b"SPRB";
pub const FORMAT_VERSION: u8 = 1;
pub const EOF_MARKER: [u8; 4] = *b"SPEF";

/// Frame rate used when the source does not advertise one.
pub const FALLBACK_FPS: f64 = 25.0;

/// Sink parameters, fixed when the recording is created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamInfo {
    pub source: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub recording_start: SystemTime,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub format_version: u8,
    pub info: StreamInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FrameRecord {
    /// Capture time relative to the first recorded frame.
    pub offset_ns: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Borrowed counterpart of [`FrameRecord`], written without copying the
/// frame bytes. Both encode to the same postcard bytes.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct FrameRecordRef<'a> {
    pub offset_ns: u64,
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}
