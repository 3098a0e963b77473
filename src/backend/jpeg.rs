// SPDX-License-Identifier: MIT
//! Splits a byte stream into whole JPEG images without decoding them.
//!
//! Anything between images (multipart boundaries, part headers, padding)
//! is skipped while hunting for the next start-of-image marker. Marker
//! segments are walked by length up to start-of-scan, so APPn payloads
//! such as embedded thumbnails never end an image early. Dimensions come
//! from the image header, read by `image`.

use std::io::{BufRead, Cursor, ErrorKind, Read};

use image::{ImageFormat, ImageReader};

use crate::error::StreamError;

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Default size limit per image; a source that never sends EOI fails here.
pub const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

pub struct JpegImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub struct JpegSplitter<R> {
    reader: R,
    max_image_bytes: usize,
}

impl<R: BufRead> JpegSplitter<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_IMAGE_BYTES)
    }

    pub fn with_limit(reader: R, max_image_bytes: usize) -> Self {
        Self {
            reader,
            max_image_bytes,
        }
    }

    /// Returns the next complete image, or `None` at a clean end of input.
    ///
    /// # Errors
    ///
    /// Returns an error when reading fails or the input ends mid-image.
    pub fn next_image(&mut self) -> Result<Option<JpegImage>, StreamError> {
        if !self.seek_start_of_image()? {
            return Ok(None);
        }

        let mut data = vec![MARKER, SOI];
        let mut marker = self.read_marker()?;

        loop {
            data.extend_from_slice(&[MARKER, marker]);
            match marker {
                EOI => {
                    let (width, height) = dimensions(&data)?;
                    return Ok(Some(JpegImage {
                        data,
                        width,
                        height,
                    }));
                }
                TEM | 0xD0..=0xD7 => marker = self.read_marker()?,
                _ => {
                    self.read_segment(&mut data)?;
                    marker = if marker == SOS {
                        self.read_entropy_data(&mut data)?
                    } else {
                        self.read_marker()?
                    };
                }
            }
            if data.len() > self.max_image_bytes {
                return Err(self.too_large());
            }
        }
    }

    fn too_large(&self) -> StreamError {
        StreamError::Format(format!(
            "JPEG image exceeds {} bytes without an end marker",
            self.max_image_bytes
        ))
    }

    fn byte(&mut self) -> Result<Option<u8>, StreamError> {
        let mut buf = [0u8; 1];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(StreamError::Io(e)),
        }
    }

    fn required_byte(&mut self) -> Result<u8, StreamError> {
        self.byte()?
            .ok_or_else(|| StreamError::Format("stream ended inside a JPEG image".into()))
    }

    fn seek_start_of_image(&mut self) -> Result<bool, StreamError> {
        let mut previous = 0u8;
        while let Some(b) = self.byte()? {
            if previous == MARKER && b == SOI {
                return Ok(true);
            }
            previous = b;
        }
        Ok(false)
    }

    fn read_marker(&mut self) -> Result<u8, StreamError> {
        let b = self.required_byte()?;
        if b != MARKER {
            return Err(StreamError::Format(format!(
                "expected JPEG marker, found 0x{b:02X}"
            )));
        }
        let mut marker = self.required_byte()?;
        while marker == MARKER {
            marker = self.required_byte()?;
        }
        Ok(marker)
    }

    /// Reads a length-prefixed segment body, appending it to `out`.
    fn read_segment(&mut self, out: &mut Vec<u8>) -> Result<(), StreamError> {
        let hi = self.required_byte()?;
        let lo = self.required_byte()?;
        let len = usize::from(u16::from_be_bytes([hi, lo]));
        if len < 2 {
            return Err(StreamError::Format(format!("invalid segment length {len}")));
        }
        let mut body = vec![0u8; len - 2];
        self.reader.read_exact(&mut body).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                StreamError::Format("stream ended inside a JPEG segment".into())
            } else {
                StreamError::Io(e)
            }
        })?;
        out.extend_from_slice(&[hi, lo]);
        out.extend_from_slice(&body);
        Ok(())
    }

    /// Copies entropy-coded data up to the next real marker and returns it.
    fn read_entropy_data(&mut self, out: &mut Vec<u8>) -> Result<u8, StreamError> {
        loop {
            if out.len() > self.max_image_bytes {
                return Err(self.too_large());
            }
            let b = self.required_byte()?;
            if b != MARKER {
                out.push(b);
                continue;
            }
            let mut next = self.required_byte()?;
            while next == MARKER {
                next = self.required_byte()?;
            }
            match next {
                // Stuffed 0xFF byte or restart marker: still scan data.
                0x00 | 0xD0..=0xD7 => out.extend_from_slice(&[MARKER, next]),
                marker => return Ok(marker),
            }
        }
    }
}

fn dimensions(data: &[u8]) -> Result<(u32, u32), StreamError> {
    ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| StreamError::Format(format!("unreadable JPEG header: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use image::ExtendedColorType;
    use image::codecs::jpeg::JpegEncoder;

    use super::*;

    /// A flat grey JPEG with an extra APP15 segment whose payload holds a
    /// stray end-of-image marker.
    pub(crate) fn tiny_jpeg(width: u16, height: u16, shade: u8) -> Vec<u8> {
        let pixels = vec![shade; usize::from(width) * usize::from(height)];
        let mut encoded = Vec::new();
        JpegEncoder::new(&mut encoded)
            .encode(
                &pixels,
                u32::from(width),
                u32::from(height),
                ExtendedColorType::L8,
            )
            .unwrap();

        let mut out = encoded[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xEF, 0x00, 0x06, 0xFF, 0xD9, 0x00, 0x00]);
        out.extend_from_slice(&encoded[2..]);
        out
    }

    #[test]
    fn splits_images_and_reads_dimensions() {
        let first = tiny_jpeg(64, 48, 0x20);
        let second = tiny_jpeg(32, 24, 0xC0);

        let mut stream = b"--boundary\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        stream.extend_from_slice(&first);
        stream.extend_from_slice(b"\r\n--boundary\r\n\r\n");
        stream.extend_from_slice(&second);

        let mut splitter = JpegSplitter::new(Cursor::new(stream));

        let a = splitter.next_image().unwrap().expect("first image");
        assert_eq!((a.width, a.height), (64, 48));
        assert_eq!(a.data, first);

        let b = splitter.next_image().unwrap().expect("second image");
        assert_eq!((b.width, b.height), (32, 24));
        assert_eq!(b.data, second);

        assert!(splitter.next_image().unwrap().is_none());
    }

    #[test]
    fn truncated_image_is_a_format_error() {
        let mut data = tiny_jpeg(16, 16, 0x80);
        data.truncate(data.len() - 3);
        let mut splitter = JpegSplitter::new(Cursor::new(data));
        assert!(matches!(
            splitter.next_image(),
            Err(StreamError::Format(_))
        ));
    }

    #[test]
    fn endless_scan_data_is_capped() {
        let header = tiny_jpeg(8, 8, 0x10);
        let sos = header
            .windows(2)
            .position(|w| w == [MARKER, SOS])
            .expect("scan header");
        let scan_len = usize::from(u16::from_be_bytes([header[sos + 2], header[sos + 3]]));
        let mut stream = header[..sos + 2 + scan_len].to_vec();
        stream.resize(stream.len() + 8192, 0x55);

        let mut splitter = JpegSplitter::with_limit(Cursor::new(stream), 4096);
        let Err(StreamError::Format(message)) = splitter.next_image() else {
            panic!("expected the size cap to trip");
        };
        assert!(message.contains("exceeds"));
    }
}
