//! Still RGB8 frames.
//!
//! A [`Frame`] is immutable once built and is passed around as `Arc<Frame>`:
//! the live mailbox, the held capture and in-flight analyses can all point at
//! the same pixels without copying.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use frame_scale::presets::Size;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};

use crate::error::{BakeError, BakeResult};

/// Default JPEG quality for the capture file and cloud payload.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB8, `width * height * 3` bytes
    pub pixels: Vec<u8>,
    /// Arrival order, assigned when the frame is published
    pub sequence: u64,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl Frame {
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> BakeResult<Self> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(BakeError::io(
                "building frame",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "{width}x{height} RGB frame needs {expected} bytes, got {}",
                        pixels.len()
                    ),
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
            sequence: 0,
        })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        let rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        Self {
            width,
            height,
            pixels: rgb.into_raw(),
            sequence: 0,
        }
    }

    /// Decode a JPEG (or any enabled format) from memory.
    pub fn decode(bytes: &[u8]) -> BakeResult<Self> {
        Ok(Self::from_image(image::load_from_memory(bytes)?))
    }

    /// Load a still image from disk.
    pub fn open(path: impl AsRef<Path>) -> BakeResult<Self> {
        Ok(Self::from_image(image::open(path.as_ref())?))
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.width,
            h: self.height,
        }
    }

    pub fn encode_jpeg(&self, quality: u8) -> BakeResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.pixels.len() / 8);
        self.write_jpeg(&mut out, quality)?;
        Ok(out)
    }

    /// Write the frame as JPEG, replacing any existing file at `path`.
    pub fn save_jpeg(&self, path: impl AsRef<Path>, quality: u8) -> BakeResult<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| BakeError::io(format!("creating {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        self.write_jpeg(&mut writer, quality)?;
        writer
            .flush()
            .map_err(|e| BakeError::io(format!("writing {}", path.display()), e))
    }

    fn write_jpeg<W: Write>(&self, writer: W, quality: u8) -> BakeResult<()> {
        let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
        encoder.encode(&self.pixels, self.width, self.height, ExtendedColorType::Rgb8)?;
        Ok(())
    }
}
