//! Splits a motion-JPEG byte stream into individual JPEG images.
//!
//! Multipart boundaries and headers are ignored; frames are found by their
//! SOI (`FF D8`) and EOI (`FF D9`) markers, which works for both
//! `multipart/x-mixed-replace` HTTP bodies and ffmpeg's `image2pipe` output.

use std::io::Read;

use crate::error::{BakeError, BakeResult};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const READ_CHUNK: usize = 64 * 1024;

/// Largest single JPEG accepted before the stream is considered corrupt.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub struct MjpegReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_frame: usize,
}

impl<R: Read> MjpegReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, MAX_FRAME_BYTES)
    }

    pub fn with_limit(inner: R, max_frame: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK * 2),
            max_frame,
        }
    }

    /// Next complete JPEG, markers included.
    pub fn next_jpeg(&mut self) -> BakeResult<Vec<u8>> {
        let mut scanned = 0;
        loop {
            if let Some(start) = find(&self.buf, &SOI, 0) {
                if start > 0 {
                    self.buf.drain(..start);
                    scanned = 0;
                }
                // EOI can only appear after the SOI marker
                let from = scanned.max(SOI.len());
                if let Some(end) = find(&self.buf, &EOI, from) {
                    let jpeg: Vec<u8> = self.buf.drain(..end + EOI.len()).collect();
                    return Ok(jpeg);
                }
                scanned = self.buf.len().saturating_sub(1);
                if self.buf.len() > self.max_frame {
                    self.buf.clear();
                    return Err(BakeError::device(
                        "mjpeg stream",
                        format!("frame exceeds {} bytes", self.max_frame),
                    ));
                }
            } else {
                // keep a trailing 0xFF in case it starts the next SOI
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                let cut = self.buf.len() - keep;
                self.buf.drain(..cut);
                scanned = 0;
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> BakeResult<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self
            .inner
            .read(&mut chunk)
            .map_err(|e| BakeError::device("mjpeg stream", e))?;
        if n == 0 {
            return Err(BakeError::device("mjpeg stream", "stream ended"));
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8; 2], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(2)
        .position(|w| w == needle)
        .map(|p| p + from)
}
