//! MJPEG-over-HTTP camera feed.

use std::io::Read;
use std::time::Duration;

use tracing::{debug, info};

use super::{MjpegReader, VideoFeed};
use crate::error::{BakeError, BakeResult};
use crate::frame::Frame;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NetworkFeed {
    url: String,
    reader: Option<MjpegReader<Box<dyn Read + Send>>>,
}

impl NetworkFeed {
    /// Open the stream and check the status line. The body is read lazily.
    pub fn connect(url: &str) -> BakeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            // the body is an endless stream
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| BakeError::device(url, e))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| BakeError::device(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BakeError::device(url, format!("HTTP {status}")));
        }
        debug!(
            url,
            content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
            "network feed connected"
        );
        info!(url, "opened network camera");

        Ok(Self::from_reader(url, Box::new(response)))
    }

    /// Wrap an already-open byte stream.
    pub fn from_reader(url: &str, body: Box<dyn Read + Send>) -> Self {
        Self {
            url: url.to_string(),
            reader: Some(MjpegReader::new(body)),
        }
    }
}

impl VideoFeed for NetworkFeed {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn read_frame(&mut self) -> BakeResult<Frame> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| BakeError::device(&self.url, "feed released"))?;
        let jpeg = reader.next_jpeg()?;
        Frame::decode(&jpeg)
    }

    fn release(&mut self) {
        if self.reader.take().is_some() {
            debug!(url = %self.url, "network feed released");
        }
    }
}

impl Drop for NetworkFeed {
    fn drop(&mut self) {
        self.release();
    }
}
