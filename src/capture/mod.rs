//! # Capture Module
//!
//! Video feeds and the live-frame plumbing in front of them.
//!
//! - [`FeedSource`]: which camera to open (local device index or network URL)
//! - [`VideoFeed`]: a blocking, open camera handle
//! - [`FrameMailbox`]: single-slot, last-write-wins hand-off of the newest frame
//! - [`FrameSource`]: background reader (threaded) or on-demand reader
//!   (polling) that keeps the mailbox fresh

pub mod device;
pub mod frame_source;
pub mod mailbox;
pub mod mjpeg;
pub mod network;

use std::fmt;

use crate::error::BakeResult;
use crate::frame::Frame;

pub use device::DeviceFeed;
pub use frame_source::{FeedOpener, FrameSource, SHUTDOWN_TIMEOUT};
pub use mailbox::FrameMailbox;
pub use mjpeg::MjpegReader;
pub use network::NetworkFeed;

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Local camera by index (0 = default camera)
    Device(u32),
    /// MJPEG over HTTP, e.g. a phone running an IP camera app
    Network(String),
}

impl Default for FeedSource {
    fn default() -> Self {
        FeedSource::Device(0)
    }
}

impl FeedSource {
    /// `http://{host}:{port}/video` when both parts are present, else the
    /// default local camera.
    pub fn from_host_port(host: Option<&str>, port: Option<&str>) -> Self {
        match (
            host.map(str::trim).filter(|h| !h.is_empty()),
            port.map(str::trim).filter(|p| !p.is_empty()),
        ) {
            (Some(host), Some(port)) => FeedSource::Network(format!("http://{host}:{port}/video")),
            _ => FeedSource::Device(0),
        }
    }

    /// Open the feed. Blocks until the device or stream answers.
    pub fn open(&self) -> BakeResult<Box<dyn VideoFeed>> {
        match self {
            FeedSource::Device(index) => Ok(Box::new(DeviceFeed::open(*index)?)),
            FeedSource::Network(url) => Ok(Box::new(NetworkFeed::connect(url)?)),
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Device(index) => write!(f, "camera {index}"),
            FeedSource::Network(url) => f.write_str(url),
        }
    }
}

/// An open camera.
///
/// Implementations release their device handle on drop; `release` may be
/// called earlier and must be safe to call more than once.
pub trait VideoFeed: Send {
    fn describe(&self) -> String;

    /// Block until the next frame is decoded.
    fn read_frame(&mut self) -> BakeResult<Frame>;

    fn release(&mut self);
}
