//! Local camera feed through an `ffmpeg` subprocess.
//!
//! ffmpeg opens the platform camera API and writes MJPEG to stdout, which is
//! split with [`MjpegReader`]. The child is killed and reaped on release.

use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use super::{MjpegReader, VideoFeed};
use crate::error::{BakeError, BakeResult};
use crate::frame::Frame;

pub struct DeviceFeed {
    index: u32,
    child: Option<Child>,
    reader: Option<MjpegReader<ChildStdout>>,
}

/// Input arguments selecting camera `index` on this platform.
pub fn input_args(index: u32) -> Vec<String> {
    #[cfg(target_os = "linux")]
    let args = vec!["-f", "v4l2", "-i"]
        .into_iter()
        .map(String::from)
        .chain([format!("/dev/video{index}")])
        .collect();

    #[cfg(target_os = "macos")]
    let args = vec!["-f", "avfoundation", "-framerate", "30", "-i"]
        .into_iter()
        .map(String::from)
        .chain([format!("{index}:none")])
        .collect();

    #[cfg(target_os = "windows")]
    let args = vec!["-f", "dshow", "-i"]
        .into_iter()
        .map(String::from)
        .chain([format!("video={index}")])
        .collect();

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    let args = vec!["-i".to_string(), index.to_string()];

    args
}

impl DeviceFeed {
    pub fn open(index: u32) -> BakeResult<Self> {
        let name = format!("camera {index}");
        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(input_args(index))
            .args(["-an", "-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "3", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BakeError::device(&name, format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BakeError::device(&name, "ffmpeg stdout not available"));
            }
        };
        info!(index, "opened local camera via ffmpeg");

        Ok(Self {
            index,
            child: Some(child),
            reader: Some(MjpegReader::new(stdout)),
        })
    }
}

impl VideoFeed for DeviceFeed {
    fn describe(&self) -> String {
        format!("camera {}", self.index)
    }

    fn read_frame(&mut self) -> BakeResult<Frame> {
        let name = format!("camera {}", self.index);
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| BakeError::device(&name, "feed released"))?;
        match reader.next_jpeg() {
            Ok(jpeg) => Frame::decode(&jpeg),
            // ffmpeg exits immediately when the device does not exist
            Err(BakeError::DeviceUnavailable { reason, .. }) => Err(BakeError::device(name, reason)),
            Err(other) => Err(other),
        }
    }

    fn release(&mut self) {
        self.reader.take();
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "ffmpeg already exited");
            }
            match child.wait() {
                Ok(status) => debug!(index = self.index, %status, "camera released"),
                Err(e) => warn!(index = self.index, error = %e, "failed to reap ffmpeg"),
            }
        }
    }
}

impl Drop for DeviceFeed {
    fn drop(&mut self) {
        self.release();
    }
}
