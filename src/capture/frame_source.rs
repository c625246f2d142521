//! # Frame Source
//!
//! Gives the session the newest camera frame without ever blocking the UI.
//!
//! Two reading strategies sit behind one type:
//!
//! - **Threaded**: a dedicated reader thread owns the feed and publishes into
//!   a [`FrameMailbox`]; `latest()` is a cheap slot read.
//! - **Polling**: the feed is read inline, one frame per `latest()` call.
//!
//! Failure policy:
//!
//! | Event | Threaded | Polling |
//! |-------|----------|---------|
//! | feed fails to open | absent forever, warned once | absent forever, warned once |
//! | read fails | slot cleared, feed released, absent forever | absent for that call only |
//!
//! `shutdown()` stops the reader, waits at most [`SHUTDOWN_TIMEOUT`] for the
//! device to be released and runs again from `Drop`, so the camera is handed
//! back on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};
use tracing::{debug, info, warn};

use super::{FeedSource, FrameMailbox, VideoFeed};
use crate::error::BakeResult;
use crate::frame::Frame;

/// Upper bound on how long shutdown waits for the reader thread.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Deferred feed construction, run on the reader thread.
pub type FeedOpener = Box<dyn FnOnce() -> BakeResult<Box<dyn VideoFeed>> + Send>;

pub struct FrameSource {
    reader: Reader,
}

enum Reader {
    Threaded(Threaded),
    Polling(Polling),
}

struct Threaded {
    mailbox: Arc<FrameMailbox>,
    live: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    /// Disconnects when the reader thread exits
    done: Option<crossbeam_channel::Receiver<()>>,
    handle: Option<JoinHandle<()>>,
    timeout: Duration,
}

struct Polling {
    feed: Option<Box<dyn VideoFeed>>,
    mailbox: FrameMailbox,
    live: bool,
}

impl FrameSource {
    /// Open `source` on a background reader thread.
    pub fn threaded(source: FeedSource) -> Self {
        Self::spawn_reader(Box::new(move || source.open()))
    }

    /// Run `opener` on a new reader thread and keep publishing its frames.
    pub fn spawn_reader(opener: FeedOpener) -> Self {
        Self::spawn_reader_with_timeout(opener, SHUTDOWN_TIMEOUT)
    }

    pub fn spawn_reader_with_timeout(opener: FeedOpener, timeout: Duration) -> Self {
        let mailbox = Arc::new(FrameMailbox::new());
        let live = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded::<()>(1);

        let spawned = {
            let mailbox = Arc::clone(&mailbox);
            let live = Arc::clone(&live);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("frame-reader".into())
                .spawn(move || {
                    let _done = done_tx;
                    read_loop(opener, &mailbox, &live, &stop);
                })
        };

        let (done, handle) = match spawned {
            Ok(handle) => (Some(done_rx), Some(handle)),
            Err(e) => {
                warn!(error = %e, "failed to start frame reader thread; no live frames");
                (None, None)
            }
        };

        Self {
            reader: Reader::Threaded(Threaded {
                mailbox,
                live,
                stop,
                done,
                handle,
                timeout,
            }),
        }
    }

    /// Open the feed now and read it inline on every `latest()` call.
    pub fn polling<F>(opener: F) -> Self
    where
        F: FnOnce() -> BakeResult<Box<dyn VideoFeed>>,
    {
        let feed = match opener() {
            Ok(feed) => {
                info!(feed = %feed.describe(), "polling frame source ready");
                Some(feed)
            }
            Err(e) => {
                warn!(error = %e, "video feed unavailable; no live frames");
                None
            }
        };
        Self {
            reader: Reader::Polling(Polling {
                feed,
                mailbox: FrameMailbox::new(),
                live: true,
            }),
        }
    }

    /// Newest frame, or `None` when nothing is available. Never errors.
    pub fn latest(&mut self) -> Option<Arc<Frame>> {
        match &mut self.reader {
            Reader::Threaded(t) if t.stop.load(Ordering::Acquire) => None,
            Reader::Threaded(t) => t.mailbox.latest(),
            Reader::Polling(p) => {
                if !p.live {
                    return p.mailbox.latest();
                }
                let feed = p.feed.as_mut()?;
                match feed.read_frame() {
                    Ok(frame) => {
                        p.mailbox.publish(frame);
                        p.mailbox.latest()
                    }
                    Err(e) => {
                        debug!(error = %e, "poll produced no frame");
                        None
                    }
                }
            }
        }
    }

    /// Stop refreshing the live frame.
    pub fn pause(&mut self) {
        self.set_live(false);
    }

    pub fn resume(&mut self) {
        self.set_live(true);
    }

    pub fn is_live(&self) -> bool {
        match &self.reader {
            Reader::Threaded(t) => t.live.load(Ordering::Acquire),
            Reader::Polling(p) => p.live,
        }
    }

    /// Frames published since construction.
    pub fn published(&self) -> u64 {
        match &self.reader {
            Reader::Threaded(t) => t.mailbox.published(),
            Reader::Polling(p) => p.mailbox.published(),
        }
    }

    fn set_live(&mut self, live: bool) {
        match &mut self.reader {
            Reader::Threaded(t) => t.live.store(live, Ordering::Release),
            Reader::Polling(p) => p.live = live,
        }
    }

    /// Stop reading and release the device. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        match &mut self.reader {
            Reader::Threaded(t) => t.shutdown(),
            Reader::Polling(p) => {
                if let Some(mut feed) = p.feed.take() {
                    feed.release();
                    debug!("polling frame source released");
                }
                p.mailbox.clear();
            }
        }
    }
}

impl Threaded {
    fn shutdown(&mut self) {
        let Some(done) = self.done.take() else {
            return;
        };
        self.live.store(false, Ordering::Release);
        self.stop.store(true, Ordering::Release);
        match done.recv_timeout(self.timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "frame reader did not stop in time; detaching"
                );
                self.handle.take();
            }
            _ => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        warn!("frame reader thread panicked");
                    }
                }
            }
        }
        self.mailbox.clear();
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_loop(opener: FeedOpener, mailbox: &FrameMailbox, live: &AtomicBool, stop: &AtomicBool) {
    let mut feed = match opener() {
        Ok(feed) => feed,
        Err(e) => {
            warn!(error = %e, "video feed unavailable; no live frames");
            return;
        }
    };
    info!(feed = %feed.describe(), "frame reader started");

    while !stop.load(Ordering::Acquire) {
        match feed.read_frame() {
            // paused: keep draining the device so the next frame is fresh
            Ok(frame) if live.load(Ordering::Acquire) && !stop.load(Ordering::Acquire) => {
                mailbox.publish(frame);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(feed = %feed.describe(), error = %e, "video feed stopped delivering frames");
                mailbox.clear();
                break;
            }
        }
    }

    feed.release();
    debug!(published = mailbox.published(), "frame reader exited");
}
