//! Common test utilities shared by the integration tests.
//!
//! Fake camera feeds and identifiers so sessions can be driven without a
//! device, a network or a model file.

#![allow(dead_code)]

/// Scripted camera feeds
pub mod fake_feed {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use baking_converter::capture::VideoFeed;
    use baking_converter::{BakeError, BakeResult, Frame};

    /// Feed producing solid frames whose shade is the read count.
    pub struct FakeFeed {
        delay: Duration,
        fail_after: Option<usize>,
        fail_every_other: bool,
        reads: usize,
        released: Arc<AtomicUsize>,
        is_released: bool,
    }

    impl FakeFeed {
        pub fn new(released: Arc<AtomicUsize>) -> Self {
            Self {
                delay: Duration::ZERO,
                fail_after: None,
                fail_every_other: false,
                reads: 0,
                released,
                is_released: false,
            }
        }

        /// Block this long inside every read.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Deliver `n` frames, then fail every read.
        pub fn failing_after(mut self, n: usize) -> Self {
            self.fail_after = Some(n);
            self
        }

        /// Alternate between a frame and a read error.
        pub fn flaky(mut self) -> Self {
            self.fail_every_other = true;
            self
        }

        pub fn boxed(self) -> Box<dyn VideoFeed> {
            Box::new(self)
        }
    }

    impl VideoFeed for FakeFeed {
        fn describe(&self) -> String {
            "fake feed".to_string()
        }

        fn read_frame(&mut self) -> BakeResult<Frame> {
            if self.is_released {
                return Err(BakeError::device("fake feed", "released"));
            }
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            if self.fail_after.is_some_and(|n| self.reads >= n) {
                return Err(BakeError::device("fake feed", "unplugged"));
            }
            self.reads += 1;
            if self.fail_every_other && self.reads % 2 == 0 {
                return Err(BakeError::device("fake feed", "dropped frame"));
            }
            super::test_frames::solid(16, 12, self.reads as u8)
        }

        fn release(&mut self) {
            if !self.is_released {
                self.is_released = true;
                self.released.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl Drop for FakeFeed {
        fn drop(&mut self) {
            self.release();
        }
    }
}

/// Identifiers with a fixed answer
pub mod fake_identifier {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use baking_converter::{
        BakeError, BakeResult, DensityTable, Frame, Identification, IngredientIdentifier,
    };

    #[derive(Clone)]
    pub enum Outcome {
        Text(String),
        Nothing,
        Fail(String),
    }

    pub struct FakeIdentifier {
        outcome: Outcome,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeIdentifier {
        pub fn answering(text: &str) -> Arc<Self> {
            Self::new(Outcome::Text(text.to_string()), Duration::ZERO)
        }

        pub fn new(outcome: Outcome, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IngredientIdentifier for FakeIdentifier {
        fn name(&self) -> &str {
            "fake"
        }

        async fn identify(&self, _frame: Arc<Frame>) -> BakeResult<Option<Identification>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.outcome {
                Outcome::Text(text) => Ok(Some(Identification::describe(
                    text.clone(),
                    &DensityTable::default(),
                ))),
                Outcome::Nothing => Ok(None),
                Outcome::Fail(message) => Err(BakeError::backend("fake", message)),
            }
        }
    }
}

/// Test frame utilities
pub mod test_frames {
    use baking_converter::{BakeResult, Frame};

    pub fn solid(width: u32, height: u32, shade: u8) -> BakeResult<Frame> {
        Frame::from_rgb(width, height, vec![shade; (width * height * 3) as usize])
    }
}

/// Session construction helpers
pub mod sessions {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use baking_converter::capture::FrameSource;
    use baking_converter::{BakeError, CaptureSession, IngredientIdentifier};

    use super::fake_feed::FakeFeed;

    /// Session over an always-ready polling feed, no capture file.
    pub fn polling_session(identifier: Arc<dyn IngredientIdentifier>) -> CaptureSession {
        session_writing_to(identifier, None)
    }

    pub fn session_writing_to(
        identifier: Arc<dyn IngredientIdentifier>,
        capture_file: Option<PathBuf>,
    ) -> CaptureSession {
        let released = Arc::new(AtomicUsize::new(0));
        CaptureSession::builder()
            .with_frame_source(FrameSource::polling(move || Ok(FakeFeed::new(released).boxed())))
            .with_identifier(identifier)
            .with_capture_file(capture_file)
            .build()
            .expect("session builds")
    }

    /// Session whose camera never opens.
    pub fn session_without_camera(identifier: Arc<dyn IngredientIdentifier>) -> CaptureSession {
        CaptureSession::builder()
            .with_frame_source(FrameSource::polling(|| {
                Err(BakeError::device("camera 0", "no such device"))
            }))
            .with_identifier(identifier)
            .with_capture_file(None)
            .build()
            .expect("session builds")
    }
}
