//! Integration tests for the capture session state machine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use baking_converter::capture::FrameSource;
use baking_converter::{BakeError, CaptureSession, Frame, Identification, SessionState};
use common::fake_identifier::{FakeIdentifier, Outcome};
use common::sessions::{polling_session, session_without_camera, session_writing_to};

#[tokio::test]
async fn analyze_before_capture_asks_for_capture() {
    let mut session = polling_session(FakeIdentifier::answering("Flour"));

    let err = session.analyze().unwrap_err();
    assert!(matches!(err, BakeError::NoCaptureYet));
    assert_eq!(session.status(), "Please capture an image first.");
    assert_eq!(session.state(), SessionState::Streaming);
}

#[tokio::test]
async fn capture_then_retake_returns_to_live_feed() {
    let mut session = polling_session(FakeIdentifier::answering("Flour"));

    session.capture().unwrap();
    assert_eq!(session.state(), SessionState::Captured);
    assert_eq!(session.status(), "Image captured.");
    assert!(session.held_frame().is_some());

    session.retake();
    assert_eq!(session.state(), SessionState::Streaming);
    assert!(session.held_frame().is_none());
    assert_eq!(session.status(), "Resumed video stream.");

    // retake while streaming changes nothing
    session.retake();
    assert_eq!(session.state(), SessionState::Streaming);
}

#[tokio::test]
async fn capture_is_rejected_while_holding_a_frame() {
    let mut session = polling_session(FakeIdentifier::answering("Flour"));
    let first = session.capture().unwrap();

    let err = session.capture().unwrap_err();
    assert!(matches!(err, BakeError::InvalidState { .. }));
    assert_eq!(session.state(), SessionState::Captured);
    assert!(Arc::ptr_eq(session.held_frame().unwrap(), &first));
}

#[tokio::test]
async fn capture_writes_jpeg_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captured_ingredient.jpg");
    let mut session = session_writing_to(FakeIdentifier::answering("Salt"), Some(path.clone()));

    let held = session.capture().unwrap();
    let saved = Frame::open(&path).unwrap();
    assert_eq!(saved.size(), held.size());
}

#[tokio::test]
async fn unwritable_capture_file_still_captures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("capture.jpg");
    let mut session = session_writing_to(FakeIdentifier::answering("Salt"), Some(path.clone()));

    session.capture().unwrap();
    assert_eq!(session.state(), SessionState::Captured);
    assert!(!path.exists());
}

#[tokio::test]
async fn capture_without_frame_stays_streaming() {
    let mut session = session_without_camera(FakeIdentifier::answering("Flour"));

    let err = session.capture().unwrap_err();
    assert!(matches!(err, BakeError::FrameUnavailable));
    assert_eq!(session.status(), "No frame available yet.");
    assert_eq!(session.state(), SessionState::Streaming);
}

#[tokio::test]
async fn analysis_result_is_shown_and_remembered() {
    let identifier = FakeIdentifier::answering("Powdered Sugar, about 0.56 g/mL");
    let mut session = polling_session(identifier.clone());

    session.capture().unwrap();
    session.analyze().unwrap();
    assert_eq!(session.state(), SessionState::Analyzing);
    assert_eq!(session.status(), "Analyzing...");

    session.wait_for_analysis().await.unwrap();
    assert_eq!(session.state(), SessionState::Captured);
    assert_eq!(session.status(), "Powdered Sugar, about 0.56 g/mL");
    let id = session.last_identification().unwrap();
    assert_eq!(id.ingredient(), Some("Powdered Sugar"));
    assert_eq!(identifier.calls(), 1);
}

#[tokio::test]
async fn backend_error_is_reported_verbatim() {
    let mut session = polling_session(FakeIdentifier::new(
        Outcome::Fail("Resource has been exhausted (e.g. check quota).".into()),
        Duration::ZERO,
    ));

    session.capture().unwrap();
    session.analyze().unwrap();
    session.wait_for_analysis().await.unwrap();
    assert_eq!(session.state(), SessionState::Captured);
    assert_eq!(
        session.status(),
        "Error: Resource has been exhausted (e.g. check quota)."
    );
    assert!(session.last_identification().is_none());
}

#[tokio::test]
async fn poll_picks_up_finished_analysis() {
    let mut session = polling_session(FakeIdentifier::answering("Baking Powder"));
    session.capture().unwrap();
    session.analyze().unwrap();

    let mut applied = false;
    for _ in 0..1000 {
        if session.poll_analysis() {
            applied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(applied);
    assert_eq!(session.status(), "Baking Powder");
    assert!(!session.poll_analysis());
}

#[tokio::test]
async fn analyze_twice_is_rejected() {
    let mut session = polling_session(FakeIdentifier::new(
        Outcome::Text("Flour".into()),
        Duration::from_secs(60),
    ));
    session.capture().unwrap();
    session.analyze().unwrap();

    let err = session.analyze().unwrap_err();
    assert!(matches!(err, BakeError::InvalidState { .. }));
    assert_eq!(session.state(), SessionState::Analyzing);
}

#[tokio::test(start_paused = true)]
async fn retake_discards_in_flight_analysis() {
    let identifier = FakeIdentifier::new(Outcome::Text("Flour".into()), Duration::from_secs(10));
    let mut session = polling_session(identifier.clone());
    session.capture().unwrap();
    session.analyze().unwrap();
    tokio::task::yield_now().await;

    session.retake();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(!session.poll_analysis());
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(session.status(), "Resumed video stream.");
    assert!(session.last_identification().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_keeps_the_capture() {
    let mut session = polling_session(FakeIdentifier::new(
        Outcome::Text("Salt".into()),
        Duration::from_secs(10),
    ));
    session.capture().unwrap();
    session.analyze().unwrap();

    session.cancel_analysis().unwrap();
    assert_eq!(session.state(), SessionState::Captured);
    assert_eq!(session.status(), "Analysis cancelled.");
    assert!(session.held_frame().is_some());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!session.poll_analysis());
    assert_eq!(session.status(), "Analysis cancelled.");

    // nothing left to cancel
    assert!(session.cancel_analysis().is_err());
}

#[tokio::test]
async fn detect_is_repeatable_and_stateless() {
    let identifier = FakeIdentifier::answering("Salt");
    let mut session = polling_session(identifier.clone());

    for _ in 0..2 {
        let id = session.detect().await.unwrap();
        assert_eq!(id.ingredient(), Some("Salt"));
        assert_eq!(session.state(), SessionState::Streaming);
    }
    assert_eq!(identifier.calls(), 2);
}

#[tokio::test]
async fn detect_with_nothing_found() {
    let mut session = polling_session(FakeIdentifier::new(Outcome::Nothing, Duration::ZERO));

    let err = session.detect().await.unwrap_err();
    assert!(matches!(err, BakeError::NoDetection));
    assert_eq!(session.status(), "No ingredient detected.");
}

#[tokio::test]
async fn display_renders_every_nth_live_frame_then_the_capture() {
    let released = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut session = CaptureSession::builder()
        .with_frame_source(FrameSource::polling(move || {
            Ok(common::fake_feed::FakeFeed::new(released).boxed())
        }))
        .with_identifier(FakeIdentifier::answering("Flour"))
        .with_capture_file(None)
        .with_frame_skip(3)
        .build()
        .unwrap();

    let rendered = (0..9).filter(|_| session.display_frame().is_some()).count();
    assert_eq!(rendered, 3);

    let held = session.capture().unwrap();
    for _ in 0..4 {
        let shown = session.display_frame().unwrap();
        assert!(Arc::ptr_eq(&shown, &held));
    }
}

#[tokio::test]
async fn builder_requires_source_and_identifier() {
    let missing_source = CaptureSession::builder()
        .with_identifier(FakeIdentifier::answering("Flour"))
        .build();
    assert!(matches!(missing_source, Err(BakeError::Config { .. })));

    let missing_identifier = CaptureSession::builder()
        .with_frame_source(FrameSource::polling(|| {
            Err(BakeError::device("camera 0", "absent"))
        }))
        .build();
    assert!(matches!(missing_identifier, Err(BakeError::Config { .. })));
}

#[test]
fn estimate_identification_prefills_converter() {
    let id = Identification::Estimate {
        ingredient: "Flour".into(),
        confidence: 0.5,
        bbox: baking_converter::identify::BoundingBox { x: 0.0, y: 0.0, w: 10.0, h: 10.0 },
        grams: 0.05,
    };
    assert_eq!(id.ingredient(), Some("Flour"));
}
