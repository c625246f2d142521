//! # Error Handling
//!
//! Every user-triggered action (capture, retake, analyze, detect, convert)
//! returns a [`BakeResult`]. At the boundary of the action the error is turned
//! into a short human-readable status string via
//! [`BakeError::status_message`]; nothing here is allowed to terminate the
//! process, and nothing is retried automatically.
//!
//! ## Error Classification
//!
//! - [`HasSeverity`]: how loudly the error should be reported
//! - [`HasRecoverySuggestion`]: guidance shown next to the status text
//!
//! ## Usage
//!
//! ```rust
//! use baking_converter::error::{BakeError, HasRecoverySuggestion};
//!
//! let error = BakeError::unknown_ingredient("Cocoa");
//! assert_eq!(error.category(), "unknown_ingredient");
//! assert_eq!(error.status_message(), "Ingredient not found in database");
//! assert!(error.recovery_suggestion().is_some());
//! ```

use thiserror::Error;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Expected outcome of user input, e.g. analyzing before capturing
    Info,
    /// Something the user can fix, e.g. a malformed amount
    Warning,
    /// An operation failed but the session keeps running
    Error,
}

/// Base error type for the baking converter
#[derive(Debug, Error)]
pub enum BakeError {
    /// The video feed could not be opened or stopped delivering frames
    #[error("Video feed {feed} unavailable: {reason}")]
    DeviceUnavailable { feed: String, reason: String },

    /// The feed is open but no frame has arrived yet
    #[error("No frame available from the video feed yet")]
    FrameUnavailable,

    /// Analyze was requested without a captured frame
    #[error("Please capture an image first.")]
    NoCaptureYet,

    /// The identification backend failed (network, auth, quota, bad response)
    #[error("{backend} request failed: {message}")]
    Backend { backend: String, message: String },

    /// The local detector ran but found nothing
    #[error("No ingredient detected")]
    NoDetection,

    /// The amount entered is not a usable number
    #[error("Invalid amount '{input}'")]
    InvalidAmount { input: String },

    /// The ingredient is not in the density table
    #[error("Ingredient '{name}' not found in database")]
    UnknownIngredient { name: String },

    /// The session is not in a state that allows the operation
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },

    /// Configuration validation errors
    #[error("Configuration error in '{field}': {reason}")]
    Config { field: String, reason: String },

    /// Image decoding or encoding failed
    #[error("Image codec error: {0}")]
    Encode(#[from] image::ImageError),

    /// Resizing a frame for a backend failed
    #[error("Frame scaling failed: {0}")]
    Scale(#[from] frame_scale::cpu::ScaleError),

    /// I/O errors
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// An in-flight analysis was cancelled
    #[error("Analysis cancelled")]
    Cancelled,
}

/// Result type alias using our custom error type
pub type BakeResult<T> = Result<T, BakeError>;

impl BakeError {
    /// Create a device error
    pub fn device(feed: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::DeviceUnavailable {
            feed: feed.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a backend error, keeping the backend's message verbatim
    pub fn backend(backend: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(input: impl Into<String>) -> Self {
        Self::InvalidAmount {
            input: input.into(),
        }
    }

    /// Create an unknown ingredient error
    pub fn unknown_ingredient(name: impl Into<String>) -> Self {
        Self::UnknownIngredient { name: name.into() }
    }

    /// Create a configuration error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::DeviceUnavailable { .. } => "device_unavailable",
            Self::FrameUnavailable => "frame_unavailable",
            Self::NoCaptureYet => "no_capture_yet",
            Self::Backend { .. } => "backend",
            Self::NoDetection => "no_detection",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::UnknownIngredient { .. } => "unknown_ingredient",
            Self::InvalidState { .. } => "invalid_state",
            Self::Config { .. } => "config",
            Self::Encode(_) => "encode",
            Self::Scale(_) => "scale",
            Self::Io { .. } => "io",
            Self::Cancelled => "cancelled",
        }
    }

    /// Short status line shown to the user after a failed action.
    pub fn status_message(&self) -> String {
        match self {
            Self::FrameUnavailable => "No frame available yet.".to_string(),
            Self::NoCaptureYet => "Please capture an image first.".to_string(),
            Self::Backend { message, .. } => format!("Error: {message}"),
            Self::NoDetection => "No ingredient detected.".to_string(),
            Self::InvalidAmount { .. } => "Please enter a valid numeric amount.".to_string(),
            Self::UnknownIngredient { .. } => "Ingredient not found in database".to_string(),
            Self::Cancelled => "Analysis cancelled.".to_string(),
            other => format!("Error: {other}"),
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for BakeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::FrameUnavailable | Self::NoCaptureYet | Self::NoDetection | Self::Cancelled => {
                ErrorSeverity::Info
            }
            Self::InvalidAmount { .. }
            | Self::UnknownIngredient { .. }
            | Self::InvalidState { .. }
            | Self::Config { .. } => ErrorSeverity::Warning,
            Self::DeviceUnavailable { .. }
            | Self::Backend { .. }
            | Self::Encode(_)
            | Self::Scale(_)
            | Self::Io { .. } => ErrorSeverity::Error,
        }
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for BakeError {
    fn recovery_suggestion(&self) -> Option<&str> {
        match self {
            Self::DeviceUnavailable { .. } => {
                Some("Check the camera address or that a local camera is connected")
            }
            Self::FrameUnavailable => Some("Wait for the live feed to show a picture"),
            Self::NoCaptureYet => Some("Capture an image before analyzing"),
            Self::Backend { .. } => Some("Check the API key and network connection"),
            Self::NoDetection => Some("Move the ingredient into view and try again"),
            Self::InvalidAmount { .. } => Some("Enter a number such as 1.5"),
            Self::UnknownIngredient { .. } => Some("Pick one of the listed ingredients"),
            Self::InvalidState { .. } => Some("Retake to resume the live feed"),
            _ => None,
        }
    }
}
