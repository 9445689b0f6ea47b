#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod coordinator;
pub mod event;
pub mod model;
pub mod request;
pub mod schema;
pub mod timeline;
pub mod wizard;

use serde::{Deserialize, Serialize};

pub use app::{App, UserFacingError, ViewModel, ViewState};
pub use capabilities::{Capabilities, Effect};
pub use coordinator::{InferenceOutcome, RequestCoordinator, SettleDisposition, Slot};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use wizard::{PickerStep, WizardSession};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_BUDGET_LENGTH: usize = 16;
pub const MAX_TARGET_ITEM_LENGTH: usize = 120;

/// After-effect timelines always carry exactly this many checkpoints.
pub const TIMELINE_CHECKPOINT_COUNT: usize = 3;
pub const SCORE_MAX: u8 = 100;

/// SVG viewbox used by every shell to render the after-effect graph.
/// Hit testing happens in these units so the core and the shells agree.
pub const GRAPH_VIEWBOX_WIDTH: f64 = 100.0;
pub const GRAPH_VIEWBOX_HEIGHT: f64 = 55.0;
pub const GRAPH_MARGIN_X: f64 = 6.0;

pub const SUPPORTED_IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Transport,
    Timeout,
    MalformedResponse,
    Validation,
    ImageTooLarge,
    ImageFormatUnsupported,
    FeatureUnavailable,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::Validation => "VALIDATION_ERROR",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::FeatureUnavailable => "FEATURE_UNAVAILABLE",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Transport | Self::Timeout => ErrorSeverity::Transient,

            Self::InvalidState | Self::Internal => ErrorSeverity::Fatal,

            Self::MalformedResponse
            | Self::Validation
            | Self::ImageTooLarge
            | Self::ImageFormatUnsupported
            | Self::FeatureUnavailable
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        // "Retryable" means the UI may offer a retry without asking the user
        // to change anything first. A malformed model response qualifies:
        // re-issuing the same call can produce a well-formed one.
        matches!(
            self,
            Self::Transport | Self::Timeout | Self::MalformedResponse | Self::Unknown
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Transport => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::MalformedResponse => {
                "The analysis came back incomplete. Please try again.".into()
            }
            ErrorKind::Validation | ErrorKind::FeatureUnavailable => self.message.clone(),
            ErrorKind::ImageTooLarge => {
                format!(
                    "The image is too large. Please use an image smaller than {} MB.",
                    MAX_IMAGE_BYTES / 1_000_000
                )
            }
            ErrorKind::ImageFormatUnsupported => {
                "This image format is not supported. Please use JPEG, PNG, or WebP.".into()
            }
            ErrorKind::InvalidState => {
                "The app is in an invalid state. Please restart the flow.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<schema::SchemaError> for AppError {
    fn from(e: schema::SchemaError) -> Self {
        Self::new(ErrorKind::MalformedResponse, e.to_string())
    }
}

impl From<wizard::WizardError> for AppError {
    fn from(e: wizard::WizardError) -> Self {
        Self::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<capabilities::InferenceError> for AppError {
    fn from(e: capabilities::InferenceError) -> Self {
        let kind = match &e {
            capabilities::InferenceError::Network { .. } => ErrorKind::Transport,
            capabilities::InferenceError::TimedOut => ErrorKind::Timeout,
            capabilities::InferenceError::EmptyResponse => ErrorKind::MalformedResponse,
            capabilities::InferenceError::RequestRejected { .. } => ErrorKind::Validation,
            capabilities::InferenceError::Unavailable => ErrorKind::FeatureUnavailable,
        };
        Self::new(kind, e.to_string())
    }
}
