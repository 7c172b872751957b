//! Error types for label preparation, dispatch and device access.
//!
//! Each layer has its own enum. The handler taxonomy [`LabelError`] is what
//! the HTTP surface maps onto status codes.

use crate::tape::TapeKind;
use thiserror::Error;

/// USB device error.
#[derive(Error, Debug)]
pub enum Error {
    /// Wraps underlying rusb errors for device communication issues,
    /// timeouts, or permission problems.
    #[error(transparent)]
    UsbError(#[from] rusb::Error),

    #[error("Device is offline")]
    DeviceOffline,

    #[error("Device is missing endpoint")]
    MissingEndpoint,

    /// Bulk transfer wrote fewer bytes than supplied.
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

/// Failure reported by a [`PrinterService`](crate::PrinterService) when
/// dispatching a label.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The printer rejected one of the job parameters.
    #[error("{0}")]
    InvalidParameter(String),

    /// No attached printer has this serial number.
    #[error("Printer {0} not found")]
    PrinterNotFound(String),

    #[error(transparent)]
    Device(#[from] Error),
}

/// Outcome taxonomy of the request handler.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InternalError(String),
}

impl LabelError {
    pub fn unsupported_tape(tape: TapeKind) -> Self {
        Self::BadRequest(format!("Unsupported tape! {}", tape))
    }

    pub fn unsupported_image() -> Self {
        Self::BadRequest("Unsupported image type!".to_string())
    }
}

impl From<DispatchError> for LabelError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidParameter(msg) => Self::BadRequest(msg),
            DispatchError::PrinterNotFound(_) => Self::NotFound,
            DispatchError::Device(err) => Self::InternalError(err.to_string()),
        }
    }
}

impl From<Error> for LabelError {
    fn from(err: Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

/// Invalid value in the process configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
