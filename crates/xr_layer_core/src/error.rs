//! Layer error taxonomy and result-code mapping.
//!
//! Every entry point converts `LayerError` into one fixed `XrResult` before
//! returning to the loader; nothing else crosses the boundary.

use crate::abi::{
    result_name, XrResult, XR_ERROR_EXTENSION_NOT_PRESENT,
    XR_ERROR_FUNCTION_UNSUPPORTED, XR_ERROR_INITIALIZATION_FAILED,
    XR_ERROR_RUNTIME_FAILURE, XR_ERROR_SIZE_INSUFFICIENT, XR_ERROR_VALIDATION_FAILURE,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LayerResult<T> = Result<T, LayerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    /// Malformed enumeration or call arguments.
    Validation(String),
    /// Malformed or mismatched loader handshake structures.
    InitializationFailed(String),
    /// A required implicit extension is missing from the discovered catalog.
    ExtensionNotPresent(String),
    SizeInsufficient { required: u32, capacity: u32 },
    FunctionUnsupported(String),
    /// The next chain link or the wrapped layer reported a failure code.
    Downstream(XrResult),
    /// Uncaught fault surfaced at a boundary.
    Runtime(String),
}

impl LayerError {
    /// Fixed result code reported to the loader for this error.
    pub fn result_code(&self) -> XrResult {
        match self {
            Self::Validation(_) => XR_ERROR_VALIDATION_FAILURE,
            Self::InitializationFailed(_) => XR_ERROR_INITIALIZATION_FAILED,
            Self::ExtensionNotPresent(_) => XR_ERROR_EXTENSION_NOT_PRESENT,
            Self::SizeInsufficient { .. } => XR_ERROR_SIZE_INSUFFICIENT,
            Self::FunctionUnsupported(_) => XR_ERROR_FUNCTION_UNSUPPORTED,
            Self::Downstream(code) if *code < 0 => *code,
            Self::Downstream(_) | Self::Runtime(_) => XR_ERROR_RUNTIME_FAILURE,
        }
    }

    /// Converts a caught panic payload into a runtime failure.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Runtime(message)
    }
}

impl Display for LayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::InitializationFailed(message) => {
                write!(f, "initialization failed: {message}")
            }
            Self::ExtensionNotPresent(name) => write!(f, "extension not present: {name}"),
            Self::SizeInsufficient { required, capacity } => write!(
                f,
                "buffer too small: capacity {capacity}, required {required}"
            ),
            Self::FunctionUnsupported(name) => write!(f, "function unsupported: {name}"),
            Self::Downstream(code) => write!(f, "downstream call failed with {}", result_name(*code)),
            Self::Runtime(message) => write!(f, "runtime failure: {message}"),
        }
    }
}

impl Error for LayerError {}

/// Maps a raw downstream code into `Ok(())` or `LayerError::Downstream`.
pub fn check(code: XrResult) -> LayerResult<()> {
    if crate::abi::succeeded(code) {
        Ok(())
    } else {
        Err(LayerError::Downstream(code))
    }
}

#[cfg(test)]
mod tests {
    use super::{check, LayerError};
    use crate::abi::{
        XR_ERROR_EXTENSION_NOT_PRESENT, XR_ERROR_HANDLE_INVALID, XR_ERROR_RUNTIME_FAILURE,
        XR_ERROR_SIZE_INSUFFICIENT,
    };

    #[test]
    fn downstream_codes_pass_through_unchanged() {
        assert_eq!(
            LayerError::Downstream(XR_ERROR_HANDLE_INVALID).result_code(),
            XR_ERROR_HANDLE_INVALID
        );
    }

    #[test]
    fn positive_downstream_code_is_normalized_to_runtime_failure() {
        assert_eq!(
            LayerError::Downstream(3).result_code(),
            XR_ERROR_RUNTIME_FAILURE
        );
    }

    #[test]
    fn taxonomy_maps_to_fixed_codes() {
        assert_eq!(
            LayerError::ExtensionNotPresent("XR_KHR_test".to_string()).result_code(),
            XR_ERROR_EXTENSION_NOT_PRESENT
        );
        assert_eq!(
            LayerError::SizeInsufficient {
                required: 2,
                capacity: 1
            }
            .result_code(),
            XR_ERROR_SIZE_INSUFFICIENT
        );
    }

    #[test]
    fn panic_payload_message_is_kept() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = LayerError::from_panic(payload.as_ref());
        assert_eq!(err, LayerError::Runtime("boom".to_string()));
    }

    #[test]
    fn check_accepts_success_and_rejects_errors() {
        assert!(check(0).is_ok());
        assert_eq!(
            check(XR_ERROR_HANDLE_INVALID).expect_err("negative codes must fail"),
            LayerError::Downstream(XR_ERROR_HANDLE_INVALID)
        );
    }
}
