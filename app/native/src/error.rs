//! Error types for Starshell.
//!
//! This module provides the top-level error type used by the CLI and by callers
//! that need a single serializable error. Subsystems keep their own narrower
//! error enums and convert into [`StarError`] at the boundary.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::objects::{ORefError, ObjectStoreError};
use crate::services::BackendError;
use crate::windows::WindowError;

/// Errors that can occur during application execution.
///
/// Serializes as `{ "kind": ..., "message": ... }` so it can be handed to a
/// frontend or written to stdout by the CLI unchanged.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum StarError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Object reference could not be parsed.
    #[error("Invalid object reference: {0}")]
    InvalidRef(String),
    /// Object cache operation failed.
    #[error("Object store error: {0}")]
    ObjectStoreError(String),
    /// Backend service call failed.
    #[error("Backend error: {0}")]
    BackendError(String),
    /// Window or tab transition failed.
    #[error("Window error: {0}")]
    WindowError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for StarError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for StarError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for StarError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for StarError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

impl From<ConfigError> for StarError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ORefError> for StarError {
    fn from(err: ORefError) -> Self { Self::InvalidRef(err.to_string()) }
}

impl From<ObjectStoreError> for StarError {
    fn from(err: ObjectStoreError) -> Self { Self::ObjectStoreError(err.to_string()) }
}

impl From<BackendError> for StarError {
    fn from(err: BackendError) -> Self { Self::BackendError(err.to_string()) }
}

impl From<WindowError> for StarError {
    fn from(err: WindowError) -> Self { Self::WindowError(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = StarError::InvalidArguments("Cannot combine --stdout and --path".to_string());
        assert!(err.to_string().contains("Cannot combine --stdout and --path"));
    }

    #[test]
    fn test_object_store_error_display() {
        let err = StarError::ObjectStoreError("fetch failed".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Object store error"));
        assert!(msg.contains("fetch failed"));
    }

    #[test]
    fn test_config_error_display() {
        let err = StarError::ConfigError("Invalid JSON".to_string());
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: StarError = io_err.into();
        assert!(matches!(err, StarError::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_oref_error_conversion() {
        let err: StarError = "nocolon".parse::<crate::objects::ORef>().unwrap_err().into();
        assert!(matches!(err, StarError::InvalidRef(_)));
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: StarError = BackendError::Rpc("timeout".to_string()).into();
        assert!(matches!(err, StarError::BackendError(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_from_str_and_string() {
        let a: StarError = "boom".into();
        let b: StarError = String::from("boom").into();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_error_serializes_with_kind_and_message() {
        let err = StarError::WindowError("window not found".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "WindowError");
        assert_eq!(json["message"], "window not found");
    }
}
