//! Business outcome of a use case.
//!
//! Expected rejections travel as `UseCaseResult::Failure`; infrastructure failures
//! never do (they are the outer `Err` of `execute`).

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use catalog_core::DomainError;

/// Machine-readable rejection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidInput,
    NotFound,
    Unauthorized,
    UpdateFailed,
    DeleteFailed,
    InsufficientStock,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::UpdateFailed => "UPDATE_FAILED",
            ErrorCode::DeleteFailed => "DELETE_FAILED",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct UseCaseError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl UseCaseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message).with_field(field)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }
}

impl From<DomainError> for UseCaseError {
    fn from(value: DomainError) -> Self {
        let message = value.message();
        match value {
            DomainError::Validation { field, .. } => {
                UseCaseError::new(ErrorCode::ValidationError, message).with_field(field)
            }
            DomainError::InvalidId(_) => UseCaseError::new(ErrorCode::InvalidInput, message),
        }
    }
}

/// `{success: true, data}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq)]
pub enum UseCaseResult<T> {
    Success(T),
    Failure(UseCaseError),
}

impl<T> UseCaseResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, UseCaseResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            UseCaseResult::Success(data) => Some(data),
            UseCaseResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&UseCaseError> {
        match self {
            UseCaseResult::Success(_) => None,
            UseCaseResult::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, UseCaseError> {
        match self {
            UseCaseResult::Success(data) => Ok(data),
            UseCaseResult::Failure(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, UseCaseError>> for UseCaseResult<T> {
    fn from(value: Result<T, UseCaseError>) -> Self {
        match value {
            Ok(data) => UseCaseResult::Success(data),
            Err(err) => UseCaseResult::Failure(err),
        }
    }
}

impl<T: Serialize> Serialize for UseCaseResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UseCaseResult", 2)?;
        match self {
            UseCaseResult::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            UseCaseResult::Failure(err) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", err)?;
            }
        }
        state.end()
    }
}
