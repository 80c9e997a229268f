//! Error types for chaosdynamo.
//!
//! Every activity fails with a single error kind, [`ActivityFailure`].
//! Provider calls return [`ProviderError`], and [`call_provider`] is the one
//! place that turns those into activity failures.
//! SDK errors are mapped by their typed `SdkError` variant, never by parsing debug output.

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use std::future::Future;
use thiserror::Error;

/// Message raised when a pre-delete backup is requested without a name.
pub const BACKUP_NAME_REQUIRED: &str = "\"backup_name\" required when creating a backup";

/// The failure surfaced to the experiment runner.
///
/// `message` is what the runner shows. For provider errors it is the
/// provider's own message, unchanged (it may be empty).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActivityFailure {
    message: String,
    code: Option<String>,
}

impl ActivityFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Provider error code, when the failure came from a provider call.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl From<ProviderError> for ActivityFailure {
    fn from(err: ProviderError) -> Self {
        Self {
            message: err.message,
            code: Some(err.code),
        }
    }
}

/// An error reported by (or while reaching) the table-storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    code: String,
    message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// ========== TYPED ERROR MAPPING ==========

/// Map non-service `SdkError` variants (dispatch failures, timeouts, etc.).
///
/// Returns `None` for `ServiceError`, which carries its own metadata.
fn map_outer_sdk_error<E, R>(err: &SdkError<E, R>) -> Option<ProviderError>
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    match err {
        SdkError::DispatchFailure(dispatch) => {
            let message = if dispatch.is_timeout() {
                "Connection timed out to DynamoDB. Check your network or endpoint."
            } else if dispatch.is_io() {
                "Connection failed to DynamoDB (I/O error). Check if the endpoint is reachable."
            } else {
                "Connection failed to DynamoDB. Check if the endpoint is reachable."
            };
            Some(ProviderError::new("DispatchFailure", message))
        }
        SdkError::TimeoutError(_) => Some(ProviderError::new(
            "TimeoutError",
            "Connection timed out to DynamoDB. Check your network or endpoint.",
        )),
        SdkError::ConstructionFailure(inner) => Some(ProviderError::new(
            "ConstructionFailure",
            format!("Failed to build request: {:?}", inner),
        )),
        SdkError::ResponseError(inner) => Some(ProviderError::new(
            "ResponseError",
            format!("Invalid response from DynamoDB: {:?}", inner),
        )),
        SdkError::ServiceError(_) => None,
        _ => Some(ProviderError::new(
            "Unknown",
            format!("Unknown error from DynamoDB: {:?}", err),
        )),
    }
}

/// Map a DynamoDB `SdkError` to a [`ProviderError`].
///
/// For `ServiceError`, the code and message come from `ProvideErrorMetadata`.
/// The message is kept verbatim, even when the provider sent an empty one.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::fmt::Debug + std::fmt::Display,
    R: std::fmt::Debug,
{
    if let Some(provider_err) = map_outer_sdk_error(&err) {
        return provider_err;
    }

    if let Some(service_err) = err.as_service_error() {
        let meta = ProvideErrorMetadata::meta(service_err);
        let code = meta.code().unwrap_or("Unknown");
        let message = match meta.message() {
            Some(m) => m.to_string(),
            None => service_err.to_string(),
        };
        return ProviderError::new(code, message);
    }

    ProviderError::new("Unknown", format!("Unexpected DynamoDB error: {:?}", err))
}

/// Await a provider call and translate its failure into an [`ActivityFailure`].
///
/// The provider message is logged and carried through unchanged.
pub async fn call_provider<T, Fut>(operation: &'static str, call: Fut) -> Result<T, ActivityFailure>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    tracing::debug!(operation, "calling DynamoDB");
    call.await.map_err(|err| {
        tracing::error!(
            operation,
            code = err.code(),
            message = err.message(),
            "DynamoDB call failed"
        );
        ActivityFailure::from(err)
    })
}
