use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes. Query-local codes end up on an ERROR `QueryResult`; configuration codes
/// abort a batch before any query runs.
pub mod codes {
    pub const TRANSPORT_FAILURE: &str = "TRANSPORT_FAILURE";
    pub const TRANSPORT_TIMEOUT: &str = "TRANSPORT_TIMEOUT";
    pub const BACKEND_HTTP_STATUS: &str = "BACKEND_HTTP_STATUS";
    pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
    pub const BACKEND_UNHEALTHY: &str = "BACKEND_UNHEALTHY";

    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG_LOAD_FAILED";
    pub const BACKEND_URL_INVALID: &str = "BACKEND_URL_INVALID";
    pub const REPORT_WRITE_FAILED: &str = "REPORT_WRITE_FAILED";
    pub const STUB_SERVER_FAILED: &str = "STUB_SERVER_FAILED";
}

/// Single structured error shape shared by the verifier crates and embedded in JSON reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(codes::CONFIG_INVALID, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(codes::TRANSPORT_FAILURE, message).with_retryable(true)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(codes::MALFORMED_RESPONSE, message)
    }

    /// True for failures that belong to a single query execution (the batch keeps going).
    pub fn is_query_local(&self) -> bool {
        matches!(
            self.code.as_str(),
            codes::TRANSPORT_FAILURE
                | codes::TRANSPORT_TIMEOUT
                | codes::BACKEND_HTTP_STATUS
                | codes::MALFORMED_RESPONSE
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
