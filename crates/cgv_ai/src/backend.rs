use std::time::Duration;

use cgv_core::error::{codes, AppError};
use url::Url;

use crate::source::HealthProbe;

pub const DEFAULT_CHAT_PATH: &str = "/api/widget/";
pub const DEFAULT_HEALTH_PATH: &str = "/health/";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the RAG backend over HTTP.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    chat_path: String,
    health_path: String,
}

fn invalid_url(base_url: &str, reason: impl std::fmt::Display) -> AppError {
    AppError::new(codes::BACKEND_URL_INVALID, "Backend base URL is invalid")
        .with_details(format!("base_url={base_url}; reason={reason}"))
}

fn normalize_path(path: &str) -> String {
    let p = path.trim();
    if p.starts_with('/') {
        p.to_string()
    } else {
        format!("/{p}")
    }
}

impl BackendClient {
    /// Create a client for `http://` or `https://` base URLs (an optional path prefix is kept,
    /// a trailing slash is trimmed).
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let raw = base_url.trim();
        // The URL parser silently drops tabs and newlines; a configured URL must not contain them.
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid_url(raw, "whitespace or control characters"));
        }

        let url = Url::parse(raw).map_err(|e| invalid_url(raw, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid_url(raw, "scheme must be http or https"));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid_url(raw, "missing host"));
        }
        if url.port() == Some(0) {
            return Err(invalid_url(raw, "port must be 1-65535"));
        }
        // Userinfo, query and fragment would make the host we call differ from the one configured.
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid_url(raw, "userinfo is not allowed"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid_url(raw, "query and fragment are not allowed"));
        }

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        })
    }

    pub fn with_chat_path(mut self, path: &str) -> Self {
        self.chat_path = normalize_path(path);
        self
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        self.health_path = normalize_path(path);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

impl HealthProbe for BackendClient {
    fn health_check(&self) -> Result<(), AppError> {
        let url = self.health_url();
        let resp = ureq::get(&url).timeout(HEALTH_TIMEOUT).call();

        match resp {
            Ok(r) if (200..300).contains(&r.status()) => Ok(()),
            Ok(r) => Err(
                AppError::new(codes::BACKEND_UNHEALTHY, "Backend health check failed")
                    .with_details(format!("url={url}; status={}", r.status())),
            ),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new(codes::BACKEND_UNHEALTHY, "Backend health check failed")
                    .with_details(format!("url={url}; status={status}")),
            ),
            Err(e) => Err(AppError::new(
                codes::BACKEND_UNHEALTHY,
                "Failed to reach backend health endpoint",
            )
            .with_details(format!("url={url}; err={e}"))
            .with_retryable(true)),
        }
    }
}
