//! GCP REST error classification
//!
//! Failed calls come back with a JSON envelope like
//! `{"error": {"code": 404, "status": "NOT_FOUND", "message": "..."}}`.
//! This maps that envelope (or a bare HTTP status when the body is not the
//! envelope) onto the typed `ProviderError` the core engine reasons about.

use gcp_reaper_core::ProviderError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Status string GCP uses for quota and rate-limit rejections.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Classify a non-2xx response into a `ProviderError`.
pub(crate) fn classify_response(http_code: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_else(|_| ErrorBody {
            code: http_code,
            status: String::new(),
            message: truncate(body),
        });

    let code = if parsed.code == 0 { http_code } else { parsed.code };
    match code {
        404 => ProviderError::NotFound(parsed.message),
        429 => ProviderError::RateLimited(parsed.message),
        403 if parsed.status == RESOURCE_EXHAUSTED => ProviderError::RateLimited(parsed.message),
        403 => ProviderError::PermissionDenied(parsed.message),
        _ => ProviderError::Api {
            code,
            status: parsed.status,
            message: parsed.message,
        },
    }
}

/// Keep unparseable bodies short enough for logs.
fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    }
}
