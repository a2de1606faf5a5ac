use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while talking to the chat-completions endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API Error ({status}): {message}")]
    Status {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("stream interrupted: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Coarse failure classes used to pick user-facing guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Quota,
    Authentication,
    Connectivity,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<serde_json::Value>,
}

impl TransportError {
    /// Build a status error from a non-success response body.
    ///
    /// Bodies shaped like `{"error": {"message": ..}}` contribute their message
    /// and code; anything else is carried through as raw text.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        if let Ok(ErrorEnvelope { error: Some(detail) }) = serde_json::from_str(body) {
            let code = match detail.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => detail.kind,
            };
            return TransportError::Status {
                status,
                message: detail.message.unwrap_or_else(|| "Unknown API error".to_string()),
                code,
            };
        }

        let raw = body.trim();
        TransportError::Status {
            status,
            message: if raw.is_empty() {
                "Unknown error".to_string()
            } else {
                raw.to_string()
            },
            code: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Connection(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn category(&self) -> FailureCategory {
        let code = match self {
            TransportError::Status { code, .. } => code.as_deref(),
            _ => None,
        };
        match (self.status(), code) {
            (_, Some("insufficient_quota" | "rate_limit_exceeded" | "billing_hard_limit_reached")) => {
                FailureCategory::Quota
            }
            (_, Some("invalid_api_key" | "invalid_authentication")) => FailureCategory::Authentication,
            (Some(402 | 429), _) => FailureCategory::Quota,
            (Some(401 | 403), _) => FailureCategory::Authentication,
            _ => FailureCategory::Connectivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_message_is_used() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        let err = TransportError::from_error_body(429, body);
        assert_eq!(err.to_string(), "API Error (429): You exceeded your current quota");
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.category(), FailureCategory::Quota);
    }

    #[test]
    fn test_envelope_without_message_keeps_code() {
        let body = r#"{"error":{"type":"insufficient_quota"}}"#;
        let err = TransportError::from_error_body(429, body);
        assert_eq!(err.to_string(), "API Error (429): Unknown API error");
        assert!(matches!(
            &err,
            TransportError::Status { code: Some(code), .. } if code == "insufficient_quota"
        ));
        assert_eq!(err.category(), FailureCategory::Quota);
    }

    #[test]
    fn test_raw_body_fallback() {
        let err = TransportError::from_error_body(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "API Error (502): Bad Gateway");
        assert_eq!(err.category(), FailureCategory::Connectivity);

        let err = TransportError::from_error_body(500, "");
        assert_eq!(err.to_string(), "API Error (500): Unknown error");
    }

    #[test]
    fn test_category_from_status() {
        let err = TransportError::from_error_body(401, r#"{"error":{"message":"Incorrect API key provided"}}"#);
        assert_eq!(err.category(), FailureCategory::Authentication);

        let err = TransportError::from_error_body(429, "slow down");
        assert_eq!(err.category(), FailureCategory::Quota);

        let err = TransportError::Timeout(Duration::from_secs(5));
        assert_eq!(err.category(), FailureCategory::Connectivity);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_code_overrides_status() {
        // quota exhaustion is sometimes reported without a 429
        let body = r#"{"error":{"message":"quota","code":"insufficient_quota"}}"#;
        let err = TransportError::from_error_body(400, body);
        assert_eq!(err.category(), FailureCategory::Quota);
    }

    #[test]
    fn test_numeric_code_falls_back_to_type() {
        let body = r#"{"error":{"message":"bad key","type":"invalid_api_key","code":401}}"#;
        let err = TransportError::from_error_body(400, body);
        assert_eq!(err.category(), FailureCategory::Authentication);
    }
}
