use axum::Json;
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

use super::error::HostError;

/// Result of a Host operation, written to HTTP by the route layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Redirect(RedirectOutcome),
    Json(JsonOutcome),
}

/// A navigational response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOutcome {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub status: StatusCode,
}

impl RedirectOutcome {
    /// 307 keeps the request method on the way back to the broker.
    #[must_use]
    pub fn temporary(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            status: StatusCode::TEMPORARY_REDIRECT,
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Target URL with `params` appended, using `&` when `url` already has a query.
    #[must_use]
    pub fn location(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }

        let separator = if self.url.contains('?') { '&' } else { '?' };
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}{separator}{query}", self.url)
    }

    /// The `sso_error` value carried by this redirect, if any.
    #[must_use]
    pub fn sso_error(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == "sso_error")
            .map(|(_, v)| v.as_str())
    }
}

/// A JSON response body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonOutcome {
    pub body: JsonValue,
    pub status: StatusCode,
}

impl JsonOutcome {
    #[must_use]
    pub fn data(data: JsonValue) -> Self {
        Self {
            body: json!({ "data": data }),
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn success(message: &str) -> Self {
        Self {
            body: json!({ "success": message }),
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn error(error: &HostError) -> Self {
        Self {
            body: json!({ "error": error.to_string() }),
            status: error.status(),
        }
    }
}

impl Outcome {
    /// The JSON body, if this is a JSON outcome.
    #[must_use]
    pub fn json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(json) => Some(&json.body),
            Self::Redirect(_) => None,
        }
    }

    /// The redirect, if this is a redirect outcome.
    #[must_use]
    pub fn redirect(&self) -> Option<&RedirectOutcome> {
        match self {
            Self::Redirect(redirect) => Some(redirect),
            Self::Json(_) => None,
        }
    }
}

impl From<JsonOutcome> for Outcome {
    fn from(json: JsonOutcome) -> Self {
        Self::Json(json)
    }
}

impl From<RedirectOutcome> for Outcome {
    fn from(redirect: RedirectOutcome) -> Self {
        Self::Redirect(redirect)
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(redirect) => {
                (redirect.status, [(LOCATION, redirect.location())]).into_response()
            }
            Self::Json(json) => (json.status, Json(json.body)).into_response(),
        }
    }
}
