// src/error.rs
use log::error;
use serde_json::json;
use std::convert::Infallible;
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

#[derive(Debug)]
pub enum ApiError {
    /// Malformed input or a business-rule violation (e.g. overselling).
    Invalid(String),
    /// Username already taken.
    Conflict(String),
    /// Bad username/password pair at login.
    Credentials,
    /// Missing, malformed, expired or otherwise unverifiable bearer token.
    Unauthorized,
    /// The data store failed; the raw message is surfaced to the client.
    Database(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) | ApiError::Conflict(_) | ApiError::Credentials => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Invalid(message)
            | ApiError::Conflict(message)
            | ApiError::Database(message) => write!(f, "{}", message),
            ApiError::Credentials => write!(f, "Invalid credentials"),
            ApiError::Unauthorized => write!(f, "Invalid or missing token"),
        }
    }
}

impl std::error::Error for ApiError {}

impl Reject for ApiError {}

/// Renders every rejection as a `{"error": ...}` JSON body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<ApiError>() {
        (e.status(), e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error!("Request body rejected: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid input data".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Invalid("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Credentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Database("down".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
