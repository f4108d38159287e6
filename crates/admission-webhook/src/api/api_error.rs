use axum::{http::StatusCode, response::IntoResponse};

use crate::api::service::DispatchError;

impl IntoResponse for DispatchError {
    fn into_response(self) -> axum::response::Response {
        match self {
            // protocol violations and routing misses: nothing to tell the API server
            DispatchError::UnsupportedMediaType { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response()
            }
            DispatchError::NoMatchingRule { .. } => StatusCode::NO_CONTENT.into_response(),
            DispatchError::MalformedPayload(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            DispatchError::Encode(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}
