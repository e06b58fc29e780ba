use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use streetfix_summary::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "issue not found"),
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        StoreError::Query(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
