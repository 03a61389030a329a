//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A `201 Created` response with a JSON body.
#[derive(Debug)]
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// `{"count": n}` body used by the counting endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Empty success response.
#[must_use]
pub const fn ok() -> StatusCode {
    StatusCode::OK
}
