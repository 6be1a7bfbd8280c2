//! Defines the template and route handler for the 404 page.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// Marker type that renders the 404 page.
pub struct NotFoundError;

impl IntoResponse for NotFoundError {
    fn into_response(self) -> Response {
        let html = Html(
            error_view(
                "Not Found",
                "404",
                "Sorry, we could not find that page.",
                "Check the address, or head back to the dashboard.",
            )
            .into_string(),
        );

        (StatusCode::NOT_FOUND, html).into_response()
    }
}

pub async fn get_404_not_found() -> Response {
    NotFoundError.into_response()
}
