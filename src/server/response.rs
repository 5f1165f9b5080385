use crate::error::TekstingError;
use crate::pipeline::{Artifact, ArtifactBody};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    stage: &'static str,
}

impl IntoResponse for TekstingError {
    fn into_response(self) -> Response {
        let status = match &self {
            TekstingError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_client_error() {
            tracing::warn!(stage = %self.stage(), error = %self, "Rejected request");
        } else {
            tracing::error!(stage = %self.stage(), error = %self, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                stage: self.stage().as_str(),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for Artifact {
    fn into_response(self) -> Response {
        let headers = [
            (header::CONTENT_TYPE, self.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", self.filename),
            ),
        ];

        match self.body {
            ArtifactBody::Memory(bytes) => (headers, bytes).into_response(),
            ArtifactBody::File { file, len } => (
                headers,
                [(header::CONTENT_LENGTH, len.to_string())],
                Body::from_stream(ReaderStream::new(file)),
            )
                .into_response(),
        }
    }
}
