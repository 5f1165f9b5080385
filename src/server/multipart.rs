use crate::error::{Result, TekstingError};
use crate::upload::{Upload, UploadedParts};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

/// Read every part of a multipart body into memory, keyed by field name.
pub async fn collect_parts(multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<UploadedParts> {
    let mut multipart = multipart.map_err(|e| upload_error(e.status(), e.body_text()))?;
    let mut parts = UploadedParts::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(field_error)?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(field_error)?;

        debug!(field = %name, filename = ?filename, bytes = bytes.len(), "Received upload part");
        parts.insert(name, Upload { filename, bytes });
    }

    Ok(parts)
}

fn field_error(e: MultipartError) -> TekstingError {
    upload_error(e.status(), e.body_text())
}

/// Keep the body-limit rejection distinct from malformed bodies.
fn upload_error(status: StatusCode, message: String) -> TekstingError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        TekstingError::UploadTooLarge(message)
    } else {
        TekstingError::Upload(message)
    }
}
