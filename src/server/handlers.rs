use super::multipart::collect_parts;
use super::AppState;
use crate::error::TekstingError;
use crate::pipeline::Artifact;
use crate::transcription::TranscriptExport;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

type MultipartBody = Result<Multipart, MultipartRejection>;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "service": state.service_name }))
}

pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    multipart: MultipartBody,
) -> Result<Json<TranscriptExport>, TekstingError> {
    let parts = collect_parts(multipart).await?;
    let result = state.pipeline.transcribe(&parts).await?;
    Ok(Json(TranscriptExport::from(&result)))
}

pub async fn transcribe_to_srt(State(state): State<Arc<AppState>>, multipart: MultipartBody) -> Result<Artifact, TekstingError> {
    let parts = collect_parts(multipart).await?;
    state.pipeline.transcribe_to_srt(&parts).await
}

pub async fn extract_audio(State(state): State<Arc<AppState>>, multipart: MultipartBody) -> Result<Artifact, TekstingError> {
    let parts = collect_parts(multipart).await?;
    state.pipeline.extract_audio(&parts).await
}

pub async fn burn_subtitles(State(state): State<Arc<AppState>>, multipart: MultipartBody) -> Result<Artifact, TekstingError> {
    let parts = collect_parts(multipart).await?;
    state.pipeline.burn_subtitles(&parts).await
}
