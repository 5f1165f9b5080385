//! HTTP service for transcription and subtitle work.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::server::router_from_settings;
use tracing::info;

/// Run the HTTP service until Ctrl+C.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    // Missing tools only fail the requests that need them
    let problems = preflight::check(&settings);
    for problem in &problems {
        Output::warning(problem);
    }

    let app = router_from_settings(&settings)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header(&format!("{} API Server", settings.server.service_name));
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Backend", &settings.transcription.backend.to_string());
    Output::kv("Model", &format!("{} ({})", settings.transcription.model_size, settings.transcription.device));
    Output::kv("Temp dir", &settings.temp_dir().display().to_string());
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Transcribe", "POST /transcribe");
    Output::kv("Transcribe to SRT", "POST /transcribe_to_srt");
    Output::kv("Extract audio", "POST /extract_audio");
    Output::kv("Burn subtitles", "POST /burn_subtitles");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    info!(%addr, problems = problems.len(), "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
