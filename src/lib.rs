//! Teksting - media transcription and subtitle service
//!
//! An HTTP service that turns uploaded media into transcripts and subtitles.
//!
//! The name "Teksting" is Norwegian for "subtitling."
//!
//! # Overview
//!
//! Teksting lets clients:
//! - Transcribe audio or video into timestamped text
//! - Render a transcript as an SRT subtitle file
//! - Extract 16 kHz mono speech audio from video
//! - Burn an SRT file into a video
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `staging` - Request-scoped temporary files
//! - `upload` / `validation` - Multipart parts and subtitle checks
//! - `transcode` - ffmpeg invocation
//! - `transcription` - Speech models behind a shared, lazily loaded cache
//! - `subtitle` - SRT rendering
//! - `pipeline` - Per-operation orchestration
//! - `server` - axum routes
//!
//! # Example
//!
//! ```rust,no_run
//! use teksting::config::Settings;
//! use teksting::server::router_from_settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let app = router_from_settings(&settings)?;
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod staging;
pub mod subtitle;
pub mod transcode;
pub mod transcription;
pub mod upload;
pub mod validation;

pub use error::{PipelineStage, Result, TekstingError};
