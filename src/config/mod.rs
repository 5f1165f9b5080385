//! Configuration module for Teksting.
//!
//! Handles loading settings from TOML with environment overrides.

mod settings;

pub use settings::{
    GeneralSettings, ServerSettings, Settings, TranscodeSettings, TranscriptionBackend,
    TranscriptionSettings,
};
