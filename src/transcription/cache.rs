//! Process-wide, lazily loaded speech model.

use super::{ModelLoader, ModelSpec, SpeechModel};
use crate::error::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::info;

/// Holds the single loaded model instance.
///
/// The first caller triggers the load; concurrent callers wait for it and
/// receive the same instance. A failed load leaves the cell empty so a later
/// call can retry. Once loaded the model is never replaced or unloaded.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    spec: ModelSpec,
    model: OnceCell<Arc<dyn SpeechModel>>,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>, spec: ModelSpec) -> Self {
        Self {
            loader,
            spec,
            model: OnceCell::new(),
        }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Return the loaded model, loading it on first use.
    pub async fn get_or_load(&self) -> Result<Arc<dyn SpeechModel>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let started = Instant::now();
                info!(size = %self.spec.size, device = %self.spec.device, "Loading speech model");
                let model = self.loader.load(&self.spec).await?;
                info!(
                    model = %model.describe(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Speech model ready"
                );
                Ok::<_, crate::error::TekstingError>(model)
            })
            .await?;

        Ok(model.clone())
    }
}
