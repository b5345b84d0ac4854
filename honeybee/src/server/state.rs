//! Server state

use std::sync::Arc;

use crate::app::state::AppState;
use crate::deploy::supervisor::DeploySupervisor;
use crate::errors::HoneybeeError;
use crate::generate::pipeline::GenerationPipeline;
use crate::history::store::HistoryStore;
use crate::sources::UrlImporter;

/// Server state shared across handlers
pub struct ServerState {
    /// Absent when no LLM credentials are configured
    pub pipeline: Option<Arc<GenerationPipeline>>,
    pub history: Arc<HistoryStore>,
    pub importer: Arc<UrlImporter>,
    pub deploy: Arc<DeploySupervisor>,
}

impl ServerState {
    pub fn new(
        pipeline: Option<Arc<GenerationPipeline>>,
        history: Arc<HistoryStore>,
        importer: Arc<UrlImporter>,
        deploy: Arc<DeploySupervisor>,
    ) -> Self {
        Self {
            pipeline,
            history,
            importer,
            deploy,
        }
    }

    pub fn from_app_state(app_state: &AppState) -> Self {
        Self::new(
            app_state.pipeline.clone(),
            app_state.history.clone(),
            app_state.importer.clone(),
            app_state.deploy.clone(),
        )
    }

    pub fn pipeline(&self) -> Result<&GenerationPipeline, HoneybeeError> {
        self.pipeline.as_deref().ok_or_else(|| {
            HoneybeeError::ConfigError(
                "No LLM provider configured; set an API key in settings.json or the environment"
                    .to_string(),
            )
        })
    }
}
