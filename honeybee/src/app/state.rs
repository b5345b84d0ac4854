//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::deploy::supervisor::DeploySupervisor;
use crate::errors::HoneybeeError;
use crate::generate::generator::Generator;
use crate::generate::pipeline::GenerationPipeline;
use crate::generate::prompts::PromptStore;
use crate::history::store::HistoryStore;
use crate::llm::client::LlmClient;
use crate::sources::UrlImporter;

/// Main application state
pub struct AppState {
    /// Generation pipeline, absent without LLM credentials
    pub pipeline: Option<Arc<GenerationPipeline>>,

    /// Query history
    pub history: Arc<HistoryStore>,

    /// URL importer
    pub importer: Arc<UrlImporter>,

    /// Local deploy supervisor
    pub deploy: Arc<DeploySupervisor>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, HoneybeeError> {
        info!("Initializing application state...");

        options.layout.setup().await?;

        let history = Arc::new(HistoryStore::new(options.layout.history_dir()));
        let importer = Arc::new(UrlImporter::from_settings(&options.reader)?);

        let pipeline = match LlmClient::from_settings(&options.llm) {
            Ok(client) => {
                info!("Using model {} ({:?})", client.model(), options.llm.provider);
                let generator = Generator::new(
                    Arc::new(client),
                    PromptStore::new(Some(options.layout.prompts_dir())),
                );
                Some(Arc::new(GenerationPipeline::new(
                    generator,
                    history.as_ref().clone(),
                    options.format,
                )))
            }
            Err(e) => {
                warn!("Generation disabled: {}", e);
                None
            }
        };

        let deploy = Arc::new(DeploySupervisor::new(options.deploy.clone()));
        if options.reap_stray_sessions {
            match deploy.reap_stray_sessions().await {
                Ok(0) => {}
                Ok(count) => info!("Removed {} stray deploy directories", count),
                Err(e) => warn!("Unable to reap stray deploy directories: {}", e),
            }
        }

        Ok(Self {
            pipeline,
            history,
            importer,
            deploy,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), HoneybeeError> {
        info!("Shutting down application state...");
        self.deploy.shutdown().await
    }
}
