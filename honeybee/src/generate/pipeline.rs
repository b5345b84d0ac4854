//! Generation pipeline
//!
//! Generate, post-process compose YAML, record the transaction.

use tracing::{debug, info};

use honeybee_api::{ArtifactKind, FileKind, GeneratedFile, GenerationOutput};

use crate::compose::format::{normalize_yaml, FormatOptions};
use crate::compose::sidecar::add_trace_sidecar;
use crate::errors::HoneybeeError;
use crate::generate::generator::Generator;
use crate::history::store::HistoryStore;
use crate::models::request::GenerationRequest;

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub output: GenerationOutput,
    pub history_key: String,
}

#[derive(Clone)]
pub struct GenerationPipeline {
    generator: Generator,
    history: HistoryStore,
    format: FormatOptions,
}

impl GenerationPipeline {
    pub fn new(generator: Generator, history: HistoryStore, format: FormatOptions) -> Self {
        Self {
            generator,
            history,
            format,
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Nothing is recorded when generation or post-processing fails
    pub async fn run(
        &self,
        request: &GenerationRequest,
        with_trace: bool,
    ) -> Result<PipelineOutput, HoneybeeError> {
        let mut output = self.generator.generate(request).await?;

        if let (ArtifactKind::ComposeFile, GenerationOutput::Files(files)) =
            (request.kind, &mut output)
        {
            for file in files.iter_mut().filter(|file| file.file_kind() == FileKind::Yaml) {
                self.post_process(file, with_trace)?;
            }
        }

        let history_key = self
            .history
            .record(
                request.kind.label(),
                request.input_parameters(),
                serde_json::to_value(&output)?,
            )
            .await?;
        info!(
            "Generated {} for {} (history {})",
            request.kind, request.target_name, history_key
        );

        Ok(PipelineOutput {
            output,
            history_key,
        })
    }

    fn post_process(&self, file: &mut GeneratedFile, with_trace: bool) -> Result<(), HoneybeeError> {
        debug!("Normalizing {}", file.display_path());
        let mut content = normalize_yaml(&file.file_content, &self.format)?;
        if with_trace {
            content = add_trace_sidecar(&content, &self.format)?;
        }
        file.file_content = content;
        Ok(())
    }
}
