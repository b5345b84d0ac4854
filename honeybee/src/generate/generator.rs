//! Structured generation client

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use honeybee_api::{ArtifactKind, GeneratedFile, GenerationOutput};

use crate::errors::HoneybeeError;
use crate::generate::extract::{extract_json, ExtractError};
use crate::generate::prompts::{PromptKind, PromptStore};
use crate::llm::client::ChatTransport;
use crate::models::request::GenerationRequest;

/// Attempts per structured generation before giving up
pub const MAX_ATTEMPTS: u32 = 5;

/// Shapes a file list is accepted in
#[derive(Deserialize)]
#[serde(untagged)]
enum FilesPayload {
    Many(Vec<GeneratedFile>),
    Wrapped { files: Vec<GeneratedFile> },
    One(GeneratedFile),
}

impl From<FilesPayload> for Vec<GeneratedFile> {
    fn from(payload: FilesPayload) -> Self {
        match payload {
            FilesPayload::Many(files) => files,
            FilesPayload::Wrapped { files } => files,
            FilesPayload::One(file) => vec![file],
        }
    }
}

/// Sends templated prompts to the model and turns replies into artifacts
#[derive(Clone)]
pub struct Generator {
    transport: Arc<dyn ChatTransport>,
    prompts: PromptStore,
}

impl Generator {
    pub fn new(transport: Arc<dyn ChatTransport>, prompts: PromptStore) -> Self {
        Self { transport, prompts }
    }

    /// Ask until the reply ends with a parsable ```json block.
    ///
    /// Transport failures are returned as soon as they happen.
    pub async fn generate_parsed(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Value, HoneybeeError> {
        self.generate_with(system_prompt, user_prompt, Some).await
    }

    /// Like [`Generator::generate_parsed`], also retrying when `convert`
    /// rejects the parsed value
    async fn generate_with<T, F>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        convert: F,
    ) -> Result<T, HoneybeeError>
    where
        F: Fn(Value) -> Option<T>,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let reply = self.transport.complete(system_prompt, user_prompt).await?;

            match extract_json(&reply) {
                Ok(value) => match convert(value) {
                    Some(parsed) => {
                        debug!("Parsed model reply on attempt {}", attempt);
                        return Ok(parsed);
                    }
                    None => warn!(
                        "Attempt {}/{}: JSON block has an unexpected shape",
                        attempt, MAX_ATTEMPTS
                    ),
                },
                Err(ExtractError::NoFencedBlock) => warn!(
                    "Attempt {}/{}: reply does not end with a ```json block",
                    attempt, MAX_ATTEMPTS
                ),
                Err(ExtractError::InvalidJson(e)) => warn!(
                    "Attempt {}/{}: invalid JSON in reply: {}",
                    attempt, MAX_ATTEMPTS, e
                ),
            }
        }

        Err(HoneybeeError::ParseExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Generate the files of a Dockerfile or compose project
    pub async fn generate_files(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedFile>, HoneybeeError> {
        let system_prompt = self.prompts.system_prompt(request.kind.into()).await;
        let user_prompt = request.user_prompt();
        info!(
            "Generating {} for {} ({:?})",
            request.kind, request.target_name, request.source
        );

        self.generate_with(&system_prompt, &user_prompt, |value| {
            serde_json::from_value::<FilesPayload>(value)
                .ok()
                .map(Vec::from)
        })
        .await
    }

    /// Single request returning the model text as is
    pub async fn generate_raw(&self, request: &GenerationRequest) -> Result<String, HoneybeeError> {
        let system_prompt = self.prompts.system_prompt(request.kind.into()).await;
        info!("Generating {} for {}", request.kind, request.target_name);
        self.transport
            .complete(&system_prompt, &request.user_prompt())
            .await
    }

    /// Dispatch on the artifact kind. Scan templates come back unparsed.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, HoneybeeError> {
        match request.kind {
            ArtifactKind::Dockerfile | ArtifactKind::ComposeFile => {
                Ok(GenerationOutput::Files(self.generate_files(request).await?))
            }
            ArtifactKind::ScanTemplate => Ok(GenerationOutput::Text(self.generate_raw(request).await?)),
        }
    }

    /// Name of the application a markdown document describes, empty if unknown
    pub async fn extract_application(&self, markdown: &str) -> Result<String, HoneybeeError> {
        let system_prompt = self
            .prompts
            .system_prompt(PromptKind::ExtractApplication)
            .await;
        let user_prompt = format!(
            "Extract the application name from the following markdown content:\n{}\n\
             Return the application name as a string.",
            markdown
        );

        let value = self.generate_parsed(&system_prompt, &user_prompt).await?;
        Ok(value
            .get("application_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}
