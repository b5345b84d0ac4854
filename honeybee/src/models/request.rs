//! Generation request model

use honeybee_api::{ArtifactKind, GenerateRequest};

use crate::errors::HoneybeeError;

/// Where the generation instructions come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// Misconfigurations picked from the catalog or typed in
    Misconfigurations(Vec<String>),
    /// Free text or markdown, pasted or imported from a URL
    FreeText(String),
}

/// A validated generation request.
///
/// Exactly one of a non-empty misconfiguration list or a non-empty free text
/// source is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: ArtifactKind,
    pub target_name: String,
    pub source: RequestSource,
}

impl GenerationRequest {
    pub fn from_misconfigurations(
        kind: ArtifactKind,
        target_name: impl Into<String>,
        misconfigurations: Vec<String>,
    ) -> Result<Self, HoneybeeError> {
        Self::build(kind, target_name.into(), misconfigurations, None)
    }

    pub fn from_free_text(
        kind: ArtifactKind,
        target_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, HoneybeeError> {
        Self::build(kind, target_name.into(), Vec::new(), Some(text.into()))
    }

    fn build(
        kind: ArtifactKind,
        target_name: String,
        misconfigurations: Vec<String>,
        free_text: Option<String>,
    ) -> Result<Self, HoneybeeError> {
        let target_name = target_name.trim().to_string();
        if target_name.is_empty() {
            return Err(HoneybeeError::InvalidRequest(
                "An application name is required".to_string(),
            ));
        }

        let misconfigurations: Vec<String> = misconfigurations
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        let free_text = free_text.filter(|text| !text.trim().is_empty());

        let source = match (misconfigurations.is_empty(), free_text) {
            (false, None) => RequestSource::Misconfigurations(misconfigurations),
            (true, Some(text)) => RequestSource::FreeText(text),
            (false, Some(_)) => {
                return Err(HoneybeeError::InvalidRequest(
                    "Provide either misconfigurations or free text, not both".to_string(),
                ))
            }
            (true, None) => {
                return Err(HoneybeeError::InvalidRequest(
                    "Select misconfigurations or provide free text".to_string(),
                ))
            }
        };

        Ok(Self {
            kind,
            target_name,
            source,
        })
    }

    /// Misconfigurations as recorded in history; empty for free text requests
    pub fn misconfigurations(&self) -> &[String] {
        match &self.source {
            RequestSource::Misconfigurations(list) => list,
            RequestSource::FreeText(_) => &[],
        }
    }

    /// `(target, misconfigurations)` pair stored with each history entry
    pub fn input_parameters(&self) -> (String, Vec<String>) {
        (self.target_name.clone(), self.misconfigurations().to_vec())
    }

    /// Build the user message sent alongside the kind's system prompt
    pub fn user_prompt(&self) -> String {
        let subject = match self.kind {
            ArtifactKind::Dockerfile => "a Dockerfile",
            ArtifactKind::ComposeFile => "a Docker Compose",
            ArtifactKind::ScanTemplate => "a Nuclei template",
        };
        let output_instruction = match self.kind {
            ArtifactKind::ScanTemplate => "Return the template as JSON.",
            _ => {
                "Provide the output as a JSON object with 'file_name', 'file_path', and \
                 'file_content' keys for each file."
            }
        };

        match &self.source {
            RequestSource::Misconfigurations(list) => format!(
                "Generate {} for {} with the following misconfigurations: {}. {}",
                subject,
                self.target_name,
                list.join(", "),
                output_instruction
            ),
            RequestSource::FreeText(text) => format!(
                "Generate {} based on the following markdown specification:\n{}\n{}",
                subject, text, output_instruction
            ),
        }
    }
}

impl TryFrom<GenerateRequest> for GenerationRequest {
    type Error = HoneybeeError;

    fn try_from(request: GenerateRequest) -> Result<Self, Self::Error> {
        Self::build(
            request.kind,
            request.target_name,
            request.misconfigurations,
            request.free_text,
        )
    }
}
