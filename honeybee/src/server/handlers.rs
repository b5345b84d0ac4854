//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use honeybee_api::{
    DeployRequest, DeployStatusResponse, DeployStopResponse, DeploySupportResponse, ErrorResponse,
    GenerateRequest, GenerateResponse, HealthResponse, HistoryEntryResponse, HistoryListResponse,
    HistoryParams, ImportUrlRequest, ImportUrlResponse, VersionResponse,
};

use crate::deploy::supervisor::DeployStatus;
use crate::errors::HoneybeeError;
use crate::history::query::HistoryQuery;
use crate::models::request::GenerationRequest;
use crate::server::state::ServerState;
use crate::utils::version_info;

impl HoneybeeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HoneybeeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HoneybeeError::NoExposedService => StatusCode::UNPROCESSABLE_ENTITY,
            HoneybeeError::DeployActive(_) | HoneybeeError::NoActiveDeploy => StatusCode::CONFLICT,
            // YAML only reaches the server as model output
            HoneybeeError::ParseExhausted { .. }
            | HoneybeeError::Transport(_)
            | HoneybeeError::InvalidCompose(_)
            | HoneybeeError::YamlError(_) => StatusCode::BAD_GATEWAY,
            HoneybeeError::ConfigError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HoneybeeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "honeybee".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

// ================================= GENERATION ==================================== //

/// Generate an artifact and record it in history
pub async fn generate_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, HoneybeeError> {
    let pipeline = state.pipeline()?;
    let with_trace = request.with_trace;
    let request = GenerationRequest::try_from(request)?;

    let result = pipeline.run(&request, with_trace).await?;

    Ok(Json(GenerateResponse {
        kind: request.kind,
        target_name: request.target_name,
        output: result.output,
        history_key: result.history_key,
    }))
}

/// Import a page as markdown and name the application it describes
pub async fn import_url_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ImportUrlRequest>,
) -> Result<Json<ImportUrlResponse>, HoneybeeError> {
    let pipeline = state.pipeline()?;
    let source = state.importer.import(&request.url).await?;
    let application_name = pipeline
        .generator()
        .extract_application(&source.content)
        .await?;

    Ok(Json(ImportUrlResponse {
        application_name,
        content: source.content,
        truncated: source.truncated,
    }))
}

// ================================== HISTORY ====================================== //

/// List history entries, newest first
pub async fn history_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryListResponse>, HoneybeeError> {
    let query = HistoryQuery::from_params(&params)?;
    let entries = query.apply(state.history.list().await?);

    let entries: Vec<HistoryEntryResponse> = entries.iter().map(HistoryEntryResponse::from).collect();
    let total = entries.len();
    Ok(Json(HistoryListResponse { entries, total }))
}

// =================================== DEPLOY ====================================== //

fn status_response(status: DeployStatus) -> DeployStatusResponse {
    DeployStatusResponse {
        state: status.state.to_string(),
        working_directory: status.working_dir.map(|dir| dir.display().to_string()),
        output: status.output,
        last_exit_code: status.last_exit_code,
        error: status.error,
    }
}

/// Whether local deploys are possible on this host
pub async fn deploy_support_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(DeploySupportResponse {
        supported: state.deploy.is_supported().await,
    })
}

/// Start a local deploy
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<DeployRequest>,
) -> Result<(StatusCode, Json<DeployStatusResponse>), HoneybeeError> {
    if request.compose_yaml.trim().is_empty() {
        return Err(HoneybeeError::InvalidRequest(
            "The compose document is empty".to_string(),
        ));
    }
    state.deploy.start(&request.compose_yaml).await?;
    let status = state.deploy.status().await;
    Ok((StatusCode::ACCEPTED, Json(status_response(status))))
}

/// Current local deploy state and output
pub async fn deploy_status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(status_response(state.deploy.status().await))
}

/// Stop the local deploy and return its transcript
pub async fn deploy_stop_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<DeployStopResponse>, HoneybeeError> {
    let transcript = state.deploy.stop().await?;
    Ok(Json(DeployStopResponse { transcript }))
}
