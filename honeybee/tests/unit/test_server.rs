use std::sync::Arc;

use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use honeybee::compose::format::FormatOptions;
use honeybee::deploy::supervisor::DeploySupervisor;
use honeybee::filesys::dir::Dir;
use honeybee::generate::generator::Generator;
use honeybee::generate::pipeline::GenerationPipeline;
use honeybee::generate::prompts::PromptStore;
use honeybee::history::store::HistoryStore;
use honeybee::server::serve::router;
use honeybee::server::state::ServerState;
use honeybee::sources::UrlImporter;
use honeybee::storage::settings::ReaderSettings;

use crate::support::{fenced, supervisor_options, ScriptedTransport, DOCKERFILE_FILES, FAKE_COMPOSE};

async fn state(tmp: &TempDir, transport: Option<Arc<ScriptedTransport>>) -> Arc<ServerState> {
    let history = HistoryStore::new(Dir::new(tmp.path().join("history")));
    history.dir().create().await.unwrap();

    let pipeline = transport.map(|transport| {
        Arc::new(GenerationPipeline::new(
            Generator::new(transport, PromptStore::builtin()),
            history.clone(),
            FormatOptions::default(),
        ))
    });
    let deploy_root = tmp.path().join("deploy");
    std::fs::create_dir_all(&deploy_root).unwrap();

    Arc::new(ServerState::new(
        pipeline,
        Arc::new(history),
        Arc::new(UrlImporter::from_settings(&ReaderSettings::default()).unwrap()),
        Arc::new(DeploySupervisor::new(supervisor_options(
            FAKE_COMPOSE,
            &deploy_root,
        ))),
    ))
}

async fn send(state: &Arc<ServerState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp, None).await;

    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "honeybee");
}

#[tokio::test]
async fn test_generate_then_history() {
    let tmp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::always(&fenced(DOCKERFILE_FILES)));
    let state = state(&tmp, Some(transport)).await;

    let (status, body) = send(
        &state,
        post(
            "/generate",
            json!({
                "kind": "Dockerfile",
                "target_name": "nginx",
                "misconfigurations": ["autoindex on"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "Dockerfile");
    assert_eq!(body["output"][0]["file_name"], "Dockerfile");
    assert_eq!(body["output"][0]["file_type"], "dockerfile");
    let key = body["history_key"].as_str().unwrap().to_string();

    let (status, body) = send(&state, get("/history?kinds=dockerfile&q=autoindex")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["entries"][0]["type"], "Dockerfile");
    assert_eq!(body["entries"][0]["input_parameters"], json!(["nginx", ["autoindex on"]]));
    assert_eq!(body["entries"][0]["timestamp"], key.as_str());

    let (_, body) = send(&state, get("/history?kinds=nuclei")).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_generate_rejects_two_sources() {
    let tmp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::always(&fenced(DOCKERFILE_FILES)));
    let state = state(&tmp, Some(transport.clone())).await;

    let (status, body) = send(
        &state,
        post(
            "/generate",
            json!({
                "kind": "Docker Compose",
                "target_name": "redis",
                "misconfigurations": ["no auth"],
                "free_text": "# Redis without auth"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_generate_parse_failure_is_bad_gateway() {
    let tmp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::always("no fenced block"));
    let state = state(&tmp, Some(transport.clone())).await;

    let (status, body) = send(
        &state,
        post(
            "/generate",
            json!({"kind": "Dockerfile", "target_name": "nginx", "free_text": "autoindex"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "parse_exhausted");
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_broken_model_yaml_is_bad_gateway() {
    let tmp = TempDir::new().unwrap();
    let files = r#"[{"file_name": "docker-compose.yml", "file_path": ".", "file_content": "services: [web", "file_type": "yaml"}]"#;
    let transport = Arc::new(ScriptedTransport::always(&fenced(files)));
    let state = state(&tmp, Some(transport)).await;

    let (status, body) = send(
        &state,
        post(
            "/generate",
            json!({"kind": "Docker Compose", "target_name": "nginx", "misconfigurations": ["autoindex on"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "yaml");

    let (_, body) = send(&state, get("/history")).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_generation_needs_llm() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp, None).await;

    let (status, body) = send(
        &state,
        post(
            "/generate",
            json!({"kind": "Nuclei", "target_name": "Jenkins", "free_text": "script console"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "config");

    // History stays readable without an LLM
    let (status, body) = send(&state, get("/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_import_rejects_bad_url() {
    let tmp = TempDir::new().unwrap();
    let transport = Arc::new(ScriptedTransport::always(&fenced(r#"{"application_name": "x"}"#)));
    let state = state(&tmp, Some(transport.clone())).await;

    let (status, _) = send(&state, post("/sources/url", json!({"url": "ftp://example.com/a"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_history_rejects_bad_date() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp, None).await;

    let (status, body) = send(&state, get("/history?from=yesterday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_deploy_endpoints() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp, None).await;

    let (status, body) = send(&state, post("/deploy/stop", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "no_active_deploy");

    let (status, _) = send(&state, post("/deploy", json!({"compose_yaml": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&state, get("/deploy")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["output"], json!([]));
    assert!(body.get("error").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_deploy_start_and_stop() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp, None).await;

    let (status, _) = send(&state, get("/deploy/support")).await;
    assert_eq!(status, StatusCode::OK);

    let compose = "services:\n  web:\n    image: \"nginx\"\n";
    let (status, body) = send(&state, post("/deploy", json!({"compose_yaml": compose}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["state"], "running");
    assert!(body["working_directory"].is_string());

    let (status, body) = send(&state, post("/deploy", json!({"compose_yaml": compose}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "deploy_active");

    let (status, body) = send(&state, post("/deploy/stop", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let transcript = body["transcript"].as_array().unwrap();
    assert!(transcript.iter().any(|line| line == "container web-1 removed"));
}
