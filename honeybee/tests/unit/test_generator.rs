use std::sync::Arc;

use honeybee::errors::HoneybeeError;
use honeybee::generate::generator::{Generator, MAX_ATTEMPTS};
use honeybee::generate::prompts::PromptStore;
use honeybee::models::request::GenerationRequest;
use honeybee::models::{ArtifactKind, FileKind, GenerationOutput};

use crate::support::{fenced, ScriptedTransport, DOCKERFILE_FILES};

fn generator(transport: &Arc<ScriptedTransport>) -> Generator {
    Generator::new(transport.clone(), PromptStore::builtin())
}

fn dockerfile_request() -> GenerationRequest {
    GenerationRequest::from_misconfigurations(
        ArtifactKind::Dockerfile,
        "nginx",
        vec!["autoindex on".to_string()],
    )
    .unwrap()
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let transport = Arc::new(ScriptedTransport::always("I cannot help with that."));
    let result = generator(&transport)
        .generate_files(&dockerfile_request())
        .await;

    assert!(matches!(
        result,
        Err(HoneybeeError::ParseExhausted { attempts }) if attempts == MAX_ATTEMPTS
    ));
    assert_eq!(transport.calls(), MAX_ATTEMPTS as usize);
}

#[tokio::test]
async fn test_recovers_on_third_attempt() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![
            Ok("Sure! Here is the Dockerfile: FROM nginx".to_string()),
            Ok("```json\n[{\"file_name\": \"Dockerfile\",\n```".to_string()),
        ],
        &fenced(DOCKERFILE_FILES),
    ));
    let files = generator(&transport)
        .generate_files(&dockerfile_request())
        .await
        .unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_name, "Dockerfile");
    assert_eq!(files[0].file_kind(), FileKind::Code);
    assert_eq!(files[1].file_kind(), FileKind::Markdown);
    assert_eq!(files[0].file_type, "dockerfile");
    assert_eq!(files[1].display_path(), "docs/README.md");
}

#[tokio::test]
async fn test_terminal_block_wins() {
    let reply = format!(
        "A first draft:\n```json\n{}\n```\nOn second thought:\n\n```json\n{}\n```\n\n",
        r#"[{"file_name": "draft", "file_path": ".", "file_content": "", "file_type": "text"}]"#,
        r#"{"file_name": "Dockerfile", "file_path": ".", "file_content": "FROM redis:7", "file_type": "dockerfile"}"#,
    );
    let transport = Arc::new(ScriptedTransport::always(&reply));
    let files = generator(&transport)
        .generate_files(&dockerfile_request())
        .await
        .unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_content, "FROM redis:7");
}

#[tokio::test]
async fn test_wrong_shape_is_retried() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![Ok(fenced(r#"{"dockerfile": "FROM nginx"}"#))],
        &fenced(r#"{"files": [{"file_name": "Dockerfile", "file_path": ".", "file_content": "FROM nginx"}]}"#),
    ));
    let files = generator(&transport)
        .generate_files(&dockerfile_request())
        .await
        .unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(files[0].file_kind(), FileKind::Code);
}

#[tokio::test]
async fn test_transport_error_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![Err(HoneybeeError::Transport("connection reset".to_string()))],
        &fenced(DOCKERFILE_FILES),
    ));
    let result = generator(&transport)
        .generate_files(&dockerfile_request())
        .await;

    assert!(matches!(result, Err(HoneybeeError::Transport(_))));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_scan_template_returned_verbatim() {
    let template = "id: jenkins-script-console\ninfo:\n  name: Jenkins script console\n";
    let transport = Arc::new(ScriptedTransport::always(template));
    let request = GenerationRequest::from_free_text(
        ArtifactKind::ScanTemplate,
        "Jenkins",
        "The script console is reachable without login.",
    )
    .unwrap();

    let output = generator(&transport).generate(&request).await.unwrap();

    assert_eq!(output, GenerationOutput::Text(template.to_string()));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_prompts_sent() {
    let transport = Arc::new(ScriptedTransport::always(&fenced(DOCKERFILE_FILES)));
    generator(&transport)
        .generate(&dockerfile_request())
        .await
        .unwrap();

    let prompts = transport.prompts();
    assert_eq!(prompts.len(), 1);
    let (system, user) = &prompts[0];
    assert!(!system.trim().is_empty());
    assert!(user.starts_with("Generate a Dockerfile for nginx"));
    assert!(user.contains("autoindex on"));
}

#[tokio::test]
async fn test_extract_application() {
    let transport = Arc::new(ScriptedTransport::always(&fenced(
        r#"{"application_name": " Apache Tomcat "}"#,
    )));
    let name = generator(&transport)
        .extract_application("# Tomcat manager exposed\nDefault credentials tomcat/tomcat.")
        .await
        .unwrap();
    assert_eq!(name, "Apache Tomcat");
    assert!(transport.prompts()[0].1.contains("Tomcat manager exposed"));

    let transport = Arc::new(ScriptedTransport::always(&fenced(r#"{"name": "unknown"}"#)));
    let name = generator(&transport)
        .extract_application("nothing useful")
        .await
        .unwrap();
    assert_eq!(name, "");
    assert_eq!(transport.calls(), 1);
}
