use serde_yaml::Value;

use honeybee::compose::format::{normalize_yaml, FormatOptions};
use honeybee::compose::sidecar::{add_trace_sidecar, TRACE_SERVICE_NAME};
use honeybee::errors::HoneybeeError;

const GENERATED_COMPOSE: &str = "version: '3.8'
services:
  jenkins:
    image: jenkins/jenkins:2.426.1-lts
    ports: ['8080:8080', '50000:50000']
    environment:
      JAVA_OPTS: -Djenkins.install.runSetupWizard=false
    volumes:
      - jenkins_home:/var/jenkins_home
volumes:
  jenkins_home: {}
";

fn service_count(yaml: &str, name: &str) -> usize {
    let document: Value = serde_yaml::from_str(yaml).unwrap();
    document["services"]
        .as_mapping()
        .unwrap()
        .keys()
        .filter(|key| key.as_str() == Some(name))
        .count()
}

#[test]
fn test_applying_twice_equals_once() {
    let options = FormatOptions::default();
    let once = add_trace_sidecar(GENERATED_COMPOSE, &options).unwrap();
    let twice = add_trace_sidecar(&once, &options).unwrap();

    assert_eq!(once, twice);
    assert_eq!(service_count(&twice, TRACE_SERVICE_NAME), 1);
    assert!(twice.contains("network_mode: \"service:jenkins\""));
}

#[test]
fn test_normalized_then_traced() {
    let options = FormatOptions::default();
    let normalized = normalize_yaml(GENERATED_COMPOSE, &options).unwrap();
    assert!(normalized.starts_with("version: \"3.8\"\n"));
    assert!(normalized.contains("      - \"8080:8080\"\n"));

    let traced = add_trace_sidecar(&normalized, &options).unwrap();
    let original: Value = serde_yaml::from_str(GENERATED_COMPOSE).unwrap();
    let document: Value = serde_yaml::from_str(&traced).unwrap();

    // Everything but the sidecar is untouched
    assert_eq!(document["services"]["jenkins"], original["services"]["jenkins"]);
    assert_eq!(document["volumes"], original["volumes"]);
    assert_eq!(
        normalize_yaml(&traced, &options).unwrap(),
        traced,
        "sidecar output is already normalized"
    );
}

#[test]
fn test_worker_only_compose_is_rejected() {
    let compose = "services:\n  worker:\n    image: celery\n  queue:\n    image: rabbitmq\n";
    let err = add_trace_sidecar(compose, &FormatOptions::default()).unwrap_err();
    assert!(matches!(err, HoneybeeError::NoExposedService));
}
