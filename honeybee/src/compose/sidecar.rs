//! Packet capture sidecar injection

use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::compose::format::{to_yaml_string, FormatOptions};
use crate::errors::HoneybeeError;

/// Service name of the capture sidecar
pub const TRACE_SERVICE_NAME: &str = "tcpdump";

/// Capture image, pinned by digest
pub const TRACE_IMAGE: &str =
    "corfr/tcpdump@sha256:3006b3bd9f041bf73f21e626b97cca5e78fd6ce271549ca95b8e6a508165512b";

/// First service in document order with a non-empty `ports` entry
pub fn main_service(services: &Mapping) -> Option<String> {
    services.iter().find_map(|(name, definition)| {
        let exposes_ports = match definition.get("ports") {
            Some(Value::Sequence(ports)) => !ports.is_empty(),
            Some(Value::Mapping(ports)) => !ports.is_empty(),
            Some(Value::String(ports)) => !ports.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        if exposes_ports {
            name.as_str().map(str::to_string)
        } else {
            None
        }
    })
}

fn trace_service(main: &str) -> Value {
    let mut service = Mapping::new();
    service.insert("image".into(), TRACE_IMAGE.into());
    service.insert("restart".into(), "always".into());
    service.insert("network_mode".into(), format!("service:{}", main).into());
    service.insert(
        "volumes".into(),
        Value::Sequence(vec!["./:/data".into()]),
    );
    Value::Mapping(service)
}

/// Add a `tcpdump` service sharing the network namespace of the main service.
///
/// An existing `tcpdump` entry is replaced, so applying this twice gives the
/// same document as applying it once.
pub fn add_trace_sidecar(compose_yaml: &str, options: &FormatOptions) -> Result<String, HoneybeeError> {
    let mut document: Value = serde_yaml::from_str(compose_yaml)?;

    let services = document
        .get_mut("services")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| {
            HoneybeeError::InvalidCompose("missing top-level `services` mapping".to_string())
        })?;

    let main = main_service(services).ok_or(HoneybeeError::NoExposedService)?;
    info!("Attaching {} sidecar to service {}", TRACE_SERVICE_NAME, main);
    services.insert(TRACE_SERVICE_NAME.into(), trace_service(&main));

    Ok(to_yaml_string(&document, options))
}
