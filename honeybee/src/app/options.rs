//! Application configuration options

use std::time::Duration;

use crate::compose::format::FormatOptions;
use crate::deploy::supervisor::SupervisorOptions;
use crate::errors::HoneybeeError;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{LlmSettings, ReaderSettings, Settings};

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// LLM provider configuration
    pub llm: LlmSettings,

    /// URL reader configuration
    pub reader: ReaderSettings,

    /// Server configuration
    pub server: ServerOptions,

    /// YAML normalization
    pub format: FormatOptions,

    /// Local deploy supervisor
    pub deploy: SupervisorOptions,

    /// Remove leftover deploy directories at startup
    pub reap_stray_sessions: bool,
}

impl AppOptions {
    /// Build options from the settings file contents
    pub fn from_settings(layout: StorageLayout, settings: Settings) -> Result<Self, HoneybeeError> {
        Ok(Self {
            lifecycle: LifecycleOptions::default(),
            layout,
            deploy: SupervisorOptions::from_settings(&settings.deploy)?,
            reap_stray_sessions: settings.deploy.reap_stray_sessions,
            format: FormatOptions::from(&settings.format),
            server: ServerOptions {
                host: settings.server.host,
                port: settings.server.port,
            },
            llm: settings.llm,
            reader: settings.reader,
        })
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout: StorageLayout::default(),
            llm: LlmSettings::default(),
            reader: ReaderSettings::default(),
            server: ServerOptions::default(),
            format: FormatOptions::default(),
            deploy: SupervisorOptions::default(),
            reap_stray_sessions: true,
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown, including stopping a local deploy
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(90),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}
