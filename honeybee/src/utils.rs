//! Utility functions

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::deploy::compose::{check_compose_installed, ComposeCommand};
use crate::errors::HoneybeeError;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Version information for HoneyBee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// One line of the diagnostic report
#[derive(Debug, Clone)]
pub struct DiagnosticCheck {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

/// Check storage, settings, LLM credentials and the compose installation
pub async fn collect_diagnostics(layout: &StorageLayout) -> Vec<DiagnosticCheck> {
    let mut checks = Vec::new();

    checks.push(DiagnosticCheck {
        name: "storage".to_string(),
        ok: true,
        detail: layout.base_dir.display().to_string(),
    });

    let settings = Settings::load(&layout.settings_file()).await;
    let settings = match settings {
        Ok(settings) => {
            checks.push(DiagnosticCheck {
                name: "settings".to_string(),
                ok: true,
                detail: layout.settings_file().path().display().to_string(),
            });
            settings
        }
        Err(e) => {
            checks.push(DiagnosticCheck {
                name: "settings".to_string(),
                ok: false,
                detail: e.to_string(),
            });
            Settings::default()
        }
    };

    checks.push(DiagnosticCheck {
        name: "llm".to_string(),
        ok: settings.llm.api_key.is_some(),
        detail: format!("{:?} / {}", settings.llm.provider, settings.llm.model),
    });

    let compose = ComposeCommand::new(&settings.deploy.compose_command);
    let (ok, detail) = match compose {
        Ok(compose) => (
            check_compose_installed(&compose).await,
            compose.display(),
        ),
        Err(e) => (false, e.to_string()),
    };
    checks.push(DiagnosticCheck {
        name: "compose".to_string(),
        ok,
        detail,
    });

    checks
}

/// Print the diagnostic report
pub async fn run_diagnostic(layout: &StorageLayout) -> Result<(), HoneybeeError> {
    let version = version_info();
    println!(
        "{} {} ({}, built {})",
        "HoneyBee".bold(),
        version.version,
        version.git_hash,
        version.build_time
    );

    for check in collect_diagnostics(layout).await {
        let status = if check.ok { "ok".green() } else { "fail".red() };
        println!("  [{}] {:<10} {}", status, check.name, check.detail);
    }
    Ok(())
}
