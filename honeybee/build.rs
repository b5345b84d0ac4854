//! Embeds the commit and build time reported by `--version` and `/version`

use std::process::Command;

use chrono::Utc;

/// Packaged builds have no `.git`, so the hash can be passed in
const GIT_HASH_ENV: &str = "HONEYBEE_GIT_HASH";

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
}

fn main() {
    let git_hash = std::env::var(GIT_HASH_ENV)
        .ok()
        .filter(|hash| !hash.trim().is_empty())
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());
    let build_time = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-env-changed={}", GIT_HASH_ENV);
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
