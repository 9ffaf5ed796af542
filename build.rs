use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed=GYMLOG_VERSION");

    println!("cargo:rustc-env=GIT_VERSION={}", build_version());
}

/// `<package version>+<commit>` such as `0.1.0+3f2a9c1-dirty`, or the bare
/// package version outside a checkout. Release pipelines pin the label
/// through `GYMLOG_VERSION`.
fn build_version() -> String {
    let package = env::var("CARGO_PKG_VERSION").unwrap_or_default();

    if let Some(pinned) = env::var("GYMLOG_VERSION").ok().filter(|v| !v.trim().is_empty()) {
        return pinned.trim().to_string();
    }

    match commit() {
        Some(commit) => format!("{}+{}", package, commit),
        None => package,
    }
}

fn commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hash.is_empty() {
        return None;
    }

    let dirty = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .is_some_and(|o| !o.stdout.is_empty());

    Some(if dirty { format!("{}-dirty", hash) } else { hash })
}
