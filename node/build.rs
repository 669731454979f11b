use std::process::Command;

/// Embed the commit the binary was built from as `GIT_COMMIT_HASH`.
fn main() {
    for var in ["GIT_COMMIT_HASH", "GITHUB_SHA"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-changed=../.git/HEAD");

    if let Some(sha) = commit_from_env().or_else(commit_from_git) {
        println!("cargo:rustc-env=GIT_COMMIT_HASH={sha}");
    }
}

fn commit_from_env() -> Option<String> {
    ["GIT_COMMIT_HASH", "GITHUB_SHA"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|sha| sha.trim().to_string())
        .find(|sha| !sha.is_empty())
}

fn commit_from_git() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}
