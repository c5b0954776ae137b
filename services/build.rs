use std::process::Command;

fn main() {
    println!("cargo:rustc-env=BUILD_DATE={}", chrono::Utc::now().to_rfc3339());
    println!(
        "cargo:rustc-env=BUILD_COMMIT={}",
        git(&["rev-parse", "--short", "HEAD"])
    );
    println!(
        "cargo:rustc-env=BUILD_BRANCH={}",
        git(&["rev-parse", "--abbrev-ref", "HEAD"])
    );

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=migrations");
}

/// Runs git and returns trimmed stdout, or "unknown" outside a checkout.
fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}
