use std::path::Path;
use std::process::Command;

/// Run git in the workspace root; `None` outside a checkout or without git.
fn git(root: &Path, args: &[&str]) -> Option<String> {
    let out = Command::new("git").arg("-C").arg(root).args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!s.is_empty()).then_some(s)
}

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let root = Path::new(&manifest_dir).join("..");

    // Deployments without a checkout can pin the version string.
    let build_id = std::env::var("SLIPSCAN_BUILD_SHA")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| git(&root, &["describe", "--always", "--dirty", "--abbrev=8"]))
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rerun-if-env-changed=SLIPSCAN_BUILD_SHA");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rustc-env=SLIPSCAN_BUILD_SHA={build_id}");
}
