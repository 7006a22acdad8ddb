use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Capture the rustc version at build time so the user agent can report it.
fn rust_version() -> String {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let output = Command::new(rustc)
        .arg("--version")
        .output()
        .expect("failed to invoke rustc");
    let stdout = String::from_utf8(output.stdout).expect("rustc output was not utf-8");
    // `rustc 1.54.0 (a178d0322 2021-07-26)` => `1.54.0`
    stdout
        .split(' ')
        .nth(1)
        .expect("unexpected rustc version format")
        .to_string()
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set during builds"));
    let contents = format!(
        "pub(crate) const RUST_VERSION: &str = \"{}\";\n",
        rust_version()
    );
    fs::write(out_dir.join("build_env.rs"), contents).expect("failed to write build_env.rs");
    println!("cargo:rerun-if-changed=build.rs");
}
