use std::{env, path::Path, process::Command, str::from_utf8};

/// Trimmed stdout of a successful command.
fn command_output(command: &mut Command) -> Option<String> {
    command
        .output()
        .ok()
        .filter(|result| result.status.success())
        .and_then(|result| from_utf8(&result.stdout).ok().map(|out| out.trim().to_owned()))
}

/// Version shown in the banner.
///
/// Packagers building from a tarball can set `RELUKA_BUILD_VERSION`. Otherwise a git checkout
/// reports `git describe`, and the package version is the fallback.
fn version() -> String {
    println!("cargo:rerun-if-env-changed=RELUKA_BUILD_VERSION");
    if let Ok(version) = env::var("RELUKA_BUILD_VERSION") {
        return version;
    }

    if Path::new("../.git").exists() {
        println!("cargo:rerun-if-changed=../.git/HEAD");
        let described = command_output(
            Command::new("git")
                .arg("describe")
                .arg("--tags")
                .arg("--match=v[0-9]*")
                .arg("--dirty=-d")
                .arg("--always"),
        );
        if let Some(described) = described {
            return described.strip_prefix('v').unwrap_or(&described).to_owned();
        }
    }

    env::var("CARGO_PKG_VERSION").unwrap()
}

fn main() {
    let rustc = env::var("RUSTC").unwrap();
    let rustc_version = command_output(Command::new(rustc).arg("--version"))
        .expect("Failed to query rustc version");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-env=RELUKA_VERSION={}", version());
    println!("cargo:rustc-env=RELUKA_RUSTC_VERSION={}", rustc_version);
    println!(
        "cargo:rustc-env=RELUKA_PROFILE={}",
        env::var("PROFILE").unwrap()
    );
}
