use std::process::Command;
use std::str::from_utf8;

fn have_z3() -> bool {
    if let Some(z3) = Command::new("z3").arg("--version").output().ok() {
        if let Some(stdout) = from_utf8(&z3.stdout).ok() {
            return stdout.contains("Z3 version");
        }
    }
    false
}

fn main() {
    if have_z3() {
        println!("cargo:rustc-cfg=test_z3");
    } else {
        println!("cargo:warning=z3 not found, solver round trip tests will be disabled");
    }
}
