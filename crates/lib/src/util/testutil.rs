//! Test utilities for pkgimage-lib.
//!
//! Helpers for tests that execute generated shell scripts against stub
//! binaries in a temporary directory.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Write an executable file.
#[cfg(unix)]
pub fn write_executable(path: &Path, content: &str) {
  use std::os::unix::fs::PermissionsExt;

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Run `script` with `/bin/sh`, putting `stub_dir` first on `PATH`.
#[cfg(unix)]
pub fn run_script(script: &Path, stub_dir: &Path) -> Output {
  let host_path = std::env::var("PATH").unwrap_or_default();
  Command::new("/bin/sh")
    .arg(script)
    .env("PATH", format!("{}:{}", stub_dir.display(), host_path))
    .output()
    .unwrap()
}

/// Create an empty file, creating parent directories as needed.
pub fn touch(path: &Path) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, b"").unwrap();
}
