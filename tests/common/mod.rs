#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

pub fn taxon_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taxon").unwrap();
    cmd.env_remove("TAXON_ROOT");
    cmd.env_remove("TAXON_LOG");
    cmd
}

/// Fresh temp dir with `taxon init` already run
pub fn init_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    taxon_cmd().arg("init").arg(temp.path()).assert().success();
    temp
}

/// Run taxon inside `dir` and return stdout, asserting success
pub fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = taxon_cmd().current_dir(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "taxon {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}
