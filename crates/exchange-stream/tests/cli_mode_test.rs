/*
[INPUT]:  Compiled exchange-stream binary
[OUTPUT]: Verification of dry-run and init sub-command behavior
[POS]:    Integration test layer - CLI surface
[UPDATE]: When changing CLI flags or sub-commands
*/

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_exchange-stream"))
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to start exchange-stream binary")
}

fn describe(output: &Output) -> String {
    format!(
        "status: {}\nStdout: {}\nStderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn cli_mode_with_config_and_dry_run_works() {
    let config_path = format!("{}/config/stream.yaml", env!("CARGO_MANIFEST_DIR"));
    let output = run(&["--config", &config_path, "--dry-run"]);
    assert!(output.status.success(), "{}", describe(&output));
}

#[test]
fn cli_mode_without_config_fails() {
    let output = run(&["--dry-run"]);
    assert!(!output.status.success(), "{}", describe(&output));
}

#[test]
fn init_writes_loadable_template() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("stream.yaml");
    let path_str = path.to_str().expect("utf-8 path");

    let output = run(&["init", "--output", path_str]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(path.exists());

    let output = run(&["--config", path_str, "--dry-run"]);
    assert!(output.status.success(), "{}", describe(&output));

    // refuses to overwrite without --force
    let output = run(&["init", "--output", path_str]);
    assert!(!output.status.success(), "{}", describe(&output));

    let output = run(&["init", "--output", path_str, "--force"]);
    assert!(output.status.success(), "{}", describe(&output));
}
