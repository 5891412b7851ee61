use std::{fs, path::PathBuf, process::Command};

#[test]
fn json_report_is_printed_to_stdout() {
    let output = Command::new(env!("CARGO_BIN_EXE_horde"))
        .args(["--seconds", "50", "--fps", "20", "--json"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch the horde binary");
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout holds only the JSON report");
    assert_eq!(report["frames"], 1_000);
    assert!(report["statistics"]["total_spawned"].as_u64().expect("counter") > 0);
    assert!(report["waves_started"].as_u64().expect("counter") >= 1);
}

#[test]
fn bundled_config_and_terrain_are_accepted() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..");
    let output = Command::new(env!("CARGO_BIN_EXE_horde"))
        .arg("--config")
        .arg(root.join("config/horde.toml"))
        .arg("--terrain")
        .arg(root.join("config/arena.txt"))
        .args(["--seconds", "10", "--fps", "30"])
        .output()
        .expect("failed to launch the horde binary");
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("spawned"));
}

#[test]
fn ragged_terrain_is_reported() {
    let path = std::env::temp_dir().join(format!("horde-ragged-{}.txt", std::process::id()));
    fs::write(&path, "0 0 0\n0 0\n").expect("temp dir is writable");

    let output = Command::new(env!("CARGO_BIN_EXE_horde"))
        .arg("--terrain")
        .arg(&path)
        .args(["--seconds", "1"])
        .output()
        .expect("failed to launch the horde binary");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("rejected"));
}
