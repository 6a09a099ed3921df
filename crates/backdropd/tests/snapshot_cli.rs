use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn backdropd(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_backdropd"));
    command
        .env("BACKDROP_CONFIG_DIR", config_dir)
        .env_remove("BACKDROP_CONFIG")
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn snapshot_writes_png_of_requested_size() {
    let root = TempDir::new().unwrap();
    let output = root.path().join("frame.png");

    let status = backdropd(root.path())
        .args(["snapshot"])
        .arg(&output)
        .args(["--size", "64x36", "--frame", "3"])
        .status()
        .expect("failed to run backdropd snapshot");
    assert!(status.success());

    let image = image::open(&output).expect("decode snapshot").to_rgba8();
    assert_eq!(image.dimensions(), (64, 36));
    assert!(image.pixels().all(|pixel| pixel.0[3] == 255));
}

#[test]
fn snapshot_uses_palette_from_config_file() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("backdrop.toml"),
        "[palette]\nline_width = 0.0\nchannel_bias = [1.0, 0.0, 0.0]\n",
    )
    .unwrap();
    let output = root.path().join("flat.png");

    let status = backdropd(root.path())
        .arg("snapshot")
        .arg(&output)
        .args(["--size", "8x8"])
        .status()
        .expect("failed to run backdropd snapshot");
    assert!(status.success());

    let image = image::open(&output).expect("decode snapshot").to_rgba8();
    assert!(image.pixels().all(|pixel| pixel.0 == [255, 0, 0, 255]));
}

#[test]
fn invalid_config_fails_without_writing() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("backdrop.toml"), "[animation]\nstep = 0.0\n").unwrap();
    let output = root.path().join("never.png");

    let result = backdropd(root.path())
        .arg("snapshot")
        .arg(&output)
        .output()
        .expect("failed to run backdropd snapshot");
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("animation.step"));
    assert!(!output.exists());
}

#[test]
fn config_where_reports_override_directory() {
    let root = TempDir::new().unwrap();
    let result = backdropd(root.path())
        .args(["config", "where"])
        .output()
        .expect("failed to run backdropd config where");
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains(&root.path().display().to_string()));
    assert!(stdout.contains("missing"));
}

#[test]
fn config_show_prints_effective_values() {
    let root = TempDir::new().unwrap();
    let explicit = root.path().join("custom.toml");
    fs::write(&explicit, "[animation]\nstep = 0.125\n").unwrap();

    let result = backdropd(root.path())
        .args(["config", "show", "--config"])
        .arg(&explicit)
        .output()
        .expect("failed to run backdropd config show");
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("step = 0.125"));
    assert!(stdout.contains("[palette]"));
}
