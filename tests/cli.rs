use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::{tempdir, TempDir};

const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

fn asset_root() -> TempDir {
    let dir = tempdir().expect("temp asset root");
    let model_dir = dir.path().join("Model");
    fs::create_dir_all(&model_dir).expect("model directory");
    fs::write(model_dir.join("scene.obj"), TRIANGLE).expect("write model");
    dir
}

fn summary(assets: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dragon-landing").expect("binary exists");
    cmd.env_remove("DRAGON_ASSETS")
        .arg("--assets")
        .arg(assets)
        .arg("--summary-only");
    cmd
}

#[test]
fn summary_shows_fallback_then_model() {
    let assets = asset_root();
    summary(assets.path())
        .args(["--ticks", "6"])
        .assert()
        .success()
        .stdout(contains("Scene before the model resolves:"))
        .stdout(contains(" - model fallback"))
        .stdout(contains(" - model /Model/scene.obj (3 vertices, 1 triangles)"))
        .stdout(contains("400 Dragons / 1,000 Dragons"))
        .stdout(contains("40% Funded"))
        .stdout(contains("Simulated 6 rotation(s) over 36000 ms"))
        .stdout(contains(" - quote 1 by Dean"));
}

#[test]
fn missing_model_keeps_page_running() {
    let assets = tempdir().expect("empty asset root");
    summary(assets.path())
        .assert()
        .success()
        .stdout(contains("Model unavailable: asset not found: /Model/scene.obj"))
        .stdout(contains("model failed"))
        .stdout(contains("Quote 1: \"I will make you miserable.\""))
        .stdout(contains("Simulated 0 rotation(s) over 0 ms"));
}

#[test]
fn ticks_rotate_quotes_in_order() {
    let assets = asset_root();
    summary(assets.path())
        .args(["--ticks", "7"])
        .assert()
        .success()
        .stdout(contains("Rotated to quote 2"))
        .stdout(contains("Rotated to quote 6"))
        .stdout(contains("Rotated to quote 1"))
        .stdout(contains(" - quote 2 by Ligmaballsu"));
}

#[test]
fn raised_above_goal_is_clamped() {
    let assets = asset_root();
    summary(assets.path())
        .args(["--raised", "1500"])
        .assert()
        .success()
        .stdout(contains("1,500 Dragons / 1,000 Dragons"))
        .stdout(contains("100% Funded"))
        .stdout(contains("40% Funded").not());
}

#[test]
fn scene_file_overrides_defaults() {
    let assets = asset_root();
    let scene = assets.path().join("scene.xml");
    fs::write(
        &scene,
        r#"<scene>
  <environment>sunset</environment>
  <model enabled="false"/>
  <stars enabled="false"/>
</scene>
"#,
    )
    .expect("write scene");

    summary(assets.path())
        .arg("--scene")
        .arg(&scene)
        .assert()
        .success()
        .stdout(contains("environment sunset"))
        .stdout(contains(" - model none"))
        .stdout(contains(" - 5000 stars").not());
}

#[test]
fn invalid_scene_is_reported() {
    let assets = asset_root();
    let scene = assets.path().join("scene.xml");
    fs::write(&scene, "<page/>").expect("write scene");

    summary(assets.path())
        .arg("--scene")
        .arg(&scene)
        .assert()
        .failure()
        .stderr(contains("expected <scene> root element"));
}
