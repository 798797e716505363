//! End-to-end tests of the `asset-optimizer` binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_asset-optimizer"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run asset-optimizer")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_exits_zero() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = run(&["--help"], dir.path());
    assert!(output.status.success());
    assert!(stdout(&output).contains("optimize"));
}

#[test]
fn test_missing_arguments_exit_one() {
    let dir = tempdir().expect("Failed to create temp dir");

    let output = run(&[], dir.path());
    assert_eq!(output.status.code(), Some(1));

    let output = run(&["compress", "only-input.glb"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_export_command() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = run(&["export", "models", "--verbose"], dir.path());

    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Files exported: 5"), "{text}");
    assert!(text.contains("helixKnot:"), "{text}");
    for name in ["brandElements", "helixKnot", "hexagonalPrism", "polyhedra", "ribbons"] {
        assert!(dir.path().join("models").join(format!("{name}.glb")).is_file());
    }
}

#[test]
fn test_export_text_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = run(&["export", "models", "--format", "gltf"], dir.path());

    assert!(output.status.success(), "{}", stderr(&output));
    let models = dir.path().join("models");
    assert!(models.join("ribbons.gltf").is_file());
    assert!(models.join("ribbons.bin").is_file());
    assert!(!models.join("ribbons.glb").exists());
}

#[test]
fn test_compress_single_file_writes_report() {
    let dir = tempdir().expect("Failed to create temp dir");
    let export = run(&["export", "models"], dir.path());
    assert!(export.status.success(), "{}", stderr(&export));

    let output = run(
        &["compress", "models/helixKnot.glb", "out/helixKnot.glb", "--quality=0.9"],
        dir.path(),
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Files processed: 1"));
    assert!(dir.path().join("out").join("helixKnot.glb").is_file());

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("out").join("compression-report.json"))
            .expect("Missing compression report"),
    )
    .unwrap();
    assert_eq!(report["summary"]["filesProcessed"], 1);
    let quality = report["options"]["qualityLevel"].as_f64().unwrap();
    assert!((quality - 0.9).abs() < 1e-6);
    assert_eq!(report["files"][0]["file"], "helixKnot.glb");
}

#[test]
fn test_compress_missing_input_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = run(&["compress", "nope.glb", "out.glb"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error:"));
}

#[test]
fn test_compress_rejects_bad_quality() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = run(&["compress", "in.glb", "out.glb", "--quality=1.5"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("quality"));
}

#[test]
fn test_textures_without_encoder_exit_one() {
    let dir = tempdir().expect("Failed to create temp dir");
    let empty_path = dir.path().join("empty-bin");
    std::fs::create_dir_all(&empty_path).unwrap();
    std::fs::create_dir_all(dir.path().join("textures")).unwrap();
    std::fs::write(dir.path().join("textures").join("wood.png"), [0u8; 64]).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_asset-optimizer"))
        .args(["textures", "textures", "out"])
        .current_dir(dir.path())
        .env("PATH", &empty_path)
        .output()
        .expect("Failed to run asset-optimizer");

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("out").join("texture-manifest.json").exists());

    let guidance = stderr(&output);
    assert!(guidance.contains("toktx command not found"), "{guidance}");
    assert!(guidance.contains("KTX-Software"), "{guidance}");
    assert!(!stdout(&output).contains("toktx"));
}

#[test]
fn test_optimize_exit_code_follows_target() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = run(
        &[
            "optimize",
            "--input=assets",
            "--output=assets/optimized",
            "--temp=temp/3d-export",
            "--no-ktx2",
            "--quiet",
        ],
        dir.path(),
    );

    let report_path = dir
        .path()
        .join("assets")
        .join("optimized")
        .join("optimization-report.json");
    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&report_path).expect("Missing optimization report"),
    )
    .unwrap();

    assert_eq!(report["pipeline"]["status"], "success");
    assert_eq!(report["textures"]["ktx2Enabled"], false);
    let achieved = report["summary"]["targetAchieved"].as_bool().unwrap();
    assert_eq!(output.status.success(), achieved, "{}", stderr(&output));
    assert!(!dir.path().join("temp").join("3d-export").exists());

    let messages = stderr(&output);
    assert_eq!(messages.contains("was not achieved"), !achieved, "{messages}");
    assert!(!stdout(&output).contains("was not achieved"));
}

#[test]
fn test_failed_files_are_reported_on_stderr() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    std::fs::write(dir.path().join("models").join("broken.glb"), b"garbage").unwrap();

    let output = run(&["compress", "models", "out/models"], dir.path());

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Files processed: 0"));
    let messages = stderr(&output);
    assert!(messages.contains("Failed to process"), "{messages}");
    assert!(messages.contains("broken.glb"), "{messages}");
    assert!(!stdout(&output).contains("Failed to process"));
}

#[test]
fn test_optimize_reads_config_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join("pipeline.toml"),
        "input_dir = \"in\"\noutput_dir = \"dist\"\ntemp_dir = \"scratch\"\nenable_ktx2 = false\n",
    )
    .unwrap();

    let output = run(
        &["optimize", "--config=pipeline.toml", "--keep-temp", "--quiet"],
        dir.path(),
    );

    assert!(
        dir.path().join("dist").join("asset-manifest.json").is_file(),
        "{}",
        stderr(&output)
    );
    assert!(dir.path().join("scratch").join("ribbons.glb").is_file());
}

#[test]
fn test_optimize_bad_config_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("pipeline.toml"), "qualty = 0.5\n").unwrap();

    let output = run(&["optimize", "--config=pipeline.toml"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error:"));
}
