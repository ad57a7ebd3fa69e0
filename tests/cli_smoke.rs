use std::path::PathBuf;

use arpattern::{PatternDescriptor, RasterImage, Rgba8, decode_image, encode_png};

fn exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_arpattern"))
}

fn write_input(dir: &std::path::Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let img = RasterImage::filled(24, 24, Rgba8::opaque(200, 40, 10)).unwrap();
    let path = dir.join("logo.png");
    std::fs::write(&path, encode_png(&img).unwrap()).unwrap();
    path
}

#[test]
fn cli_pattern_writes_patt_named_after_input() {
    let dir = PathBuf::from("target").join("cli_smoke").join("pattern");
    let input = write_input(&dir);
    let out_path = dir.join("pattern-logo.patt");
    let _ = std::fs::remove_file(&out_path);

    let status = std::process::Command::new(exe())
        .arg("pattern")
        .arg("--in")
        .arg(&input)
        .arg("--out-dir")
        .arg(&dir)
        .status()
        .unwrap();

    assert!(status.success());
    let text = std::fs::read_to_string(&out_path).unwrap();
    let patt = PatternDescriptor::parse(&text).unwrap();
    assert_eq!(text.lines().next().unwrap(), [" 10"; 16].join(" "));
    assert_eq!(patt.as_str(), text);
}

#[test]
fn cli_marker_writes_png_with_requested_size_and_color() {
    let dir = PathBuf::from("target").join("cli_smoke").join("marker");
    let input = write_input(&dir);
    let out_path = dir.join("marker.png");
    let _ = std::fs::remove_file(&out_path);

    let status = std::process::Command::new(exe())
        .arg("marker")
        .arg("--in")
        .arg(&input)
        .args(["--size", "128", "--ratio", "0.5", "--color", "#0000ff", "--out"])
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = decode_image(&std::fs::read(&out_path).unwrap()).unwrap();
    assert_eq!((img.width(), img.height()), (128, 128));
    assert_eq!(img.pixel(20, 64), Some(Rgba8::opaque(0, 0, 255)));
}

#[test]
fn cli_check_color_exit_status() {
    let ok = std::process::Command::new(exe())
        .args(["check-color", "red"])
        .output()
        .unwrap();
    assert!(ok.status.success());
    assert!(String::from_utf8_lossy(&ok.stdout).contains("#ff0000"));

    let bad = std::process::Command::new(exe())
        .args(["check-color", "#00FF"])
        .output()
        .unwrap();
    assert!(!bad.status.success());
}

#[test]
fn cli_pattern_fails_on_unreadable_input() {
    let status = std::process::Command::new(exe())
        .args(["pattern", "--in", "target/cli_smoke/missing.png", "--out-dir"])
        .arg(PathBuf::from("target").join("cli_smoke"))
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn cli_pattern_refuses_inputs_that_share_an_export_name() {
    let dir = PathBuf::from("target").join("cli_smoke").join("pattern_clash");
    let _ = std::fs::remove_dir_all(&dir);
    let first = write_input(&dir.join("a"));
    let second = write_input(&dir.join("b"));
    let out_dir = dir.join("out");

    let output = std::process::Command::new(exe())
        .arg("pattern")
        .arg("--in")
        .arg(&first)
        .arg(&second)
        .arg("--out-dir")
        .arg(&out_dir)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pattern-logo.patt"), "{stderr}");
    assert!(!out_dir.join("pattern-logo.patt").exists());
}

#[test]
fn cli_marker_name_overrides_default_output_name() {
    let dir = PathBuf::from("target").join("cli_smoke").join("marker_named");
    let input = write_input(&dir);
    let expected = PathBuf::from("pattern-qr-code.png");
    let _ = std::fs::remove_file(dir.join(&expected));

    let status = std::process::Command::new(exe())
        .current_dir(&dir)
        .arg("marker")
        .arg("--in")
        .arg(input.file_name().unwrap())
        .args(["--size", "64", "--name", "qr-code"])
        .status()
        .unwrap();

    assert!(status.success());
    assert!(dir.join(&expected).exists());
}
