#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const BACKGROUND: u8 = 110;

fn boardfind() -> Command {
    Command::cargo_bin("boardfind").expect("binary")
}

/// 640×480 photo with an 8×8 board over pixels 160..480 × 80..400.
fn write_board(path: &Path) {
    let img = image::RgbImage::from_fn(640, 480, |x, y| {
        let inside = (160..480).contains(&x) && (80..400).contains(&y);
        let v = if !inside {
            BACKGROUND
        } else if ((x - 160) / 40 + (y - 80) / 40) % 2 == 0 {
            230
        } else {
            30
        };
        image::Rgb([v, v, v])
    });
    img.save(path).expect("save board");
}

fn write_blank(path: &Path, w: u32, h: u32) {
    image::RgbImage::from_pixel(w, h, image::Rgb([90, 90, 90]))
        .save(path)
        .expect("save blank");
}

const CAMERA_JSON: &str = r#"{
  "intrinsics": {"width": 640, "height": 480, "fx": 500.0, "fy": 500.0, "ppx": 320.0, "ppy": 240.0}
}"#;

/// A white piece on e2: surface points at z=1000 plus a 5×5 patch of
/// colored points 50 units closer to the camera.
fn scan_json() -> String {
    let mut points = Vec::new();
    for (u, v) in [(336.0, 136.0), (344.0, 144.0)] {
        let (x, y) = ((u - 320.0) * 2.0, (v - 240.0) * 2.0);
        points.push(format!(r#"{{"position": [{x}, {y}, 1000.0]}}"#));
    }
    for i in 0..5 {
        for j in 0..5 {
            let (u, v) = (332.0 + 4.0 * i as f64, 132.0 + 4.0 * j as f64);
            let (x, y) = ((u - 320.0) * 1.9, (v - 240.0) * 1.9);
            points.push(format!(
                r#"{{"position": [{x}, {y}, 950.0], "color": [240, 240, 240]}}"#
            ));
        }
    }
    format!(r#"{{"points": [{}]}}"#, points.join(","))
}

#[test]
fn corners_on_a_blank_image_print_the_default_quad() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("blank.png");
    let annotated = dir.path().join("blank_output.png");
    write_blank(&input, 320, 240);

    boardfind()
        .arg("corners")
        .arg(&input)
        .arg("--annotate")
        .arg(&annotated)
        .assert()
        .success()
        .stdout(predicate::str::contains("Image size: 320x240"))
        .stdout(predicate::str::contains("Board not detected"))
        .stdout(predicate::str::contains("  Top-left:     (80, 60)"))
        .stdout(predicate::str::contains("  Bottom-right: (240, 180)"));

    let marked = image::open(&annotated).expect("annotated").to_rgb8();
    assert_eq!(marked.get_pixel(90, 60).0, [255, 0, 0]);
    assert_eq!(marked.get_pixel(160, 120).0, [90, 90, 90]);
}

#[test]
fn corners_on_a_board_are_detected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("board.png");
    write_board(&input);

    boardfind()
        .arg("corners")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found corners:"))
        .stdout(predicate::str::contains("Board not detected").not());
}

#[test]
fn rectify_writes_a_square_image_of_the_requested_size() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("board.png");
    let out = dir.path().join("rect.png");
    write_board(&input);

    boardfind()
        .args(["rectify", "--size", "96"])
        .arg(&input)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rectified 96x96 board"));

    let rect = image::open(&out).expect("rectified");
    assert_eq!((rect.width(), rect.height()), (96, 96));
}

#[test]
fn rectify_size_comes_from_the_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("blank.png");
    let out = dir.path().join("rect.png");
    let config = dir.path().join("config.json");
    write_blank(&input, 200, 100);
    std::fs::write(&config, r#"{"partition": {"rectified_size": 40}}"#).expect("config");

    boardfind()
        .arg("rectify")
        .arg(&input)
        .arg(&out)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    let rect = image::open(&out).expect("rectified");
    assert_eq!((rect.width(), rect.height()), (40, 40));
}

#[test]
fn squares_classifies_a_piece_and_writes_a_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("board.png");
    let scan = dir.path().join("scan.json");
    let camera = dir.path().join("camera.json");
    let report = dir.path().join("report.json");
    write_board(&input);
    std::fs::write(&scan, scan_json()).expect("scan");
    std::fs::write(&camera, CAMERA_JSON).expect("camera");

    boardfind()
        .arg("squares")
        .arg(&input)
        .arg(&scan)
        .arg("--camera")
        .arg(&camera)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("e2 W 27"))
        .stdout(predicate::str::contains("a1 . 0"))
        .stdout(predicate::str::contains("h8 . 0"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("report")).expect("json");
    let squares = json["squares"].as_array().expect("squares");
    assert_eq!(squares.len(), 64);
    assert_eq!(squares[12]["square"], "e2");
    assert_eq!(squares[12]["occupancy"], "white");
    assert_eq!(squares[12]["point_count"], 27);
}

#[test]
fn squares_without_a_camera_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("blank.png");
    let scan = dir.path().join("scan.json");
    write_blank(&input, 64, 64);
    std::fs::write(&scan, r#"{"points": []}"#).expect("scan");

    boardfind()
        .arg("squares")
        .arg(&input)
        .arg(&scan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no camera model"));
}

#[test]
fn missing_image_fails() {
    boardfind()
        .args(["corners", "/definitely/not/here.png"])
        .assert()
        .failure();
}
