//! Labelled photographs, run only when `BOARDFIND_TESTDATA` points at a
//! directory holding `corners.json`:
//!
//! ```json
//! [{"image": "IMG_0001.jpg", "corners": [[x, y], [x, y], [x, y], [x, y]]}]
//! ```
//!
//! Corners are TL, TR, BR, BL in pixels.
#![cfg(feature = "image")]

use boardfind::{detect, BoardFinderParams};
use serde::Deserialize;
use std::path::PathBuf;

const TOLERANCE_PX: i32 = 10;

#[derive(Deserialize)]
struct Labelled {
    image: PathBuf,
    corners: [[i32; 2]; 4],
}

#[test]
fn labelled_photographs_match_their_corners() {
    let Some(root) = std::env::var_os("BOARDFIND_TESTDATA").map(PathBuf::from) else {
        eprintln!("BOARDFIND_TESTDATA not set, skipping");
        return;
    };
    let raw = std::fs::read_to_string(root.join("corners.json")).expect("corners.json");
    let cases: Vec<Labelled> = serde_json::from_str(&raw).expect("labels");
    let params = BoardFinderParams::default();

    let mut failures = Vec::new();
    for case in &cases {
        let img = image::open(root.join(&case.image)).expect("image");
        let found = detect::find_board(&img, &params).expect("valid image");
        let off = found
            .points
            .iter()
            .zip(case.corners)
            .any(|(p, [x, y])| (p.x - x).abs() > TOLERANCE_PX || (p.y - y).abs() > TOLERANCE_PX);
        if off {
            failures.push(format!("{}: {:?}", case.image.display(), found.points));
        }
    }
    assert!(failures.is_empty(), "mismatched corners:\n{}", failures.join("\n"));
}
