use boardfind_core::GrayImage;
use boardfind_lines::{
    detect_lines, refine_line, select_border_pair, sobel, split_by_axis, ClusterParams,
    HoughParams, RefineParams,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// 640×480 frame with an axis-aligned 8×8 board of 40 px squares.
fn synthetic_board() -> GrayImage {
    let (w, h) = (640usize, 480usize);
    let (x0, y0, sq) = (160usize, 80usize, 40usize);
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let inside = x >= x0 && y >= y0 && x < x0 + 8 * sq && y < y0 + 8 * sq;
            img.data[y * w + x] = if !inside {
                110
            } else if ((x - x0) / sq + (y - y0) / sq) % 2 == 0 {
                230
            } else {
                30
            };
        }
    }
    img
}

fn bench_lines(c: &mut Criterion) {
    let img = synthetic_board();
    let grad = sobel(&img.view());
    let hough = HoughParams::default();
    let lines = detect_lines(&grad, &hough);
    let split = split_by_axis(&lines, img.width, img.height, &ClusterParams::default());

    c.bench_function("sobel_640x480", |b| b.iter(|| sobel(black_box(&img.view()))));
    c.bench_function("hough_640x480", |b| {
        b.iter(|| detect_lines(black_box(&grad), black_box(&hough)))
    });
    c.bench_function("border_pair", |b| {
        b.iter(|| select_border_pair(black_box(&split.horizontal), &ClusterParams::default()))
    });
    if let Some(line) = lines.first() {
        c.bench_function("refine_line", |b| {
            b.iter(|| refine_line(black_box(line), &grad, &RefineParams::default()))
        });
    }
}

criterion_group!(benches, bench_lines);
criterion_main!(benches);
