//! Shapes drawn by the primitives compared against hand-built masks.

use std::cmp::Ordering;

use textscreen_core::bitmap::{Bitmap, Region};
use textscreen_core::drawing::{Brush, Draw, FillMode};
use textscreen_core::settings::Settings;

fn mask(rows: &[&str], ink: u8, space: u8) -> Bitmap {
    let mut b = Bitmap::new(rows[0].len() as i32, rows.len() as i32, space).unwrap();
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.bytes().enumerate() {
            if ch == b'*' {
                b.put(x as i32, y as i32, ink);
            }
        }
    }
    b
}

#[test]
fn filled_circle_matches_reference_mask() {
    let mut settings = Settings::default();
    settings.set_sar(1.0);
    let brush = Brush::from(&settings);

    let mut drawn = Bitmap::create(10, 10, &settings).unwrap();
    drawn.draw_fill_circle(5, 5, 4, b'*', &brush).unwrap();

    let reference = mask(
        &[
            "..........",
            "....***...",
            "..*******.",
            "..*******.",
            ".*********",
            ".*********",
            ".*********",
            "..*******.",
            "..*******.",
            "....***...",
        ],
        b'*',
        settings.space,
    );
    assert_eq!(drawn.compare(&reference, 0, 0), Ordering::Equal);
}

#[test]
fn default_aspect_circle_matches_reference_mask() {
    let settings = Settings::default();
    let brush = Brush::from(&settings);

    let mut drawn = Bitmap::create(10, 10, &settings).unwrap();
    drawn.draw_fill_circle(5, 5, 4, b'*', &brush).unwrap();

    let reference = mask(
        &[
            "..........",
            "..*******.",
            "**********",
            "**********",
            "**********",
            "**********",
            "**********",
            "**********",
            "**********",
            "..*******.",
        ],
        b'*',
        settings.space,
    );
    assert_eq!(drawn.compare(&reference, 0, 0), Ordering::Equal);
}

#[test]
fn frame_with_label() {
    let settings = Settings::default();
    let brush = Brush::from(&settings);
    let mut b = Bitmap::create(12, 3, &settings).unwrap();
    b.draw_rect(Region::new(0, 0, 12, 3), b'#', FillMode::Outline, &brush);
    b.draw_text(2, 1, b"status");

    let expected: [&[u8]; 3] = [b"############", b"# status   #", b"############"];
    for (y, row) in expected.iter().enumerate() {
        assert_eq!(b.row(y as i32).unwrap(), *row);
    }
}
