// ============================================================
// Layer 6 — Stroke Plotting
// ============================================================
// Draws a stroke sequence as a plain SVG: black 3 px polylines,
// no axes, no background.
//
// Points hold offsets, so absolute positions are the running sums
// of dx and dy. A point with the pen-up flag set closes the
// current stroke; the next point starts a new one.
//
// Canvas size follows the aspect ratio of the drawing:
//   width  = 5 · (size_x / size_y · 0.9) inches
//   height = 5 inches
// at 72 px per inch.

use std::{fmt::Write as _, fs, path::Path};

use crate::domain::stroke::StrokePoint;

const PX_PER_INCH: f32 = 72.0;
const HEIGHT_INCHES: f32 = 5.0;
const STROKE_WIDTH: f32 = 3.0;
/// Keeps the 3 px line from being clipped at the border
const MARGIN: f32 = STROKE_WIDTH;

/// Absolute pen positions, split into pen-down strokes.
fn strokes(points: &[StrokePoint]) -> Vec<Vec<(f32, f32)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    let (mut x, mut y) = (0.0f32, 0.0f32);

    for p in points {
        x += p.dx;
        y += p.dy;
        // the pen-up point closes its stroke and a trailing open stroke is kept
        current.push((x, y));
        if p.ends_stroke() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Non-zero extent, so degenerate drawings still get a canvas.
fn extent(lo: f32, hi: f32) -> f32 {
    let size = hi - lo;
    if size > f32::EPSILON { size } else { 1.0 }
}

pub fn render_svg(points: &[StrokePoint]) -> String {
    let strokes = strokes(points);

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for &(x, y) in strokes.iter().flatten() {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if strokes.is_empty() {
        (min_x, max_x, min_y, max_y) = (0.0, 0.0, 0.0, 0.0);
    }

    let size_x = extent(min_x, max_x);
    let size_y = extent(min_y, max_y);

    let height = HEIGHT_INCHES * PX_PER_INCH;
    let width = HEIGHT_INCHES * (size_x / size_y * 0.9) * PX_PER_INCH;

    let scale_x = (width - 2.0 * MARGIN).max(1.0) / size_x;
    let scale_y = (height - 2.0 * MARGIN) / size_y;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.1}" height="{height:.1}" viewBox="0 0 {width:.1} {height:.1}">"#,
    );

    for stroke in strokes.iter().filter(|s| s.len() > 1) {
        let coords: Vec<String> = stroke
            .iter()
            .map(|&(x, y)| {
                let px = MARGIN + (x - min_x) * scale_x;
                // SVG's y axis points down
                let py = height - MARGIN - (y - min_y) * scale_y;
                format!("{px:.2},{py:.2}")
            })
            .collect();

        let _ = writeln!(
            svg,
            r#"  <polyline points="{}" fill="none" stroke="black" stroke-width="{STROKE_WIDTH}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            coords.join(" "),
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Render `points` and write the SVG to `path`.
///
/// A failed write is logged and reported through the return
/// value; it never aborts the caller.
pub fn save_svg(points: &[StrokePoint], path: &Path) -> bool {
    match fs::write(path, render_svg(points)) {
        Ok(()) => {
            tracing::info!("Saved plot to '{}'", path.display());
            true
        }
        Err(e) => {
            tracing::error!("Error building image!: {}", path.display());
            tracing::debug!("Plot write failure: {e}");
            false
        }
    }
}
