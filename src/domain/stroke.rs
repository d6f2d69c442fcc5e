// ============================================================
// Layer 3 — Stroke Domain Types
// ============================================================
// On disk each point is stored as a compact JSON triple
//   [pen_up, dx, dy]
// so `StrokePoint` converts to and from `[f32; 3]` through serde.

use serde::{Deserialize, Serialize};

/// One pen offset. `dx`/`dy` are relative to the previous point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct StrokePoint {
    /// 1.0 when the pen is lifted after this point, else 0.0
    pub pen_up: f32,
    pub dx:     f32,
    pub dy:     f32,
}

impl StrokePoint {
    pub fn new(pen_up: f32, dx: f32, dy: f32) -> Self {
        Self { pen_up, dx, dy }
    }

    pub fn ends_stroke(&self) -> bool {
        self.pen_up >= 0.5
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.pen_up, self.dx, self.dy]
    }
}

impl From<[f32; 3]> for StrokePoint {
    fn from([pen_up, dx, dy]: [f32; 3]) -> Self {
        Self { pen_up, dx, dy }
    }
}

impl From<StrokePoint> for [f32; 3] {
    fn from(p: StrokePoint) -> Self {
        p.to_array()
    }
}

/// A single handwriting sample: the pen trajectory and,
/// when available, the text that was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handwriting {
    pub points: Vec<StrokePoint>,
    pub text:   Option<String>,
}

impl Handwriting {
    pub fn new(points: Vec<StrokePoint>, text: Option<String>) -> Self {
        Self { points, text }
    }

    /// Number of separate pen-down strokes in the sample
    pub fn stroke_count(&self) -> usize {
        let closed = self.points.iter().filter(|p| p.ends_stroke()).count();
        let trailing = matches!(self.points.last(), Some(p) if !p.ends_stroke());
        closed + trailing as usize
    }
}
