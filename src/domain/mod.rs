// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe handwriting, independent of
// any tensor framework.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// A handwriting sample is a sequence of pen offsets:
//
//   (pen_up, dx, dy), (pen_up, dx, dy), ...
//
// `pen_up = 1` marks the last point of a stroke; the next point
// starts a new stroke after the pen is lifted.

/// Stroke points and whole handwriting samples
pub mod stroke;

/// Which network variant a run trains
pub mod model_kind;

/// Core abstractions (traits) that other layers implement
pub mod traits;
