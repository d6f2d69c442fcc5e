// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer loads samples through this trait only,
// so a different on-disk format just needs another implementor.

use anyhow::Result;
use crate::domain::stroke::Handwriting;

// ─── HandwritingSource ────────────────────────────────────────────────────────
/// Any component that can produce handwriting samples.
///
/// Implementations:
///   - StrokeFileLoader → strokes.json (+ sentences.txt)
pub trait HandwritingSource {
    /// Load every available sample, in file order.
    fn load_all(&self) -> Result<Vec<Handwriting>>;
}
