// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the filesystem:
//
//   checkpoint.rs — Saving and loading model weights
//                   (Burn's CompactRecorder) plus the JSON side
//                   files a run leaves behind: train_config.json
//                   and data_stats.json.
//
//   metrics.rs    — Per-epoch train / validation loss, appended
//                   to a CSV file for plotting learning curves.
//
//   plot.rs       — Renders a stroke sequence as an SVG image.
//                   The only place where an error is logged and
//                   swallowed instead of propagated.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Records and Checkpointing)

/// Model checkpoint and JSON side-file persistence
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// SVG rendering of stroke sequences
pub mod plot;
