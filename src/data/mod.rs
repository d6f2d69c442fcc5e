// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from files on disk to padded tensor batches.
//
//   strokes.json / sentences.txt
//       │
//       ▼
//   StrokeFileLoader   → reads samples (+ transcriptions)
//       │
//       ▼
//   CharVocab          → character ids for the synthesis window
//       │
//       ▼
//   split_train_val    → seeded shuffle + split
//       │
//       ▼
//   OffsetStats        → standardise dx / dy with train statistics
//       │
//       ▼
//   HandwritingDataset → implements Burn's Dataset trait
//       │
//       ▼
//   StrokeBatcher      → pads, masks, one-hot encodes text
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads strokes.json and sentences.txt
pub mod loader;

/// Character vocabulary for transcriptions
pub mod vocab;

/// Offset standardisation fitted on the training split
pub mod normalizer;

/// Implements Burn's Dataset trait for next-step samples
pub mod dataset;

/// Implements Burn's Batcher trait with dynamic padding
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
