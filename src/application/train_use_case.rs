// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load strokes (+ sentences)   (Layer 4 - data)
//   Step 2: Debug subset                 (Layer 4 - data)
//   Step 3: Build character vocabulary   (Layer 4 - data)
//   Step 4: Split train/validation       (Layer 4 - data)
//   Step 5: Normalise offsets            (Layer 4 - data)
//   Step 6: Build datasets               (Layer 4 - data)
//   Step 7: Save config + data stats     (Layer 6 - infra)
//   Step 8: Run training loop            (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::HandwritingDataset,
    loader::StrokeFileLoader,
    normalizer::OffsetStats,
    splitter::split_train_val,
    vocab::CharVocab,
};
use crate::domain::{model_kind::ModelKind, traits::HandwritingSource};
use crate::infra::checkpoint::{CheckpointManager, STATS_FILE};
use crate::ml::trainer::run_training;

/// Share of samples used for training; the rest validate.
pub const TRAIN_FRACTION: f64 = 0.9;

/// `--debug` trains on this many samples only
pub const DEBUG_SAMPLES: usize = 64;

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs. Serialisable so it is saved next to the
// weights as train_config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub hidden_size: usize,
    pub n_layers:    usize,
    pub batch_size:  usize,
    pub n_epochs:    usize,
    pub model:       ModelKind,
    pub data_path:   String,
    pub text_req:    bool,
    pub debug:       bool,
    pub seed:        u64,
    pub output_dir:  String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden_size: 400,
            n_layers:    3,
            batch_size:  32,
            n_epochs:    100,
            model:       ModelKind::Prediction,
            data_path:   "./data/".to_string(),
            text_req:    false,
            debug:       false,
            seed:        212,
            output_dir:  "results".to_string(),
        }
    }
}

impl TrainConfig {
    /// Transcriptions are loaded when asked for or when the network needs them
    pub fn loads_text(&self) -> bool {
        self.text_req || self.model.requires_text()
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_layers == 0 {
            bail!("--n_layers must be at least 1");
        }
        if self.hidden_size == 0 {
            bail!("--hidden_size must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("--batch_size must be at least 1");
        }
        Ok(())
    }
}

/// Written to data_stats.json: what is needed to map network
/// outputs back to raw offsets and characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataStats {
    pub offsets: OffsetStats,
    pub vocab:   Option<CharVocab>,
}

/// Datasets ready for the training loop
pub struct PreparedData {
    pub train: HandwritingDataset,
    pub valid: HandwritingDataset,
    pub stats: DataStats,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Steps 1–6: files on disk to normalised datasets.
    pub fn prepare(&self) -> Result<PreparedData> {
        let cfg = &self.config;

        // ── Step 1: Load samples ──────────────────────────────────────────────
        tracing::info!("Loading handwriting from '{}'", cfg.data_path);
        let loader = StrokeFileLoader::new(&cfg.data_path, cfg.loads_text());
        let mut samples = loader.load_all()?;
        tracing::info!("Loaded {} samples", samples.len());

        // ── Step 2: Debug subset ──────────────────────────────────────────────
        if cfg.debug && samples.len() > DEBUG_SAMPLES {
            samples.truncate(DEBUG_SAMPLES);
            tracing::info!("Debug mode: using the first {} samples", DEBUG_SAMPLES);
        }
        if samples.is_empty() {
            bail!("No handwriting samples found in '{}'", cfg.data_path);
        }

        // ── Step 3: Character vocabulary ──────────────────────────────────────
        let vocab = if cfg.loads_text() {
            let vocab = CharVocab::build(samples.iter().filter_map(|s| s.text.as_deref()));
            tracing::info!("Character vocabulary: {} symbols", vocab.len());
            if vocab.is_empty() && cfg.model.requires_text() {
                bail!("Transcriptions in '{}' contain no characters", cfg.data_path);
            }
            Some(vocab)
        } else {
            None
        };

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (mut train, mut valid) = split_train_val(samples, TRAIN_FRACTION, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), valid.len());

        // ── Step 5: Normalise with training statistics ────────────────────────
        let offsets = OffsetStats::fit(&train);
        offsets.normalize_all(&mut train);
        offsets.normalize_all(&mut valid);
        tracing::debug!("Offset mean={:?} std={:?}", offsets.mean, offsets.std);

        // ── Step 6: Burn datasets ─────────────────────────────────────────────
        let train_dataset = HandwritingDataset::from_handwriting(&train, vocab.as_ref());
        let val_dataset   = HandwritingDataset::from_handwriting(&valid, vocab.as_ref());
        if train_dataset.sample_count() == 0 || val_dataset.sample_count() == 0 {
            bail!(
                "Too few usable samples in '{}': {} train, {} validation; both splits need at least one",
                cfg.data_path,
                train_dataset.sample_count(),
                val_dataset.sample_count(),
            );
        }

        Ok(PreparedData {
            train: train_dataset,
            valid: val_dataset,
            stats: DataStats { offsets, vocab },
        })
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        let data = self.prepare()?;

        // ── Step 7: Save config and data statistics ───────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir)?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_json(STATS_FILE, &data.stats)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        let vocab_size = data.stats.vocab.as_ref().map(CharVocab::len);
        run_training(cfg, data.train, data.valid, vocab_size, ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;
    use std::fs;

    fn write_data(dir: &std::path::Path, samples: usize, with_text: bool) {
        let strokes: Vec<Vec<[f32; 3]>> = (0..samples)
            .map(|i| {
                let s = i as f32;
                vec![[0.0, s, 1.0], [0.0, 2.0, -s], [1.0, 1.0, 3.0]]
            })
            .collect();
        fs::write(dir.join("strokes.json"), serde_json::to_string(&strokes).unwrap()).unwrap();
        if with_text {
            let lines: Vec<String> = (0..samples).map(|i| format!("line {i}")).collect();
            fs::write(dir.join("sentences.txt"), lines.join("\n")).unwrap();
        }
    }

    fn config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            data_path: dir.display().to_string(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_prepare_splits_ninety_ten() {
        let dir = tempfile::tempdir().unwrap();
        write_data(dir.path(), 20, false);

        let data = TrainUseCase::new(config(dir.path())).prepare().unwrap();
        assert_eq!(data.train.len(), 18);
        assert_eq!(data.valid.len(), 2);
        assert!(data.stats.vocab.is_none());
    }

    #[test]
    fn test_debug_limits_samples() {
        let dir = tempfile::tempdir().unwrap();
        write_data(dir.path(), 100, false);

        let cfg = TrainConfig { debug: true, ..config(dir.path()) };
        let data = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(data.train.len() + data.valid.len(), DEBUG_SAMPLES);
    }

    #[test]
    fn test_synthesis_loads_text_and_vocab() {
        let dir = tempfile::tempdir().unwrap();
        write_data(dir.path(), 10, true);

        let cfg = TrainConfig { model: ModelKind::Synthesis, ..config(dir.path()) };
        let data = TrainUseCase::new(cfg).prepare().unwrap();
        let vocab = data.stats.vocab.unwrap();
        // " 0123456789eiln"
        assert_eq!(vocab.len(), 15);
        assert!(data.train.get(0).unwrap().text.is_some());
    }

    #[test]
    fn test_synthesis_without_sentences_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_data(dir.path(), 10, false);

        let cfg = TrainConfig { model: ModelKind::Synthesis, ..config(dir.path()) };
        assert!(TrainUseCase::new(cfg).prepare().is_err());
    }

    #[test]
    fn test_tiny_corpus_leaves_no_validation_and_fails() {
        // round(5 · 0.9) = 5, so every sample would go to training
        let dir = tempfile::tempdir().unwrap();
        write_data(dir.path(), 5, false);

        let err = TrainUseCase::new(config(dir.path())).prepare().err().unwrap();
        assert!(err.to_string().contains("0 validation"), "{err}");
    }

    #[test]
    fn test_rejects_zero_layers() {
        let cfg = TrainConfig { n_layers: 0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }
}
