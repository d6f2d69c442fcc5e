// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves the final model weights using Burn's CompactRecorder,
// plus the JSON files needed to make sense of them later.
//
// Layout of the output directory:
//
//   results/
//     best_model.mpk      ← weights after the LAST epoch
//     train_config.json   ← TrainConfig of the run
//     data_stats.json     ← offset statistics + vocabulary
//     metrics.csv         ← written by MetricsLogger
//
// There is exactly one weights file. Every run overwrites it;
// there are no per-epoch snapshots and no best-epoch selection.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Stores floats at half precision
//   - Type-safe: loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;

/// Name of the weights file, without the recorder's extension
pub const MODEL_FILE:  &str = "best_model";
pub const CONFIG_FILE: &str = "train_config.json";
pub const STATS_FILE:  &str = "data_stats.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the weights are written to, with the recorder's extension
    pub fn model_path<B: Backend>(&self) -> PathBuf {
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(MODEL_FILE).with_extension(ext)
    }

    /// Write `model`'s parameters, replacing any earlier save.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<PathBuf> {
        // the recorder appends its own extension
        let path = self.dir.join(MODEL_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let saved = self.model_path::<B>();
        tracing::debug!("Saved model parameters to '{}'", saved.display());
        Ok(saved)
    }

    /// Load saved parameters into `model`, which must have the same
    /// architecture as the one that was saved.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let path = self.dir.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load model from '{}'. Has training finished?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    pub fn load_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T> {
        let path = self.dir.join(file_name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not valid", path.display()))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.save_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.load_json(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::prediction::PredictionNetConfig;

    type TestBackend = NdArray;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg = TrainConfig { n_epochs: 3, ..TrainConfig::default() };

        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.n_epochs, 3);
        assert_eq!(loaded.model, cfg.model);
    }

    #[test]
    fn test_model_save_overwrites_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("nested")).unwrap();
        let device = Default::default();
        let config = PredictionNetConfig::new().with_hidden_size(4).with_n_layers(1);

        let first = config.init::<TestBackend>(&device);
        let second = config.init::<TestBackend>(&device);
        ckpt.save_model(&first).unwrap();
        let path = ckpt.save_model(&second).unwrap();
        assert!(path.exists(), "{} missing", path.display());
        assert_eq!(path, ckpt.model_path::<TestBackend>());

        let files = fs::read_dir(ckpt.dir()).unwrap().count();
        assert_eq!(files, 1);

        let loaded = ckpt.load_model(config.init::<TestBackend>(&device), &device).unwrap();
        let a = loaded.output.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = second.output.weight.val().into_data().to_vec::<f32>().unwrap();
        // CompactRecorder stores half precision
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-3));
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let model = PredictionNetConfig::new().with_hidden_size(4).init::<TestBackend>(&device);
        assert!(ckpt.load_model(model, &device).is_err());
    }
}
