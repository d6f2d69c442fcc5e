// ============================================================
// Layer 2 — PlotUseCase
// ============================================================
// Loads the raw (unnormalised) dataset and renders one sample
// to an SVG file.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::loader::StrokeFileLoader;
use crate::domain::traits::HandwritingSource;
use crate::infra::plot::save_svg;

pub struct PlotUseCase {
    data_path: String,
    index:     usize,
    output:    PathBuf,
}

impl PlotUseCase {
    pub fn new(data_path: String, index: usize, output: PathBuf) -> Self {
        Self { data_path, index, output }
    }

    /// Returns whether the image was written. A failed write is
    /// logged by the plotter and is not an error.
    pub fn execute(&self) -> Result<bool> {
        let samples = StrokeFileLoader::new(&self.data_path, false).load_all()?;
        let sample = samples.get(self.index).with_context(|| {
            format!("Sample {} out of range ({} samples)", self.index, samples.len())
        })?;

        tracing::info!(
            "Plotting sample {} ({} points, {} strokes)",
            self.index,
            sample.points.len(),
            sample.stroke_count(),
        );
        Ok(save_svg(&sample.points, &self.output))
    }
}
