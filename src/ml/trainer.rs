// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch-based train + validation loop using Burn's DataLoader
// and Adam.
//
// Per training batch:
//   1. move tensors to the device, fresh hidden state
//   2. forward, masked mixture-density loss
//   3. backward with ∂loss/∂ŷ clamped to ±100
//   4. clamp every parameter gradient element to ±10
//   5. one Adam step
//
// Burn notes:
//   - Training uses TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on ValidBackend (Wgpu), so
//     validation cannot build a graph or touch the optimizer
//   - The validation batcher must also use ValidBackend
//   - Each backward() returns a new gradient store, so nothing
//     accumulates across batches and there is no zero_grad step
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{StrokeBatch, StrokeBatcher},
    dataset::HandwritingDataset,
};
use crate::domain::model_kind::ModelKind;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    gradient::{
        backward_with_output_clamp, clamp_parameter_gradients, max_abs_gradient,
        OUTPUT_GRAD_LIMIT, PARAM_GRAD_LIMIT,
    },
    loss::mixture_density_loss,
    model::{StrokeModel, TextConditioning},
    prediction::PredictionNetConfig,
    synthesis::SynthesisNetConfig,
};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
type ValidBackend = burn::backend::Wgpu;

pub const LEARNING_RATE: f64 = 1e-3;

/// Progress is logged on batches 0, 10, 20, ...
pub const LOG_EVERY: usize = 10;

/// Running sum of batch losses over the examples they covered.
#[derive(Debug, Default, Clone, Copy)]
pub struct LossAccumulator {
    total:    f64,
    examples: usize,
}

impl LossAccumulator {
    pub fn add(&mut self, batch_loss: f64, batch_size: usize) {
        self.total    += batch_loss;
        self.examples += batch_size;
    }

    /// Sum of batch losses divided by the number of examples, not batches.
    pub fn average(&self) -> f64 {
        if self.examples > 0 {
            self.total / self.examples as f64
        } else {
            f64::NAN
        }
    }
}

/// Outcome of [`train`]: the final model and per-epoch loss curves.
pub struct TrainingReport<M> {
    pub model:        M,
    pub train_losses: Vec<f64>,
    pub valid_losses: Vec<f64>,
    pub model_path:   PathBuf,
}

// ─── Shared batch handling ────────────────────────────────────────────────────

struct BatchOutput<B: Backend> {
    y_hat:      Tensor<B, 3>,
    targets:    Tensor<B, 3>,
    mask:       Tensor<B, 2>,
    batch_size: usize,
}

/// Text tensors are only handed to models that use them; a
/// conditioned model without them is an error.
fn text_conditioning<B: Backend, M: StrokeModel<B>>(
    model:     &M,
    text:      Option<Tensor<B, 3>>,
    text_mask: Option<Tensor<B, 2>>,
) -> Result<Option<TextConditioning<B>>> {
    if !model.supports_text_conditioning() {
        return Ok(None);
    }
    match (text, text_mask) {
        (Some(text), Some(text_mask)) => Ok(Some(TextConditioning { text, text_mask })),
        _ => bail!("Model is text-conditioned but the batch has no transcription tensors"),
    }
}

fn forward_batch<B: Backend, M: StrokeModel<B>>(
    model:  &M,
    batch:  StrokeBatch<B>,
    device: &B::Device,
) -> Result<BatchOutput<B>> {
    let batch = batch.to_device(device);
    let batch_size = batch.batch_size();
    let StrokeBatch { inputs, targets, mask, text, text_mask } = batch;

    let text  = text_conditioning(model, text, text_mask)?;
    let state = model.init_hidden(batch_size, device);
    let (y_hat, _state) = model.forward(inputs, text, state)?;

    Ok(BatchOutput { y_hat, targets, mask, batch_size })
}

fn log_progress(epoch: usize, batch_index: usize, loss: f64, batch_size: usize) {
    if batch_index % LOG_EVERY == 0 {
        tracing::info!(
            "[{}, {:5}] loss: {:.3}",
            epoch + 1,
            batch_index + 1,
            loss / batch_size as f64,
        );
    }
}

// ─── Training pass ────────────────────────────────────────────────────────────

/// One pass over `batches` with a parameter update per batch.
/// Returns the updated model and the epoch's average loss.
pub fn train_epoch<B, M, O>(
    mut model: M,
    optim:     &mut O,
    epoch:     usize,
    batches:   &dyn DataLoader<StrokeBatch<B>>,
    device:    &B::Device,
) -> Result<(M, f64)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + StrokeModel<B>,
    O: Optimizer<M, B>,
{
    let mut epoch_loss = LossAccumulator::default();

    for (i, batch) in batches.iter().enumerate() {
        let out = forward_batch(&model, batch, device)?;

        let (loss, grads) =
            backward_with_output_clamp(out.y_hat, out.targets, out.mask, OUTPUT_GRAD_LIMIT);

        let mut grads = GradientsParams::from_grads(grads, &model);
        clamp_parameter_gradients(&model, &mut grads, PARAM_GRAD_LIMIT);
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("batch {}: max |grad| = {:.4}", i + 1, max_abs_gradient(&model, &grads));
        }

        model = optim.step(LEARNING_RATE, model, grads);

        let loss: f64 = loss.into_scalar().elem::<f64>();
        epoch_loss.add(loss, out.batch_size);
        log_progress(epoch, i, loss, out.batch_size);
    }

    Ok((model, epoch_loss.average()))
}

// ─── Validation pass ──────────────────────────────────────────────────────────

/// Average loss over `batches` without any parameter update.
/// Takes the model by reference; pass `model.valid()` during training.
pub fn validate<B, M>(
    model:   &M,
    epoch:   usize,
    batches: &dyn DataLoader<StrokeBatch<B>>,
    device:  &B::Device,
) -> Result<f64>
where
    B: Backend,
    M: StrokeModel<B>,
{
    let mut epoch_loss = LossAccumulator::default();

    for (i, batch) in batches.iter().enumerate() {
        let out = forward_batch(model, batch, device)?;

        let loss: f64 = mixture_density_loss(out.targets, out.y_hat, out.mask)
            .into_scalar()
            .elem::<f64>();
        epoch_loss.add(loss, out.batch_size);
        log_progress(epoch, i, loss, out.batch_size);
    }

    Ok(epoch_loss.average())
}

// ─── Epoch loop ───────────────────────────────────────────────────────────────

/// Train for `epochs` epochs, validating after each one, then save
/// the final parameters as `best_model`. With zero epochs nothing
/// is updated and the initial parameters are saved.
pub fn train<B, M>(
    mut model:     M,
    train_batches: &dyn DataLoader<StrokeBatch<B>>,
    valid_batches: &dyn DataLoader<StrokeBatch<B::InnerBackend>>,
    epochs:        usize,
    checkpoints:   &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        &B::Device,
) -> Result<TrainingReport<M>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + StrokeModel<B>,
    M::InnerModule: StrokeModel<B::InnerBackend>,
{
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let mut train_losses = Vec::with_capacity(epochs);
    let mut valid_losses = Vec::with_capacity(epochs);

    for epoch in 0..epochs {
        tracing::info!("training.....");
        let (trained, train_loss) = train_epoch(model, &mut optim, epoch, train_batches, device)?;
        model = trained;

        tracing::info!("validation....");
        let valid_loss = validate(&model.valid(), epoch, valid_batches, device)?;

        println!("Epoch {}: Train: avg. loss: {:.3}", epoch + 1, train_loss);
        println!("Epoch {}: Valid: avg. loss: {:.3}", epoch + 1, valid_loss);

        metrics.log(&EpochMetrics::new(epoch + 1, train_loss, valid_loss))?;
        train_losses.push(train_loss);
        valid_losses.push(valid_loss);
    }

    let model_path = checkpoints.save_model(&model)?;
    tracing::info!("Final model saved to '{}'", model_path.display());

    Ok(TrainingReport { model, train_losses, valid_losses, model_path })
}

// ─── Entry point ──────────────────────────────────────────────────────────────

/// Build the network selected by `cfg.model` on the WGPU device
/// and run the epoch loop.
pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: HandwritingDataset,
    val_dataset:   HandwritingDataset,
    vocab_size:    Option<usize>,
    ckpt_manager:  CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    TrainBackend::seed(cfg.seed);

    let metrics = MetricsLogger::new(ckpt_manager.dir())?;

    match cfg.model {
        ModelKind::Prediction => {
            let model = PredictionNetConfig::new()
                .with_hidden_size(cfg.hidden_size)
                .with_n_layers(cfg.n_layers)
                .init::<TrainBackend>(&device);
            tracing::info!(
                "Prediction network ready: {} layers, hidden_size={}",
                cfg.n_layers, cfg.hidden_size,
            );
            fit(model, cfg, train_dataset, val_dataset, vocab_size, &ckpt_manager, &metrics, device)
        }
        ModelKind::Synthesis => {
            let Some(vocab) = vocab_size else {
                bail!("The synthesis network needs a character vocabulary");
            };
            let model = SynthesisNetConfig::new(vocab)
                .with_hidden_size(cfg.hidden_size)
                .with_n_layers(cfg.n_layers)
                .init::<TrainBackend>(&device);
            tracing::info!(
                "Synthesis network ready: {} layers, hidden_size={}, vocab={}",
                cfg.n_layers, cfg.hidden_size, vocab,
            );
            fit(model, cfg, train_dataset, val_dataset, vocab_size, &ckpt_manager, &metrics, device)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fit<M>(
    model:         M,
    cfg:           &TrainConfig,
    train_dataset: HandwritingDataset,
    val_dataset:   HandwritingDataset,
    vocab_size:    Option<usize>,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        burn::backend::wgpu::WgpuDevice,
) -> Result<()>
where
    M: AutodiffModule<TrainBackend> + StrokeModel<TrainBackend>,
    M::InnerModule: StrokeModel<ValidBackend>,
{
    // ── Training data loader (AutodiffBackend, reshuffled each epoch) ─────────
    let train_batcher = StrokeBatcher::<TrainBackend>::new(device.clone(), vocab_size);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend, fixed order) ────────────────────
    let val_batcher = StrokeBatcher::<ValidBackend>::new(device.clone(), vocab_size);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let report = train(
        model,
        train_loader.as_ref(),
        val_loader.as_ref(),
        cfg.n_epochs,
        ckpt_manager,
        metrics,
        &device,
    )?;

    if let (Some(t), Some(v)) = (report.train_losses.last(), report.valid_losses.last()) {
        tracing::info!("Training complete! final train={:.3} valid={:.3}", t, v);
    } else {
        tracing::info!("Training complete! (no epochs run)");
    }
    Ok(())
}
