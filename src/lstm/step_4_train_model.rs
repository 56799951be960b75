// External imports
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::cast::ToElement;
use burn::tensor::Tensor;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Internal imports
use super::step_1_tensor_preparation::{DatasetSplit, LotkaVolterraDataset};
use super::step_2_lstm_cell::CellActivation;
use super::step_3_lstm_model_arch::{LotkaVolterraLstm, LotkaVolterraLstmConfig};
use super::step_6_model_serialization::BestModelCheckpoint;
use crate::constants::{
    BATCH_SIZE, CHECKPOINT_PATH, DENSE_OUTPUT, EPOCHS, HIDDEN_LSTM, LEARNING_RATE, SEED,
    SEQUENCE_LENGTH, STATE_DIM,
};
use crate::error::TrainingError;

/// Configuration for training the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub hidden_lstm: usize,
    pub dense_output: usize,
    /// Must match the dataset's `sequence_length`
    pub n_steps: usize,
    /// Must match the state dimensionality
    pub n_features: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub seed: u64,
    pub activation: CellActivation,
    pub checkpoint_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_lstm: HIDDEN_LSTM,
            dense_output: DENSE_OUTPUT,
            n_steps: SEQUENCE_LENGTH,
            n_features: STATE_DIM,
            epochs: EPOCHS,
            learning_rate: LEARNING_RATE,
            batch_size: BATCH_SIZE,
            seed: SEED,
            activation: CellActivation::default(),
            checkpoint_path: PathBuf::from(CHECKPOINT_PATH),
        }
    }
}

impl TrainingConfig {
    /// Check hyperparameters against each other and the window length
    pub fn validate(&self, sequence_length: usize) -> Result<(), TrainingError> {
        let positive = [
            ("hidden_lstm", self.hidden_lstm),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TrainingError::Configuration(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainingError::Configuration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.n_steps != sequence_length {
            return Err(TrainingError::Configuration(format!(
                "n_steps ({}) must equal sequence_length ({})",
                self.n_steps, sequence_length
            )));
        }
        if self.n_features != STATE_DIM {
            return Err(TrainingError::Configuration(format!(
                "n_features ({}) must equal the state dimensionality ({})",
                self.n_features, STATE_DIM
            )));
        }
        if self.dense_output != STATE_DIM {
            return Err(TrainingError::Configuration(format!(
                "Dense_output ({}) must equal the state dimensionality ({})",
                self.dense_output, STATE_DIM
            )));
        }
        Ok(())
    }

    pub fn architecture(&self) -> LotkaVolterraLstmConfig {
        LotkaVolterraLstmConfig::new(
            self.n_features,
            self.hidden_lstm,
            self.dense_output,
            self.activation,
        )
    }
}

/// Losses recorded at the end of one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    /// Whether this epoch produced a new checkpoint
    pub improved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
}

impl TrainingHistory {
    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|r| r.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|r| r.val_loss).collect()
    }

    /// Epoch with the lowest validation loss
    pub fn best_epoch(&self) -> Option<&EpochRecord> {
        self.epochs.iter().rev().find(|r| r.improved)
    }
}

/// Everything a training run produces
#[derive(Debug)]
pub struct TrainingOutcome<B: Backend> {
    /// Model after the final epoch
    pub model: LotkaVolterraLstm<B>,
    pub history: TrainingHistory,
    /// Where the best-validation snapshot was written
    pub checkpoint_path: PathBuf,
    /// Test-split MSE of the final model
    pub test_loss: f64,
}

/// Mean squared error over every element
pub fn mse_loss<B: Backend>(predictions: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let diff = predictions - targets;
    (diff.clone() * diff).mean()
}

// Split along the sample axis, keeping order
fn get_batches<B: Backend, const D: usize>(
    data: &Tensor<B, D>,
    batch_size: usize,
) -> Vec<Tensor<B, D>> {
    let num_samples = data.dims()[0];
    let mut batches = Vec::new();
    let mut start = 0;
    while start < num_samples {
        let end = usize::min(start + batch_size, num_samples);
        batches.push(data.clone().narrow(0, start, end - start));
        start = end;
    }
    batches
}

/// Adam with Keras's default moments and epsilon
pub fn optimizer_config() -> AdamConfig {
    AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-7)
}

// Visits every batch once per epoch, in a fresh seeded order each epoch
struct BatchSchedule {
    order: Vec<usize>,
    rng: StdRng,
}

impl BatchSchedule {
    fn new(num_batches: usize, seed: u64) -> Self {
        Self {
            order: (0..num_batches).collect(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_epoch(&mut self) -> &[usize] {
        self.order.shuffle(&mut self.rng);
        &self.order
    }
}

fn require_samples(split: &DatasetSplit, name: &'static str) -> Result<(), TrainingError> {
    if split.is_empty() {
        return Err(TrainingError::EmptySplit(name));
    }
    Ok(())
}

/// Train the LSTM on the train split, validating after every epoch
///
/// The snapshot with the lowest validation loss is written to
/// `config.checkpoint_path`; the returned model is the one after the last
/// epoch, evaluated on the test split.
pub fn train_model<B: AutodiffBackend>(
    dataset: &LotkaVolterraDataset,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<TrainingOutcome<B::InnerBackend>, TrainingError> {
    config.validate(dataset.config.sequence_length)?;
    require_samples(&dataset.train, "train")?;
    require_samples(&dataset.validation, "validation")?;
    require_samples(&dataset.test, "test")?;

    B::seed(config.seed);
    let architecture = config.architecture();
    let mut model: LotkaVolterraLstm<B> = architecture.init(device);
    let mut optimizer = optimizer_config().init();
    let mut checkpoint =
        BestModelCheckpoint::new(&config.checkpoint_path, dataset.config.sequence_length);

    let (train_features, train_targets) = dataset.train.to_tensors::<B>(device);
    let feature_batches = get_batches(&train_features, config.batch_size);
    let target_batches = get_batches(&train_targets, config.batch_size);
    let num_samples = dataset.train.len() as f64;
    let mut schedule = BatchSchedule::new(feature_batches.len(), config.seed);

    info!(
        "Training on {} samples, validating on {} samples for {} epochs",
        dataset.train.len(),
        dataset.validation.len(),
        config.epochs
    );

    let mut history = TrainingHistory::default();
    for epoch in 1..=config.epochs {
        let mut epoch_loss = 0.0;
        for &batch in schedule.next_epoch() {
            let batch_features = &feature_batches[batch];
            let batch_targets = &target_batches[batch];
            let batch_len = batch_features.dims()[0] as f64;
            let predictions = model.forward(batch_features.clone());
            let loss_tensor = mse_loss(predictions, batch_targets.clone());
            let loss = loss_tensor.clone().into_scalar().to_f64();
            if !loss.is_finite() {
                return Err(TrainingError::Diverged { epoch, loss });
            }
            epoch_loss += loss * batch_len;

            let grads = loss_tensor.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }
        let train_loss = epoch_loss / num_samples;

        let val_loss = evaluate_model(&model.valid(), &dataset.validation, device)?;
        if !val_loss.is_finite() {
            return Err(TrainingError::Diverged {
                epoch,
                loss: val_loss,
            });
        }

        let improved = checkpoint
            .observe(&model, &architecture, epoch, val_loss)
            .map_err(TrainingError::Checkpoint)?;
        debug!(
            "Epoch {}/{} - loss: {:.6} - val_loss: {:.6}",
            epoch, config.epochs, train_loss, val_loss
        );
        history.epochs.push(EpochRecord {
            epoch,
            train_loss,
            val_loss,
            improved,
        });
    }

    let model = model.valid();
    let test_loss = evaluate_model(&model, &dataset.test, device)?;
    info!("Training completed, test loss: {:.6}", test_loss);

    Ok(TrainingOutcome {
        model,
        history,
        checkpoint_path: checkpoint.path().to_path_buf(),
        test_loss,
    })
}

/// Mean squared error of `model` on a split
pub fn evaluate_model<B: Backend>(
    model: &LotkaVolterraLstm<B>,
    split: &DatasetSplit,
    device: &B::Device,
) -> Result<f64, TrainingError> {
    require_samples(split, "evaluation")?;
    let (features, targets) = split.to_tensors::<B>(device);
    let predictions = model.forward(features);
    Ok(mse_loss(predictions, targets).into_scalar().to_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lstm::step_1_tensor_preparation::{prepare_dataset, DatasetConfig};
    use crate::lstm::step_6_model_serialization::{load_metadata, verify_model};
    use crate::util::test_utils::oscillating_trajectory;
    use burn_autodiff::Autodiff;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use tempfile::tempdir;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn small_config(checkpoint_path: PathBuf) -> TrainingConfig {
        TrainingConfig {
            hidden_lstm: 4,
            n_steps: 5,
            epochs: 3,
            batch_size: 8,
            checkpoint_path,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_mse_loss() {
        let device = NdArrayDevice::default();
        let predictions = Tensor::<NdArray, 2>::from_floats([[1.0, 2.0], [3.0, 4.0]], &device);
        let targets = Tensor::<NdArray, 2>::from_floats([[1.0, 0.0], [3.0, 5.0]], &device);

        let loss = mse_loss(predictions, targets).into_scalar().to_f64();
        assert!((loss - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_get_batches_keeps_order() {
        let device = NdArrayDevice::default();
        let data = Tensor::<NdArray, 1>::from_floats([0.0, 1.0, 2.0, 3.0, 4.0], &device);
        let batches = get_batches(&data, 2);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].dims(), [1]);
        assert_eq!(batches[1].to_data().to_vec::<f32>().unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_batch_schedule_is_seeded_permutation() {
        let mut schedule = BatchSchedule::new(5, 42);
        let mut replay = BatchSchedule::new(5, 42);

        let mut orders = Vec::new();
        for _ in 0..10 {
            let order = schedule.next_epoch().to_vec();
            assert_eq!(order, replay.next_epoch());

            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            orders.push(order);
        }
        assert!(orders.iter().any(|order| order != &orders[0]));
    }

    #[test]
    fn test_optimizer_matches_keras_defaults() {
        let adam = serde_json::to_value(optimizer_config()).unwrap();
        assert_eq!(adam["beta_1"].as_f64().unwrap() as f32, 0.9);
        assert_eq!(adam["beta_2"].as_f64().unwrap() as f32, 0.999);
        assert_eq!(adam["epsilon"].as_f64().unwrap() as f32, 1e-7);
    }

    #[test]
    fn test_config_validation() {
        let config = TrainingConfig::default();
        assert!(config.validate(SEQUENCE_LENGTH).is_ok());
        assert!(matches!(
            config.validate(SEQUENCE_LENGTH + 1),
            Err(TrainingError::Configuration(_))
        ));

        let bad = [
            TrainingConfig { n_features: 3, ..TrainingConfig::default() },
            TrainingConfig { dense_output: 1, ..TrainingConfig::default() },
            TrainingConfig { hidden_lstm: 0, ..TrainingConfig::default() },
            TrainingConfig { epochs: 0, ..TrainingConfig::default() },
            TrainingConfig { batch_size: 0, ..TrainingConfig::default() },
            TrainingConfig { learning_rate: 0.0, ..TrainingConfig::default() },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(SEQUENCE_LENGTH),
                Err(TrainingError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_train_model_end_to_end() {
        let temp_dir = tempdir().unwrap();
        let checkpoint_path = temp_dir.path().join("best_lv_lstm");
        let device = NdArrayDevice::default();

        let trajectory = oscillating_trajectory(200);
        let dataset = prepare_dataset(&trajectory, &DatasetConfig::new(5, 1, 60)).unwrap();
        let config = small_config(checkpoint_path.clone());

        let outcome = train_model::<TestBackend>(&dataset, &config, &device).unwrap();

        assert_eq!(outcome.history.epochs.len(), 3);
        assert!(outcome.history.epochs[0].improved);
        assert!(outcome.test_loss.is_finite());
        assert_eq!(outcome.checkpoint_path, checkpoint_path);
        assert!(verify_model(&checkpoint_path).unwrap());

        // The saved snapshot is the best validation epoch
        let best = outcome.history.best_epoch().unwrap();
        let min_val = outcome
            .history
            .val_losses()
            .into_iter()
            .fold(f64::INFINITY, f64::min);
        assert_eq!(best.val_loss, min_val);
        let metadata = load_metadata(&checkpoint_path).unwrap();
        assert_eq!(metadata.epoch, best.epoch);
        assert_eq!(metadata.sequence_length, 5);
    }

    #[test]
    fn test_train_model_rejects_empty_split() {
        let temp_dir = tempdir().unwrap();
        let device = NdArrayDevice::default();
        // 4 windows: head of 3, sample_size 2 gives no test samples
        let trajectory = oscillating_trajectory(10);
        let dataset = prepare_dataset(&trajectory, &DatasetConfig::new(5, 1, 2)).unwrap();
        assert!(dataset.test.is_empty());

        let result = train_model::<TestBackend>(
            &dataset,
            &small_config(temp_dir.path().join("best")),
            &device,
        );
        assert!(matches!(result, Err(TrainingError::EmptySplit("test"))));
    }

    #[test]
    fn test_train_model_rejects_mismatched_steps() {
        let temp_dir = tempdir().unwrap();
        let device = NdArrayDevice::default();
        let trajectory = oscillating_trajectory(100);
        let dataset = prepare_dataset(&trajectory, &DatasetConfig::new(6, 1, 30)).unwrap();

        let result = train_model::<TestBackend>(
            &dataset,
            &small_config(temp_dir.path().join("best")),
            &device,
        );
        assert!(matches!(result, Err(TrainingError::Configuration(_))));
    }
}
