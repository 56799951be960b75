//! Run configuration.
//!
//! All parameters have defaults; an optional JSON file may override any of
//! them. Field names keep the experiment's established parameter names, so
//! `Dense_output` keeps its capital letter on disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    BATCH_SIZE, CHECKPOINT_PATH, DATA_PATH, DENSE_OUTPUT, EPOCHS, HIDDEN_LSTM, LEARNING_RATE,
    SAMPLE_SIZE, SEED, SEQUENCE_LENGTH, SHIFT, STATE_DIM,
};
use crate::error::LotkaVolterraError;
use crate::lstm::step_1_tensor_preparation::DatasetConfig;
use crate::lstm::step_2_lstm_cell::CellActivation;
use crate::lstm::step_4_train_model::TrainingConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotkaVolterraConfig {
    // Data parameters
    pub shift: usize,
    pub sequence_length: usize,
    pub sample_size: usize,
    // LSTM parameters
    pub hidden_lstm: usize,
    #[serde(rename = "Dense_output")]
    pub dense_output: usize,
    pub n_steps: usize,
    pub n_features: usize,
    pub epochs: usize,
    // Optimizer and reproducibility
    pub learning_rate: f64,
    pub batch_size: usize,
    pub seed: u64,
    pub activation: CellActivation,
    // Files
    pub data_path: PathBuf,
    pub checkpoint_path: PathBuf,
}

impl Default for LotkaVolterraConfig {
    fn default() -> Self {
        Self {
            shift: SHIFT,
            sequence_length: SEQUENCE_LENGTH,
            sample_size: SAMPLE_SIZE,
            hidden_lstm: HIDDEN_LSTM,
            dense_output: DENSE_OUTPUT,
            n_steps: SEQUENCE_LENGTH,
            n_features: STATE_DIM,
            epochs: EPOCHS,
            learning_rate: LEARNING_RATE,
            batch_size: BATCH_SIZE,
            seed: SEED,
            activation: CellActivation::default(),
            data_path: PathBuf::from(DATA_PATH),
            checkpoint_path: PathBuf::from(CHECKPOINT_PATH),
        }
    }
}

impl LotkaVolterraConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Load `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn dataset_config(&self) -> DatasetConfig {
        DatasetConfig::new(self.sequence_length, self.shift, self.sample_size)
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            hidden_lstm: self.hidden_lstm,
            dense_output: self.dense_output,
            n_steps: self.n_steps,
            n_features: self.n_features,
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            seed: self.seed,
            activation: self.activation,
            checkpoint_path: self.checkpoint_path.clone(),
        }
    }

    /// Validate both stages before any data is read
    pub fn validate(&self) -> Result<(), LotkaVolterraError> {
        self.dataset_config().validate()?;
        self.training_config().validate(self.sequence_length)?;
        Ok(())
    }
}
