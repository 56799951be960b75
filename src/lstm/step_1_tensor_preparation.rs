// External crates
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use log::{debug, info};
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

// Internal modules
use crate::constants::{
    HEAD_SPLIT, SAMPLE_SIZE, SEQUENCE_LENGTH, SHIFT, STATE_DIM, TEST_CAP_DIVISOR, TRAIN_SPLIT,
};
use crate::error::DatasetError;
use crate::util::trajectory_io;

/// One sampled population state: `[predator, prey]`
pub type StateVector = [f64; STATE_DIM];

/// Window configuration for the dataset builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Number of observed steps fed to the model
    pub sequence_length: usize,
    /// Forecast horizon in steps
    pub shift: usize,
    /// Cap on train + validation windows
    pub sample_size: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            sequence_length: SEQUENCE_LENGTH,
            shift: SHIFT,
            sample_size: SAMPLE_SIZE,
        }
    }
}

impl DatasetConfig {
    pub fn new(sequence_length: usize, shift: usize, sample_size: usize) -> Self {
        Self {
            sequence_length,
            shift,
            sample_size,
        }
    }

    /// Length of the trajectory slice a window is cut from
    ///
    /// Saturates on overflow; `validate` rejects such configurations.
    pub fn total_length(&self) -> usize {
        self.sequence_length.saturating_add(self.shift)
    }

    /// Reject zero-valued parameters and window lengths that overflow
    pub fn validate(&self) -> Result<(), DatasetError> {
        let fields = [
            ("sequence_length", self.sequence_length),
            ("shift", self.shift),
            ("sample_size", self.sample_size),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(DatasetError::Configuration(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }
        if self.sequence_length.checked_add(self.shift).is_none() {
            return Err(DatasetError::Configuration(format!(
                "sequence_length ({}) + shift ({}) overflows",
                self.sequence_length, self.shift
            )));
        }
        Ok(())
    }
}

/// A single sample cut from the trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Index of the first input state in the trajectory
    pub start: usize,
    /// Observed history, `sequence_length` states
    pub inputs: Vec<StateVector>,
    /// State `shift` steps after the last input state
    pub target: StateVector,
}

/// Index ranges of each split within the ordered window list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPartition {
    pub total: usize,
    pub head: usize,
    pub train: Range<usize>,
    pub validation: Range<usize>,
    pub test: Range<usize>,
}

/// Samples of one split, ready to be fed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    /// `[samples, sequence_length, STATE_DIM]`
    pub inputs: Array3<f32>,
    /// `[samples, STATE_DIM]`
    pub targets: Array2<f32>,
    /// Trajectory index of each sample's first input state
    pub window_starts: Vec<usize>,
}

impl DatasetSplit {
    /// Copy the windows starting at `starts` straight out of the trajectory
    fn from_range(
        trajectory: &[StateVector],
        config: &DatasetConfig,
        starts: Range<usize>,
    ) -> Self {
        let sequence_length = config.sequence_length;
        let total_length = config.total_length();
        let mut inputs = Array3::<f32>::zeros((starts.len(), sequence_length, STATE_DIM));
        let mut targets = Array2::<f32>::zeros((starts.len(), STATE_DIM));

        for (i, start) in starts.clone().enumerate() {
            let slice = &trajectory[start..start + total_length];
            for (t, state) in slice[..sequence_length].iter().enumerate() {
                for (d, value) in state.iter().enumerate() {
                    inputs[[i, t, d]] = *value as f32;
                }
            }
            for (d, value) in slice[total_length - 1].iter().enumerate() {
                targets[[i, d]] = *value as f32;
            }
        }

        Self {
            inputs,
            targets,
            window_starts: starts.collect(),
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sequence_length(&self) -> usize {
        self.inputs.len_of(Axis(1))
    }

    /// Convert the split to `(features, targets)` tensors on `device`
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let n = self.len();
        let features = TensorData::new(
            self.inputs.iter().copied().collect::<Vec<f32>>(),
            [n, self.sequence_length(), STATE_DIM],
        );
        let targets = TensorData::new(
            self.targets.iter().copied().collect::<Vec<f32>>(),
            [n, STATE_DIM],
        );
        (
            Tensor::<B, 3>::from_data(features, device),
            Tensor::<B, 2>::from_data(targets, device),
        )
    }
}

/// The three immutable splits built from one trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct LotkaVolterraDataset {
    pub config: DatasetConfig,
    pub train: DatasetSplit,
    pub validation: DatasetSplit,
    pub test: DatasetSplit,
    /// Windows generated before any capping
    pub total_windows: usize,
    /// Windows in the train/validation region
    pub head_windows: usize,
}

/// Number of windows a trajectory of `len` states yields
pub fn window_count(len: usize, config: &DatasetConfig) -> Result<usize, DatasetError> {
    config.validate()?;
    let total_length = config.total_length();
    if len <= total_length {
        return Err(DatasetError::InsufficientData {
            len,
            required: total_length,
        });
    }
    Ok(len - total_length)
}

/// Slice the trajectory into overlapping windows in start-index order
///
/// Window `idx` covers `trajectory[idx..idx + sequence_length + shift]`; its
/// inputs are the first `sequence_length` states and its target is the last
/// state of that slice.
pub fn build_windows(
    trajectory: &[StateVector],
    config: &DatasetConfig,
) -> Result<Vec<Window>, DatasetError> {
    let count = window_count(trajectory.len(), config)?;
    let total_length = config.total_length();

    let windows = (0..count)
        .map(|idx| {
            let slice = &trajectory[idx..idx + total_length];
            Window {
                start: idx,
                inputs: slice[..config.sequence_length].to_vec(),
                target: slice[total_length - 1],
            }
        })
        .collect();
    Ok(windows)
}

/// Assign window positions to splits without looking at their contents
///
/// The first 80% of windows form the train/validation region, the rest the
/// test region. A `sample_size` larger than the region uses what is there.
pub fn partition_windows(total_windows: usize, sample_size: usize) -> WindowPartition {
    let head = total_windows * HEAD_SPLIT.0 / HEAD_SPLIT.1;
    let tail = total_windows - head;

    let pool = sample_size.min(head);
    let train_len = pool * TRAIN_SPLIT.0 / TRAIN_SPLIT.1;
    let test_len = (sample_size / TEST_CAP_DIVISOR).min(tail);

    WindowPartition {
        total: total_windows,
        head,
        train: 0..train_len,
        validation: train_len..pool,
        test: head..head + test_len,
    }
}

/// Build train, validation and test splits from an in-memory trajectory
pub fn prepare_dataset(
    trajectory: &[StateVector],
    config: &DatasetConfig,
) -> Result<LotkaVolterraDataset, DatasetError> {
    let total_windows = window_count(trajectory.len(), config)?;
    let partition = partition_windows(total_windows, config.sample_size);
    if partition.head < config.sample_size {
        debug!(
            "sample_size {} exceeds the {} windows available for train/validation, using all of them",
            config.sample_size, partition.head
        );
    }

    let dataset = LotkaVolterraDataset {
        config: config.clone(),
        train: DatasetSplit::from_range(trajectory, config, partition.train.clone()),
        validation: DatasetSplit::from_range(trajectory, config, partition.validation.clone()),
        test: DatasetSplit::from_range(trajectory, config, partition.test.clone()),
        total_windows: partition.total,
        head_windows: partition.head,
    };

    info!(
        "Prepared {} windows: train={}, validation={}, test={}",
        dataset.total_windows,
        dataset.train.len(),
        dataset.validation.len(),
        dataset.test.len()
    );
    Ok(dataset)
}

/// Read a trajectory file once and build the splits from it
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    config: &DatasetConfig,
) -> Result<LotkaVolterraDataset, DatasetError> {
    config.validate()?;
    let trajectory = trajectory_io::read_trajectory(path.as_ref())?;
    prepare_dataset(&trajectory, config)
}
