//! Error taxonomy for dataset construction and training.
//!
//! Each stage has its own enum; [`LotkaVolterraError`] wraps them so the
//! binary can report which stage aborted the run.

use thiserror::Error;

/// Failures while loading the trajectory or building the splits.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(
        "insufficient data: trajectory has {len} states but a window needs more than {required}"
    )]
    InsufficientData { len: usize, required: usize },

    #[error("failed to read trajectory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode trajectory: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("failed to encode trajectory: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to read trajectory csv: {0}")]
    Csv(#[from] polars::error::PolarsError),
}

/// Failures raised while fitting or evaluating the model.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("the {0} split is empty")]
    EmptySplit(&'static str),

    #[error("training diverged at epoch {epoch}: loss is {loss}")]
    Diverged { epoch: usize, loss: f64 },

    #[error("failed to write checkpoint: {0:#}")]
    Checkpoint(anyhow::Error),
}

/// Top-level error naming the stage that failed.
#[derive(Debug, Error)]
pub enum LotkaVolterraError {
    #[error("dataset construction failed: {0}")]
    Dataset(#[from] DatasetError),

    #[error("training failed: {0}")]
    Training(#[from] TrainingError),
}
