use anyhow::{Context, Result};
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::step_3_lstm_model_arch::{LotkaVolterraLstm, LotkaVolterraLstmConfig};
use crate::built_info;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub rustc_version: String,
    pub timestamp: u64,
    pub architecture: LotkaVolterraLstmConfig,
    pub sequence_length: usize,
    pub epoch: usize,
    pub val_loss: f64,
}

impl ModelMetadata {
    pub fn new(
        architecture: LotkaVolterraLstmConfig,
        sequence_length: usize,
        epoch: usize,
        val_loss: f64,
    ) -> Self {
        Self {
            version: built_info::PKG_VERSION.to_string(),
            rustc_version: built_info::RUSTC_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            architecture,
            sequence_length,
            epoch,
            val_loss,
        }
    }
}

/// Save the model record to `<path>.bin` and its metadata to `<path>.meta.json`
pub fn save_model_with_metadata<B: Backend>(
    model: &LotkaVolterraLstm<B>,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).context("Failed to create model parent directory")?;
    }
    let model_path = path.as_ref().with_extension("bin");
    model
        .clone()
        .save_file::<BinFileRecorder<FullPrecisionSettings>, _>(&model_path, &Default::default())
        .context("Failed to save model")?;
    let metadata_path = path.as_ref().with_extension("meta.json");
    let metadata_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(&metadata_path, metadata_json).context("Failed to write metadata file")?;
    Ok(())
}

/// Read only the metadata sidecar
pub fn load_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    let metadata_path = path.as_ref().with_extension("meta.json");
    let metadata_json =
        std::fs::read_to_string(&metadata_path).context("Failed to read metadata file")?;
    serde_json::from_str(&metadata_json).context("Failed to parse metadata")
}

/// Load a model saved by [`save_model_with_metadata`]
///
/// The architecture recorded in the metadata decides the shape of the module
/// the record is loaded into.
pub fn load_model_with_metadata<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(LotkaVolterraLstm<B>, ModelMetadata)> {
    let metadata = load_metadata(&path)?;
    let model_path = path.as_ref().with_extension("bin");
    let model = metadata
        .architecture
        .init::<B>(device)
        .load_file::<BinFileRecorder<FullPrecisionSettings>, _>(
            &model_path,
            &Default::default(),
            device,
        )
        .context("Failed to load model")?;
    Ok((model, metadata))
}

/// Check if a model file exists and is valid
pub fn verify_model(path: impl AsRef<Path>) -> Result<bool> {
    let model_path = path.as_ref().with_extension("bin");
    let metadata_path = path.as_ref().with_extension("meta.json");

    if !model_path.exists() || !metadata_path.exists() {
        return Ok(false);
    }
    load_metadata(path)?;
    Ok(true)
}

/// Keeps the snapshot with the lowest validation loss on disk
///
/// A snapshot is written only when the loss strictly improves on the best one
/// seen so far, so a later, worse epoch never replaces a better file.
#[derive(Debug, Clone)]
pub struct BestModelCheckpoint {
    path: PathBuf,
    sequence_length: usize,
    best: Option<(usize, f64)>,
}

impl BestModelCheckpoint {
    pub fn new(path: impl Into<PathBuf>, sequence_length: usize) -> Self {
        Self {
            path: path.into(),
            sequence_length,
            best: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `(epoch, val_loss)` of the saved snapshot
    pub fn best(&self) -> Option<(usize, f64)> {
        self.best
    }

    /// Save `model` if `val_loss` beats the best so far; returns whether it did
    pub fn observe<B: Backend>(
        &mut self,
        model: &LotkaVolterraLstm<B>,
        architecture: &LotkaVolterraLstmConfig,
        epoch: usize,
        val_loss: f64,
    ) -> Result<bool> {
        let improved = match self.best {
            Some((_, best_loss)) => val_loss < best_loss,
            None => val_loss.is_finite(),
        };
        if !improved {
            return Ok(false);
        }

        let metadata =
            ModelMetadata::new(architecture.clone(), self.sequence_length, epoch, val_loss);
        save_model_with_metadata(model, &metadata, &self.path)?;
        info!(
            "Epoch {}: val_loss improved to {:.6}, saved model to {}",
            epoch,
            val_loss,
            self.path.display()
        );
        self.best = Some((epoch, val_loss));
        Ok(true)
    }
}
