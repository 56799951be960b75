use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::LotkaVolterraConfig;
use crate::lstm::step_4_train_model::TrainingHistory;

/// Summary of one training run, written as JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelExperiment {
    pub timestamp: String,
    pub config: LotkaVolterraConfig,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub test_samples: usize,
    pub best_epoch: Option<usize>,
    pub best_val_loss: Option<f64>,
    pub final_train_loss: Option<f64>,
    pub test_loss: Option<f64>,
    pub training_time_seconds: Option<f64>,
    pub notes: String,
}

impl ModelExperiment {
    pub fn new(
        config: &LotkaVolterraConfig,
        train_samples: usize,
        validation_samples: usize,
        test_samples: usize,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            config: config.clone(),
            train_samples,
            validation_samples,
            test_samples,
            best_epoch: None,
            best_val_loss: None,
            final_train_loss: None,
            test_loss: None,
            training_time_seconds: None,
            notes: String::new(),
        }
    }

    pub fn record_history(&mut self, history: &TrainingHistory) {
        if let Some(best) = history.best_epoch() {
            self.best_epoch = Some(best.epoch);
            self.best_val_loss = Some(best.val_loss);
        }
        self.final_train_loss = history.epochs.last().map(|r| r.train_loss);
    }

    pub fn set_test_loss(&mut self, loss: f64) {
        self.test_loss = Some(loss);
    }

    pub fn set_training_time(&mut self, seconds: f64) {
        self.training_time_seconds = Some(seconds);
    }

    pub fn add_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    pub fn save(&self, experiment_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(experiment_dir)?;

        let filename = format!(
            "lv_lstm_seq{}_shift{}_h{}_experiment.json",
            self.config.sequence_length, self.config.shift, self.config.hidden_lstm,
        );
        let file_path = experiment_dir.join(filename);

        let json = serde_json::to_string_pretty(&self)?;
        let mut file = fs::File::create(&file_path)?;
        file.write_all(json.as_bytes())?;

        Ok(file_path)
    }
}

/// `<root>/<YYYYmmdd_HHMMSS>`, created on disk
pub fn create_experiment_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(Local::now().format("%Y%m%d_%H%M%S").to_string());
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
