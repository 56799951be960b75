// External crates
use anyhow::Result;
use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use std::path::Path;
use std::time::Instant;

// Local crate
use lotka_volterra_lstm::config::LotkaVolterraConfig;
use lotka_volterra_lstm::constants::{CONFIG_PATH, EXPERIMENT_DIR};
use lotka_volterra_lstm::error::LotkaVolterraError;
use lotka_volterra_lstm::lstm::{step_1_tensor_preparation, step_4_train_model};
use lotka_volterra_lstm::util::model_logger::{create_experiment_dir, ModelExperiment};

type BurnBackend = Autodiff<NdArray<f32>>;

fn main() -> Result<()> {
    let config = LotkaVolterraConfig::load_or_default(CONFIG_PATH)?;
    println!(
        "Using data: {} | sequence_length: {} | shift: {} | sample_size: {}",
        config.data_path.display(),
        config.sequence_length,
        config.shift,
        config.sample_size
    );

    if let Err(e) = train_and_evaluate(&config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn train_and_evaluate(config: &LotkaVolterraConfig) -> Result<()> {
    config.validate()?;
    let device = NdArrayDevice::default();

    let dataset =
        step_1_tensor_preparation::load_dataset(&config.data_path, &config.dataset_config())
            .map_err(LotkaVolterraError::from)?;
    println!(
        "Windows: {} | train: {} | validation: {} | test: {}",
        dataset.total_windows,
        dataset.train.len(),
        dataset.validation.len(),
        dataset.test.len()
    );

    let mut experiment = ModelExperiment::new(
        config,
        dataset.train.len(),
        dataset.validation.len(),
        dataset.test.len(),
    );

    println!("Starting model training...");
    let started = Instant::now();
    let outcome = step_4_train_model::train_model::<BurnBackend>(
        &dataset,
        &config.training_config(),
        &device,
    )
    .map_err(LotkaVolterraError::from)?;
    experiment.set_training_time(started.elapsed().as_secs_f64());

    for record in &outcome.history.epochs {
        println!(
            "Epoch {}/{} - loss: {:.6} - val_loss: {:.6}{}",
            record.epoch,
            config.epochs,
            record.train_loss,
            record.val_loss,
            if record.improved { " (saved)" } else { "" }
        );
    }
    if let Some(best) = outcome.history.best_epoch() {
        println!(
            "Best val_loss {:.6} at epoch {}, checkpoint: {}",
            best.val_loss,
            best.epoch,
            outcome.checkpoint_path.display()
        );
    }
    println!("Test loss: {:.6}", outcome.test_loss);

    experiment.record_history(&outcome.history);
    experiment.set_test_loss(outcome.test_loss);
    let experiment_dir = create_experiment_dir(Path::new(EXPERIMENT_DIR))?;
    let record_path = experiment.save(&experiment_dir)?;
    println!("Experiment record saved to {}", record_path.display());

    Ok(())
}
