// External imports
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::Array2;

// Internal imports
use super::step_1_tensor_preparation::{DatasetSplit, StateVector};
use super::step_3_lstm_model_arch::LotkaVolterraLstm;
use crate::constants::STATE_DIM;
use crate::error::DatasetError;

fn history_tensor<B: Backend>(history: &[StateVector], device: &B::Device) -> Tensor<B, 3> {
    let values: Vec<f32> = history
        .iter()
        .flat_map(|state| state.iter().map(|v| *v as f32))
        .collect();
    Tensor::<B, 3>::from_data(TensorData::new(values, [1, history.len(), STATE_DIM]), device)
}

fn to_state(values: &[f32]) -> StateVector {
    [values[0] as f64, values[1] as f64]
}

/// Model outputs for every sample of a split, `[samples, output_size]`
pub fn predict<B: Backend>(
    model: &LotkaVolterraLstm<B>,
    split: &DatasetSplit,
    device: &B::Device,
) -> Array2<f32> {
    let output_size = model.output_size();
    if split.is_empty() {
        return Array2::zeros((0, output_size));
    }
    let (features, _) = split.to_tensors::<B>(device);
    let values: Vec<f32> = model.forward(features).into_data().iter::<f32>().collect();
    Array2::from_shape_fn((split.len(), output_size), |(i, j)| {
        values[i * output_size + j]
    })
}

/// Predict the state `shift` steps after the end of `history`
///
/// Only the last `sequence_length` states of `history` are used.
pub fn forecast_next_state<B: Backend>(
    model: &LotkaVolterraLstm<B>,
    history: &[StateVector],
    sequence_length: usize,
    device: &B::Device,
) -> Result<StateVector, DatasetError> {
    if sequence_length == 0 {
        return Err(DatasetError::Configuration(
            "sequence_length must be a positive integer".to_string(),
        ));
    }
    if history.len() < sequence_length {
        return Err(DatasetError::InsufficientData {
            len: history.len(),
            required: sequence_length,
        });
    }
    let window = &history[history.len() - sequence_length..];
    let output: Vec<f32> = model
        .forward(history_tensor::<B>(window, device))
        .into_data()
        .iter::<f32>()
        .collect();
    if output.len() < STATE_DIM {
        return Err(DatasetError::Configuration(format!(
            "model produces {} outputs, a state needs {}",
            output.len(),
            STATE_DIM
        )));
    }
    Ok(to_state(&output))
}

/// Roll the model forward `steps` times, feeding each prediction back in
///
/// Each prediction lands `shift` steps ahead of its window; the rollout treats
/// it as the next state, which matches the trajectory only when `shift` is 1.
pub fn forecast_trajectory<B: Backend>(
    model: &LotkaVolterraLstm<B>,
    history: &[StateVector],
    sequence_length: usize,
    steps: usize,
    device: &B::Device,
) -> Result<Vec<StateVector>, DatasetError> {
    let mut window = history[history.len().saturating_sub(sequence_length)..].to_vec();
    let mut forecast = Vec::with_capacity(steps);
    for _ in 0..steps {
        let next = forecast_next_state(model, &window, sequence_length, device)?;
        forecast.push(next);
        window.remove(0);
        window.push(next);
    }
    Ok(forecast)
}
