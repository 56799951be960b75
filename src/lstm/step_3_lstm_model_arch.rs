// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_2_lstm_cell::{CellActivation, LSTM};

/// Recurrent regressor: one LSTM layer whose last hidden state feeds a dense
/// output layer
#[derive(Module, Debug)]
pub struct LotkaVolterraLstm<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    lstm: LSTM<B>,
    output: Linear<B>,
}

impl<B: Backend> LotkaVolterraLstm<B> {
    /// Create a new model
    ///
    /// # Arguments
    ///
    /// * `input_size` - Features per time step (the state dimensionality)
    /// * `hidden_size` - LSTM hidden units
    /// * `output_size` - Width of the dense output layer
    /// * `activation` - LSTM candidate/output nonlinearity
    /// * `device` - Device to place tensors on
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        activation: CellActivation,
        device: &B::Device,
    ) -> Self {
        let lstm = LSTM::new(input_size, hidden_size, activation, device);
        let output = LinearConfig::new(hidden_size, output_size).init(device);
        Self {
            input_size,
            hidden_size,
            output_size,
            lstm,
            output,
        }
    }

    /// Forward pass: `[batch_size, sequence_length, input_size]` to
    /// `[batch_size, output_size]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, sequence_length, _] = x.dims();
        let lstm_out = self.lstm.forward(x);

        let last_step = lstm_out
            .narrow(1, sequence_length - 1, 1)
            .reshape([batch_size, self.hidden_size]);

        self.output.forward(last_step)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn activation(&self) -> CellActivation {
        self.lstm.activation()
    }
}

/// Architecture description, also written to checkpoint metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotkaVolterraLstmConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub activation: CellActivation,
}

impl LotkaVolterraLstmConfig {
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        activation: CellActivation,
    ) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size,
            activation,
        }
    }

    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> LotkaVolterraLstm<B> {
        LotkaVolterraLstm::new(
            self.input_size,
            self.hidden_size,
            self.output_size,
            self.activation,
            device,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_model_creation() {
        let device = NdArrayDevice::default();
        let model: LotkaVolterraLstm<NdArray> =
            LotkaVolterraLstmConfig::new(2, 6, 2, CellActivation::Relu).init(&device);

        assert_eq!(model.input_size(), 2);
        assert_eq!(model.hidden_size(), 6);
        assert_eq!(model.output_size(), 2);
        assert_eq!(model.activation(), CellActivation::Relu);
        // Output layer dimensions [in_features, out_features]
        assert_eq!(model.output.weight.dims(), [6, 2]);
    }

    #[test]
    fn test_model_forward() {
        let device = NdArrayDevice::default();
        let model: LotkaVolterraLstm<NdArray> =
            LotkaVolterraLstm::new(2, 6, 2, CellActivation::Relu, &device);

        let input = Tensor::<NdArray, 3>::ones([5, 12, 2], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [5, 2]);
    }

    #[test]
    fn test_model_forward_single_step_sequence() {
        let device = NdArrayDevice::default();
        let model: LotkaVolterraLstm<NdArray> =
            LotkaVolterraLstm::new(2, 3, 2, CellActivation::Tanh, &device);

        let output = model.forward(Tensor::<NdArray, 3>::zeros([1, 1, 2], &device));
        assert_eq!(output.dims(), [1, 2]);
    }
}
