// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

/// Nonlinearity applied to the candidate cell state and the cell output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellActivation {
    #[default]
    Relu,
    Tanh,
}

impl CellActivation {
    fn apply<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            CellActivation::Relu => activation::relu(x),
            CellActivation::Tanh => activation::tanh(x),
        }
    }

    /// Modules hold the activation as a plain flag
    fn from_flag(uses_relu: bool) -> Self {
        if uses_relu {
            CellActivation::Relu
        } else {
            CellActivation::Tanh
        }
    }
}

/// Single-layer LSTM over `[batch_size, sequence_length, input_size]` sequences
#[derive(Module, Debug)]
pub struct LSTM<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    uses_relu: bool,

    // Input projections
    input_gate: Linear<B>,
    forget_gate: Linear<B>,
    cell_gate: Linear<B>,
    output_gate: Linear<B>,

    // Recurrent connections
    input_recurrent: Linear<B>,
    forget_recurrent: Linear<B>,
    cell_recurrent: Linear<B>,
    output_recurrent: Linear<B>,
}

impl<B: Backend> LSTM<B> {
    /// Create a new LSTM layer
    ///
    /// # Arguments
    ///
    /// * `input_size` - Number of features per time step
    /// * `hidden_size` - Size of hidden state
    /// * `activation` - Nonlinearity for the candidate and output paths
    /// * `device` - Device to place tensors on
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        activation: CellActivation,
        device: &B::Device,
    ) -> Self {
        let input_projection = || LinearConfig::new(input_size, hidden_size).init(device);
        // Bias lives on the input projections only
        let recurrent_projection = || {
            LinearConfig::new(hidden_size, hidden_size)
                .with_bias(false)
                .init(device)
        };

        Self {
            input_size,
            hidden_size,
            uses_relu: activation == CellActivation::Relu,
            input_gate: input_projection(),
            forget_gate: input_projection(),
            cell_gate: input_projection(),
            output_gate: input_projection(),
            input_recurrent: recurrent_projection(),
            forget_recurrent: recurrent_projection(),
            cell_recurrent: recurrent_projection(),
            output_recurrent: recurrent_projection(),
        }
    }

    /// Forward pass through the LSTM layer
    ///
    /// Returns the hidden state at every time step,
    /// `[batch_size, sequence_length, hidden_size]`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let device = x.device();
        let [batch_size, sequence_length, _] = x.dims();
        let nonlinearity = self.activation();

        let mut h = Tensor::zeros([batch_size, self.hidden_size], &device);
        let mut c = Tensor::zeros([batch_size, self.hidden_size], &device);
        let mut outputs = Vec::with_capacity(sequence_length);

        for t in 0..sequence_length {
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            let i_t = activation::sigmoid(
                self.input_gate.forward(x_t.clone()) + self.input_recurrent.forward(h.clone()),
            );
            let f_t = activation::sigmoid(
                self.forget_gate.forward(x_t.clone()) + self.forget_recurrent.forward(h.clone()),
            );
            let g_t = nonlinearity.apply(
                self.cell_gate.forward(x_t.clone()) + self.cell_recurrent.forward(h.clone()),
            );
            let o_t = activation::sigmoid(
                self.output_gate.forward(x_t) + self.output_recurrent.forward(h.clone()),
            );

            c = f_t * c + i_t * g_t;
            h = o_t * nonlinearity.apply(c.clone());

            outputs.push(h.clone().reshape([batch_size, 1, self.hidden_size]));
        }

        Tensor::cat(outputs, 1)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn activation(&self) -> CellActivation {
        CellActivation::from_flag(self.uses_relu)
    }
}
