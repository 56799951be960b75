// State vector layout
pub const STATE_FEATURES: [&str; 2] = ["predator", "prey"];
pub const STATE_DIM: usize = STATE_FEATURES.len();

// Window parameters
pub const SHIFT: usize = 1; // Forecast horizon in steps
pub const SEQUENCE_LENGTH: usize = 12; // Number of time steps to look back
pub const SAMPLE_SIZE: usize = 2000; // Cap on train + validation windows

// Data splits, expressed as numerator / denominator so the floors stay exact
pub const HEAD_SPLIT: (usize, usize) = (4, 5); // 80% of windows feed train/validation
pub const TRAIN_SPLIT: (usize, usize) = (4, 5); // 80% of the pool goes to train
pub const TEST_CAP_DIVISOR: usize = 3; // Test windows capped at sample_size / 3

// Model parameters
pub const HIDDEN_LSTM: usize = 6;
pub const DENSE_OUTPUT: usize = 2;
pub const EPOCHS: usize = 250;
pub const LEARNING_RATE: f64 = 0.001;
pub const BATCH_SIZE: usize = 32;
pub const SEED: u64 = 1;

// Paths
pub const DATA_PATH: &str = "./Data/lotka_volterra.bin";
pub const CONFIG_PATH: &str = "./lv_config.json";
pub const CHECKPOINT_PATH: &str = "./best_lv_lstm";
pub const EXPERIMENT_DIR: &str = "experiments";
