pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
pub mod config;
pub mod constants;
pub mod error;
pub mod lstm {
    pub mod step_1_tensor_preparation;
    pub mod step_2_lstm_cell;
    pub mod step_3_lstm_model_arch;
    pub mod step_4_train_model;
    pub mod step_5_prediction;
    pub mod step_6_model_serialization;
}
#[cfg(test)]
pub mod test;
pub mod util {
    pub mod model_logger;
    #[cfg(test)]
    pub mod test_utils;
    pub mod trajectory_io;
}
