/// Test modules for the forecasting pipeline
///
/// * `lstm` - Property tests for window construction and split partitioning
/// * `trajectory_io_tests` - Tests for the bincode and CSV trajectory readers
pub mod lstm;
