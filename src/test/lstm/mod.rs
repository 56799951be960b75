pub mod test_tensor_preparation;
