pub mod learning_paths;
