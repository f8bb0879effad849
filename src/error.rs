use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Failed to load {}: {reason}", join_inputs(.inputs))]
    LoadFailure { inputs: Vec<String>, reason: String },

    #[error("Failed to export {}: {reason}", .path.display())]
    ExportFailure { path: PathBuf, reason: String },

    #[error("Image error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl DiffError {
    pub fn load_failure(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailure {
            inputs: vec![input.into()],
            reason: reason.into(),
        }
    }

    pub fn export_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ExportFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

fn join_inputs(inputs: &[String]) -> String {
    inputs.join(", ")
}

pub type Result<T> = std::result::Result<T, DiffError>;
