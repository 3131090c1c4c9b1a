use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    /// The deployment embeds at a single fixed dimension; anything else
    /// indicates a misconfigured embedding model.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, VectorError>;
