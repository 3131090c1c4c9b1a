use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("tree-sitter language error")]
    Grammar,

    #[error("tree-sitter returned no tree")]
    Parse,

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
