use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("corrupt store: {0}")]
    CorruptStore(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("record ids exhausted: {0}")]
    IdsExhausted(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}
