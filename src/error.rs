use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("NotFound: {0}")]
    NotFound(String),
    #[error("ValidationError: {0}")]
    Validation(String),
    #[error("PersistenceError: {0}")]
    Persistence(String),
}

impl StoreError {
    #[cfg(test)]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Persistence(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Persistence(error.to_string())
    }
}

impl From<libsql::Error> for StoreError {
    fn from(error: libsql::Error) -> Self {
        StoreError::Persistence(crate::unpack_error(&error))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
