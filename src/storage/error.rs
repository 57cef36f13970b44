#[derive(Debug)]
pub enum StorageError {
    QuotaExceeded { key: String },
    InvalidKey(String),
    InvalidData(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::QuotaExceeded { key } => write!(f, "storage quota exceeded: key={key}"),
            StorageError::InvalidKey(key) => write!(f, "invalid storage key: key={key}"),
            StorageError::InvalidData(reason) => write!(f, "invalid data format: {reason}"),
            StorageError::Io(error) => write!(f, "storage io error: {error}"),
            StorageError::Json(error) => write!(f, "storage serialization error: {error}"),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Json(err)
    }
}
