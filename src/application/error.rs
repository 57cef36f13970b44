use crate::storage::StorageError;

#[derive(Debug)]
pub enum Error {
    NoEpisodeDetected,
    NoPreviousEpisode,
    NothingToRestore,
    Storage(StorageError),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let as_string = match self {
            Error::NoEpisodeDetected => "No episode detected for the current stream".to_string(),
            Error::NoPreviousEpisode => "Already at the first episode".to_string(),
            Error::NothingToRestore => "No recent session to resume".to_string(),
            Error::Storage(error) => {
                format!("Storage error: {error}")
            }
        };

        write!(f, "{}", as_string)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}
