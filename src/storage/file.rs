use super::{KeyValueStore, StorageError};
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::PathBuf,
};

/// Keeps every key in its own `<key>.json` file inside `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn build_key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut file = match File::open(self.build_key_path(key)?) {
            Ok(file) => file,
            Err(err) => match err.kind() {
                std::io::ErrorKind::NotFound => return Ok(None),
                _ => return Err(err.into()),
            },
        };

        let mut value = String::new();
        file.read_to_string(&mut value)?;

        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.build_key_path(key)?;
        fs::create_dir_all(&self.root)?;

        let mut file = File::create(path)?;
        file.write_all(value.as_bytes())?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.build_key_path(key)?) {
            Ok(()) => Ok(()),
            Err(err) => match err.kind() {
                std::io::ErrorKind::NotFound => Ok(()),
                _ => Err(err.into()),
            },
        }
    }
}
