use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::WeekSchedule;
use crate::validate::{ValidationError, validate_schedule};

pub const SCHEDULE_KEY: &str = "schedule";
pub const TODOS_KEY: &str = "todos";
pub const MEMOS_KEY: &str = "memos";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to save invalid {key}: {source}")]
    Invalid {
        key: String,
        #[source]
        source: ValidationError,
    },
}

/// A durable medium holding one text value per key.
pub trait KeyValueStore {
    /// `Ok(None)` when the key has never been written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;
        let target = self.path(key);
        let staging = self.root.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value).map_err(io_error(&staging))?;
        fs::rename(&staging, &target).map_err(io_error(&target))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + use<> {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

/// How a loaded value came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Stored,
    /// Nothing stored yet; the default is in use.
    Missing,
    /// The stored text was unusable and the default was written over it.
    Recovered { reason: String },
    /// The medium could not be read; the default is in use for this session.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub status: LoadStatus,
}

/// Loads a plain value. Typed deserialization doubles as the shape check.
pub fn load_value<T, S>(store: &mut S, key: &str, default: impl FnOnce() -> T) -> Loaded<T>
where
    T: Serialize + DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    load_with(store, key, default, |raw| {
        serde_json::from_str(raw).map_err(|err| err.to_string())
    })
}

/// Loads the schedule through the validator.
pub fn load_schedule<S>(store: &mut S, default: impl FnOnce() -> WeekSchedule) -> Loaded<WeekSchedule>
where
    S: KeyValueStore + ?Sized,
{
    load_with(store, SCHEDULE_KEY, default, |raw| {
        let candidate: serde_json::Value =
            serde_json::from_str(raw).map_err(|err| err.to_string())?;
        validate_schedule(&candidate).map_err(|err| err.to_string())
    })
}

pub fn save_value<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.write(key, &encoded)
}

/// Validates the schedule before it reaches the medium.
pub fn save_schedule<S>(store: &mut S, schedule: &WeekSchedule) -> Result<(), StorageError>
where
    S: KeyValueStore + ?Sized,
{
    let encode_error = |source| StorageError::Encode {
        key: SCHEDULE_KEY.to_string(),
        source,
    };
    let candidate = serde_json::to_value(schedule).map_err(encode_error)?;
    validate_schedule(&candidate).map_err(|source| StorageError::Invalid {
        key: SCHEDULE_KEY.to_string(),
        source,
    })?;
    let encoded = serde_json::to_string(&candidate).map_err(encode_error)?;
    store.write(SCHEDULE_KEY, &encoded)
}

fn load_with<T, S>(
    store: &mut S,
    key: &str,
    default: impl FnOnce() -> T,
    decode: impl FnOnce(&str) -> Result<T, String>,
) -> Loaded<T>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "nothing stored yet, using default");
            return Loaded {
                value: default(),
                status: LoadStatus::Missing,
            };
        }
        Err(err) => {
            warn!(key, error = %err, "store unavailable, using default for this session");
            return Loaded {
                value: default(),
                status: LoadStatus::Unavailable {
                    reason: err.to_string(),
                },
            };
        }
    };

    match decode(&raw) {
        Ok(value) => Loaded {
            value,
            status: LoadStatus::Stored,
        },
        Err(reason) => {
            warn!(key, %reason, "stored value is unusable, resetting to default");
            let value = default();
            if let Err(err) = save_value(store, key, &value) {
                warn!(key, error = %err, "failed to write default back");
            }
            Loaded {
                value,
                status: LoadStatus::Recovered { reason },
            }
        }
    }
}
