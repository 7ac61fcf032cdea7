//! Schema persistence
//!
//! The registry only talks to storage through [`SchemaStore`]. The JSON
//! adapter keeps the established on-disk format:
//!
//! ```json
//! { "move": { "_id": 10, "parameters": { "destination": "i32", "speed": "i16" } } }
//! ```
//!
//! Parameter order inside `parameters` is the payload layout, so the file is
//! always read into an insertion-ordered map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::protocol::{MessageType, ParameterDef};

/// Ordered mapping of order name to schema
pub type SchemaMap = IndexMap<String, MessageType>;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for the schema registry
pub trait SchemaStore: Send + Sync {
    /// Load every stored schema. A store that does not exist yet is empty.
    fn load(&self) -> StoreResult<SchemaMap>;

    /// Replace the stored schemas with `schemas`
    fn save(&self, schemas: &SchemaMap) -> StoreResult<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredOrder {
    #[serde(rename = "_id")]
    id: u32,
    #[serde(default)]
    parameters: IndexMap<String, String>,
}

impl StoredOrder {
    fn from_schema(schema: &MessageType) -> Self {
        Self {
            id: schema.id,
            parameters: schema
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.token().to_string()))
                .collect(),
        }
    }

    fn into_schema(self, name: String) -> MessageType {
        let parameters = self
            .parameters
            .into_iter()
            .map(|(pname, token)| ParameterDef::from_token(pname, &token))
            .collect();
        MessageType::new(name, self.id, parameters)
    }
}

/// JSON file backed store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(contents: &str) -> StoreResult<SchemaMap> {
        let stored: IndexMap<String, StoredOrder> = serde_json::from_str(contents)?;
        Ok(stored
            .into_iter()
            .map(|(name, order)| (name.clone(), order.into_schema(name)))
            .collect())
    }

    fn render(schemas: &SchemaMap) -> StoreResult<String> {
        let stored: IndexMap<&str, StoredOrder> = schemas
            .iter()
            .map(|(name, schema)| (name.as_str(), StoredOrder::from_schema(schema)))
            .collect();
        Ok(serde_json::to_string_pretty(&stored)?)
    }
}

impl SchemaStore for JsonFileStore {
    fn load(&self) -> StoreResult<SchemaMap> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SchemaMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, schemas: &SchemaMap) -> StoreResult<()> {
        let contents = Self::render(schemas)?;

        // Write beside the target so the final rename stays on one filesystem
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        tracing::debug!("Saved {} orders to {}", schemas.len(), self.path.display());
        Ok(())
    }
}

/// In-memory store used by tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    pub schemas: parking_lot::Mutex<SchemaMap>,
    pub fail_saves: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl SchemaStore for MemoryStore {
    fn load(&self) -> StoreResult<SchemaMap> {
        Ok(self.schemas.lock().clone())
    }

    fn save(&self, schemas: &SchemaMap) -> StoreResult<()> {
        if self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only store",
            )));
        }
        *self.schemas.lock() = schemas.clone();
        Ok(())
    }
}
