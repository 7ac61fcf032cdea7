//! Message registry
//!
//! Owns the in-memory mapping of order name to [`MessageType`] and writes
//! every mutation through the injected [`SchemaStore`].

mod store;

pub use store::*;

use parking_lot::RwLock;
use thiserror::Error;

use crate::protocol::{MessageType, ParameterDef, MAX_EXTENDED_ID, MAX_PAYLOAD};

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid id {0:?}: expected an integer between 0 and 0x1FFFFFFF")]
    InvalidId(String),

    #[error("Malformed parameter {0:?}: expected name:type")]
    MalformedParameter(String),

    #[error("Parameter {0} declared more than once")]
    DuplicateParameter(String),

    #[error("Order {0} not existent!")]
    NotFound(String),

    #[error("Order {name} declares {width} bytes of parameters (max: {max})")]
    SchemaTooWide {
        name: String,
        width: usize,
        max: usize,
    },

    #[error("Could not save orders: {0}")]
    Store(#[from] StoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result of a `list` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// No names requested: every registered order name
    Names(Vec<String>),
    /// Full schemas for the requested names, in request order
    Schemas(Vec<MessageType>),
}

/// Thread-safe schema registry
pub struct MessageRegistry {
    store: Box<dyn SchemaStore>,
    orders: RwLock<SchemaMap>,
}

impl MessageRegistry {
    /// Open a registry over `store`.
    ///
    /// A store that cannot be read starts the registry empty; the failure is
    /// logged, not returned. Stored orders wider than a frame are kept so they
    /// survive the next save; sending them fails in the codec.
    pub fn open(store: Box<dyn SchemaStore>) -> Self {
        let orders = match store.load() {
            Ok(orders) => {
                for schema in orders.values() {
                    if schema.payload_width() > MAX_PAYLOAD {
                        tracing::warn!(
                            "Stored order {} declares {} bytes of parameters and cannot be sent",
                            schema.name,
                            schema.payload_width()
                        );
                    }
                }
                tracing::info!("Loaded {} orders", orders.len());
                orders
            }
            Err(e) => {
                tracing::warn!("Could not load orders, starting empty: {}", e);
                SchemaMap::new()
            }
        };

        Self {
            store,
            orders: RwLock::new(orders),
        }
    }

    /// Register (or overwrite) an order and persist the full mapping.
    ///
    /// `params` are `name:type` tokens in payload order.
    pub fn add<S: AsRef<str>>(
        &self,
        name: &str,
        id: &str,
        params: &[S],
    ) -> RegistryResult<MessageType> {
        let id = parse_id(id)?;
        let parameters = params
            .iter()
            .map(|token| parse_parameter(token.as_ref()))
            .collect::<RegistryResult<Vec<_>>>()?;
        for (i, param) in parameters.iter().enumerate() {
            if parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(RegistryError::DuplicateParameter(param.name.clone()));
            }
        }

        let schema = MessageType::new(name, id, parameters);
        let width = schema.payload_width();
        if width > MAX_PAYLOAD {
            return Err(RegistryError::SchemaTooWide {
                name: name.to_string(),
                width,
                max: MAX_PAYLOAD,
            });
        }

        let mut orders = self.orders.write();
        let mut updated = orders.clone();
        updated.insert(name.to_string(), schema.clone());
        self.store.save(&updated)?;
        *orders = updated;

        tracing::debug!("Order {} registered", schema);
        Ok(schema)
    }

    pub fn lookup(&self, name: &str) -> RegistryResult<MessageType> {
        self.orders
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// First registered order using arbitration id `id`
    pub fn lookup_by_id(&self, id: u32) -> Option<MessageType> {
        self.orders.read().values().find(|s| s.id == id).cloned()
    }

    /// List orders.
    ///
    /// With no names, every registered name is returned. Otherwise the first
    /// unknown name fails the whole request.
    pub fn list<S: AsRef<str>>(&self, names: &[S]) -> RegistryResult<Listing> {
        let orders = self.orders.read();

        if names.is_empty() {
            return Ok(Listing::Names(orders.keys().cloned().collect()));
        }

        let mut schemas = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match orders.get(name) {
                Some(schema) => schemas.push(schema.clone()),
                None => return Err(RegistryError::NotFound(name.to_string())),
            }
        }
        Ok(Listing::Schemas(schemas))
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

fn parse_id(token: &str) -> RegistryResult<u32> {
    match token.parse::<u32>() {
        Ok(id) if id <= MAX_EXTENDED_ID => Ok(id),
        _ => Err(RegistryError::InvalidId(token.to_string())),
    }
}

fn parse_parameter(token: &str) -> RegistryResult<ParameterDef> {
    match token.split_once(':') {
        Some((name, kind)) if !name.is_empty() && !kind.contains(':') => {
            Ok(ParameterDef::from_token(name, kind))
        }
        _ => Err(RegistryError::MalformedParameter(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParameterType;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Store handle shared between the registry and the test
    struct Shared(Arc<MemoryStore>);

    impl SchemaStore for Shared {
        fn load(&self) -> StoreResult<SchemaMap> {
            self.0.load()
        }

        fn save(&self, schemas: &SchemaMap) -> StoreResult<()> {
            self.0.save(schemas)
        }
    }

    fn registry() -> (MessageRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (MessageRegistry::open(Box::new(Shared(store.clone()))), store)
    }

    #[test]
    fn test_add_then_lookup() {
        let (registry, store) = registry();
        registry
            .add("move", "10", &["destination:i32", "speed:i16", "acceleration:i16"])
            .unwrap();

        let schema = registry.lookup("move").unwrap();
        assert_eq!(schema.id, 10);
        assert_eq!(schema.parameters.len(), 3);
        assert_eq!(schema.parameters[1], ParameterDef::new("speed", ParameterType::Int16));
        assert_eq!(store.schemas.lock().get("move"), Some(&schema));
    }

    #[test]
    fn test_add_overwrites() {
        let (registry, _) = registry();
        registry.add("move", "10", &["a:i8"]).unwrap();
        registry.add("move", "12", &["b:i32"]).unwrap();

        let schema = registry.lookup("move").unwrap();
        assert_eq!(schema.id, 12);
        assert_eq!(schema.parameters, vec![ParameterDef::new("b", ParameterType::Int32)]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_invalid_id() {
        let (registry, _) = registry();
        for id in ["abc", "-1", "", "536870912"] {
            assert!(
                matches!(registry.add("x", id, &["a:i8"]), Err(RegistryError::InvalidId(_))),
                "{}",
                id
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_malformed_parameter() {
        let (registry, _) = registry();
        for token in ["speed", ":i16", "a:b:c"] {
            assert!(matches!(
                registry.add("x", "1", &[token]),
                Err(RegistryError::MalformedParameter(_))
            ));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_unknown_type_is_char() {
        let (registry, _) = registry();
        let schema = registry.add("x", "1", &["f:float"]).unwrap();
        assert_eq!(schema.parameters[0].kind, ParameterType::Char);
    }

    #[test]
    fn test_add_too_wide() {
        let (registry, _) = registry();
        let err = registry.add("x", "1", &["a:i32", "b:i32", "c:i8"]).unwrap_err();
        assert!(matches!(err, RegistryError::SchemaTooWide { width: 9, .. }));
        assert!(registry.lookup("x").is_err());
    }

    #[test]
    fn test_add_duplicate_parameter_name() {
        let (registry, store) = registry();
        let err = registry.add("dup", "3", &["a:i8", "a:i16"]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateParameter(n) if n == "a"));
        assert!(registry.lookup("dup").is_err());
        assert!(store.schemas.lock().is_empty());
    }

    #[test]
    fn test_wide_stored_order_survives_add() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("canorders.json");
        std::fs::write(
            &path,
            r#"{"wide": {"_id": 1, "parameters": {"a": "i32", "b": "i32", "c": "i8"}}}"#,
        )
        .unwrap();

        let registry = MessageRegistry::open(Box::new(JsonFileStore::new(&path)));
        assert_eq!(registry.lookup("wide").unwrap().payload_width(), 9);
        registry.add("other", "2", &["x:i8"]).unwrap();

        let reloaded = JsonFileStore::new(&path).load().unwrap();
        let names: Vec<_> = reloaded.keys().map(String::as_str).collect();
        assert_eq!(names, ["wide", "other"]);
        assert_eq!(reloaded["wide"].parameters.len(), 3);
    }

    #[test]
    fn test_unknown_type_survives_unrelated_add() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("canorders.json");
        std::fs::write(&path, r#"{"x": {"_id": 1, "parameters": {"f": "float"}}}"#).unwrap();

        let registry = MessageRegistry::open(Box::new(JsonFileStore::new(&path)));
        registry.add("other", "2", &["x:i8"]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["x"]["parameters"]["f"], "float");
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let (registry, store) = registry();
        registry.add("move", "10", &["a:i8"]).unwrap();

        store.fail_saves.store(true, Ordering::SeqCst);
        assert!(matches!(
            registry.add("move", "11", &["a:i8"]),
            Err(RegistryError::Store(_))
        ));
        assert_eq!(registry.lookup("move").unwrap().id, 10);
    }

    #[test]
    fn test_lookup_missing() {
        let (registry, _) = registry();
        assert!(matches!(registry.lookup("nope"), Err(RegistryError::NotFound(n)) if n == "nope"));
    }

    #[test]
    fn test_lookup_by_id() {
        let (registry, _) = registry();
        registry.add("move", "10", &["a:i8"]).unwrap();
        registry.add("stop", "11", Vec::<String>::new().as_slice()).unwrap();

        assert_eq!(registry.lookup_by_id(11).unwrap().name, "stop");
        assert!(registry.lookup_by_id(99).is_none());
    }

    #[test]
    fn test_list_all_names() {
        let (registry, _) = registry();
        registry.add("move", "10", &["a:i8"]).unwrap();
        registry.add("stop", "11", &["a:i8"]).unwrap();
        registry.add("move", "12", &["a:i8"]).unwrap();

        match registry.list::<&str>(&[]).unwrap() {
            Listing::Names(mut names) => {
                names.sort();
                assert_eq!(names, ["move", "stop"]);
            }
            other => panic!("unexpected listing: {:?}", other),
        }
    }

    #[test]
    fn test_list_named() {
        let (registry, _) = registry();
        registry.add("move", "10", &["a:i8"]).unwrap();
        registry.add("stop", "11", &["a:i8"]).unwrap();

        match registry.list(&["stop", "move"]).unwrap() {
            Listing::Schemas(schemas) => {
                let names: Vec<_> = schemas.iter().map(|s| s.name.as_str()).collect();
                assert_eq!(names, ["stop", "move"]);
            }
            other => panic!("unexpected listing: {:?}", other),
        }
    }

    #[test]
    fn test_list_fails_fast_on_missing() {
        let (registry, _) = registry();
        registry.add("move", "10", &["a:i8"]).unwrap();

        let err = registry.list(&["move", "missing", "other"]).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(n) if n == "missing"));
    }

    #[test]
    fn test_open_survives_failing_store() {
        struct Broken;
        impl SchemaStore for Broken {
            fn load(&self) -> StoreResult<SchemaMap> {
                Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "corrupt",
                )))
            }
            fn save(&self, _: &SchemaMap) -> StoreResult<()> {
                Ok(())
            }
        }

        let registry = MessageRegistry::open(Box::new(Broken));
        assert!(registry.is_empty());
        registry.add("move", "10", &["a:i8"]).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_add_and_lookup() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let name = format!("order{}_{}", t, i);
                        registry.add(&name, &i.to_string(), &["v:i16"]).unwrap();
                        assert_eq!(registry.lookup(&name).unwrap().id, i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 100);
    }
}
