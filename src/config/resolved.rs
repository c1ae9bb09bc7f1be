//! Resolved runtime model: validated schema with hooks bound, shared read-only across requests.

use crate::config::{Include, Member};
use crate::error::ApiError;
use crate::hooks::{EntityMethod, EntityStore};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Schema and CRUD hooks for one resource type.
pub struct Entity {
    pub name: String,
    pub members: BTreeMap<String, Member>,
    pub methods: HashMap<String, Arc<dyn EntityMethod>>,
    pub default_include: Include,
    store: Arc<dyn EntityStore>,
}

impl Entity {
    pub fn new(
        name: String,
        members: BTreeMap<String, Member>,
        methods: HashMap<String, Arc<dyn EntityMethod>>,
        default_include: Include,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            name,
            members,
            methods,
            default_include,
            store,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&Arc<dyn EntityMethod>> {
        self.methods.get(name)
    }

    pub async fn fetch(&self, id: &str, include: &Include) -> Result<Value, ApiError> {
        tracing::debug!(entity = %self.name, id = %id, "fetch");
        self.store.fetch(&self.name, id, include).await
    }

    pub async fn create(&self, body: Value) -> Result<Value, ApiError> {
        tracing::debug!(entity = %self.name, "create");
        self.store.create(&self.name, body).await
    }

    pub async fn mutate(&self, id: &str, body: Value) -> Result<Value, ApiError> {
        tracing::debug!(entity = %self.name, id = %id, "mutate");
        self.store.mutate(&self.name, id, body).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        tracing::debug!(entity = %self.name, id = %id, "delete");
        self.store.delete(&self.name, id).await
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("default_include", &self.default_include)
            .finish()
    }
}

/// Entity arena keyed by type name. Built once, never mutated.
#[derive(Debug, Default)]
pub struct Registry {
    entities: HashMap<String, Arc<Entity>>,
}

impl Registry {
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities
                .into_iter()
                .map(|e| (e.name.clone(), Arc::new(e)))
                .collect(),
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Arc<Entity>> {
        self.entities.get(name)
    }

    /// Like [`Registry::entity`] but fails with `InvalidEntityName`.
    pub fn require(&self, name: &str) -> Result<Arc<Entity>, ApiError> {
        self.entity(name)
            .cloned()
            .ok_or_else(|| ApiError::InvalidEntityName(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
