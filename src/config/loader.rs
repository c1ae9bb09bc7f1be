//! Build the runtime registry from a schema declaration, or load the declaration from disk.

use crate::config::resolved::{Entity, Registry};
use crate::config::types::SchemaConfig;
use crate::config::validate;
use crate::error::ConfigError;
use crate::hooks::{EntityMethod, EntityStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Method implementations keyed by `(entity name, method name)`.
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<(String, String), Arc<dyn EntityMethod>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, entity: &str, method: &str, imp: impl EntityMethod + 'static) -> Self {
        self.methods
            .insert((entity.to_string(), method.to_string()), Arc::new(imp));
        self
    }

    fn take(&mut self, entity: &str, method: &str) -> Option<Arc<dyn EntityMethod>> {
        self.methods.remove(&(entity.to_string(), method.to_string()))
    }
}

/// Validate `config` and bind every entity to `store` and its declared methods.
pub fn resolve(
    config: &SchemaConfig,
    store: Arc<dyn EntityStore>,
    mut methods: MethodTable,
) -> Result<Registry, ConfigError> {
    validate(config)?;

    let mut entities = Vec::with_capacity(config.entities.len());
    for e in &config.entities {
        let mut bound = HashMap::new();
        for name in &e.methods {
            let imp = methods.take(&e.name, name).ok_or_else(|| ConfigError::UnboundMethod {
                entity: e.name.clone(),
                method: name.clone(),
            })?;
            bound.insert(name.clone(), imp);
        }
        entities.push(Entity::new(
            e.name.clone(),
            e.members.clone(),
            bound,
            e.effective_default_include(),
            store.clone(),
        ));
    }

    for (entity, method) in methods.methods.keys() {
        tracing::warn!(entity = %entity, method = %method, "method bound but not declared; ignored");
    }

    let registry = Registry::new(entities);
    if registry.is_empty() {
        tracing::warn!("schema declares no entities; every request will fail");
    }
    tracing::info!(entities = registry.len(), "registry built");
    Ok(registry)
}

pub async fn load_schema(path: impl AsRef<Path>) -> Result<SchemaConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}
