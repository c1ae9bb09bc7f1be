//! In-process [`EntityStore`]: JSON documents per entity, references stored as ids.
//!
//! Used by the demo server and tests. Projection follows the [`Include`] recursively,
//! resolving references through the same store.

use crate::config::{Include, IncludeEntry, Member, SchemaConfig, ID_KEY};
use crate::error::{ApiError, ConfigError};
use crate::hooks::EntityStore;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::sync::RwLock;

/// Ids are addressed as raw path segments, which are matched without percent-decoding.
const CLIENT_ID_PATTERN: &str = r"^[A-Za-z0-9_.~-]+$";

type Document = Map<String, Value>;
type Tables = HashMap<String, HashMap<String, Document>>;

pub struct MemoryStore {
    schema: HashMap<String, BTreeMap<String, Member>>,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new(config: &SchemaConfig) -> Self {
        let schema = config
            .entities
            .iter()
            .map(|e| (e.name.clone(), e.members.clone()))
            .collect();
        let tables = config
            .entities
            .iter()
            .map(|e| (e.name.clone(), HashMap::new()))
            .collect();
        Self {
            schema,
            tables: RwLock::new(tables),
        }
    }

    /// Insert or replace one document. An `id` key in `doc` is ignored in favor of `id`.
    pub async fn insert(&self, entity: &str, id: &str, doc: Value) -> Result<(), ApiError> {
        let mut doc = match doc {
            Value::Object(m) => m,
            _ => return Err(ApiError::BadRequest(format!("{} {}: document must be an object", entity, id))),
        };
        doc.remove(ID_KEY);
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(entity)
            .ok_or_else(|| ApiError::InvalidEntityName(entity.to_string()))?;
        table.insert(id.to_string(), doc);
        Ok(())
    }

    /// Load `{ Entity: { id: object } }`.
    pub async fn seed(&self, data: Value) -> Result<usize, ApiError> {
        let entities = match data {
            Value::Object(m) => m,
            _ => return Err(ApiError::BadRequest("seed must be an object keyed by entity".into())),
        };
        let mut count = 0;
        for (entity, rows) in entities {
            let rows = match rows {
                Value::Object(m) => m,
                _ => return Err(ApiError::BadRequest(format!("seed for {} must be an object keyed by id", entity))),
            };
            for (id, doc) in rows {
                self.insert(&entity, &id, doc).await?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub async fn seed_from_path(&self, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let data: Value =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        self.seed(data)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
    }

    fn members(&self, entity: &str) -> Result<&BTreeMap<String, Member>, ApiError> {
        self.schema
            .get(entity)
            .ok_or_else(|| ApiError::InvalidEntityName(entity.to_string()))
    }

    fn project(&self, tables: &Tables, entity: &str, id: &str, include: &Include) -> Result<Value, ApiError> {
        let doc = tables
            .get(entity)
            .and_then(|t| t.get(id))
            .ok_or_else(|| ApiError::InvalidEntityId {
                id: id.to_string(),
                entity: entity.to_string(),
            })?;
        let members = self.members(entity)?;
        let mut out = Map::new();
        for (key, entry) in include.iter() {
            if key == ID_KEY {
                out.insert(key.clone(), Value::String(id.to_string()));
                continue;
            }
            let member = members
                .get(key)
                .ok_or_else(|| ApiError::member_or_method_not_found(entity, key.as_str()))?;
            let raw = doc.get(key).unwrap_or(&Value::Null);
            out.insert(key.clone(), self.project_member(tables, member, raw, entry)?);
        }
        Ok(Value::Object(out))
    }

    fn project_member(
        &self,
        tables: &Tables,
        member: &Member,
        raw: &Value,
        entry: &IncludeEntry,
    ) -> Result<Value, ApiError> {
        match member {
            Member::Primitive { .. } => Ok(raw.clone()),
            Member::Reference { type_name } => {
                let Some(id) = reference_id(raw) else {
                    return Ok(Value::Null);
                };
                match entry {
                    IncludeEntry::All => Ok(serde_json::json!({ ID_KEY: id })),
                    IncludeEntry::Nested(inc) => self.project(tables, type_name, &id, inc),
                }
            }
            Member::Array { element } => match raw {
                Value::Array(items) => items
                    .iter()
                    .map(|v| self.project_member(tables, element, v, entry))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Value::Null => Ok(Value::Array(Vec::new())),
                other => Ok(other.clone()),
            },
        }
    }

    fn check_keys(&self, entity: &str, body: &Document) -> Result<bool, ApiError> {
        let members = self.members(entity)?;
        Ok(body.keys().all(|k| k == ID_KEY || members.contains_key(k)))
    }
}

/// References are stored as ids; `{ "id": ... }` objects and numeric ids are accepted too.
fn reference_id(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(m) => m.get(ID_KEY).and_then(reference_id),
        _ => None,
    }
}

fn with_id(id: &str, mut doc: Document) -> Value {
    doc.insert(ID_KEY.to_string(), Value::String(id.to_string()));
    Value::Object(doc)
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(&self, entity: &str, id: &str, include: &Include) -> Result<Value, ApiError> {
        let tables = self.tables.read().await;
        self.project(&tables, entity, id, include)
    }

    async fn create(&self, entity: &str, body: Value) -> Result<Value, ApiError> {
        let Value::Object(mut doc) = body else {
            return Err(ApiError::InvalidCreatorArguments);
        };
        if !self.check_keys(entity, &doc)? {
            return Err(ApiError::InvalidCreatorArguments);
        }
        let id = match doc.remove(ID_KEY) {
            Some(raw) => {
                let id = reference_id(&raw).ok_or(ApiError::InvalidCreatorArguments)?;
                let safe = Regex::new(CLIENT_ID_PATTERN).map_err(|e| ApiError::Internal(e.to_string()))?;
                if !safe.is_match(&id) {
                    return Err(ApiError::InvalidCreatorArguments);
                }
                id
            }
            None => uuid::Uuid::new_v4().to_string(),
        };
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(entity)
            .ok_or_else(|| ApiError::InvalidEntityName(entity.to_string()))?;
        if table.contains_key(&id) {
            return Err(ApiError::InvalidCreatorArguments);
        }
        table.insert(id.clone(), doc.clone());
        tracing::debug!(entity = %entity, id = %id, "created");
        Ok(with_id(&id, doc))
    }

    async fn mutate(&self, entity: &str, id: &str, body: Value) -> Result<Value, ApiError> {
        let Value::Object(mut patch) = body else {
            return Err(ApiError::InvalidMutatorArguments);
        };
        if !self.check_keys(entity, &patch)? {
            return Err(ApiError::InvalidMutatorArguments);
        }
        patch.remove(ID_KEY);
        let mut tables = self.tables.write().await;
        let doc = tables
            .get_mut(entity)
            .and_then(|t| t.get_mut(id))
            .ok_or_else(|| ApiError::InvalidEntityId {
                id: id.to_string(),
                entity: entity.to_string(),
            })?;
        doc.extend(patch);
        tracing::debug!(entity = %entity, id = %id, "mutated");
        Ok(with_id(id, doc.clone()))
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<Value, ApiError> {
        let mut tables = self.tables.write().await;
        let doc = tables
            .get_mut(entity)
            .and_then(|t| t.remove(id))
            .ok_or_else(|| ApiError::InvalidEntityId {
                id: id.to_string(),
                entity: entity.to_string(),
            })?;
        tracing::debug!(entity = %entity, id = %id, "deleted");
        Ok(with_id(id, doc))
    }
}
