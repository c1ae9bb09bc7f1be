//! Per-request handles over the schema: one entity instance, or one array member of it.

use crate::config::{Entity, Include, IncludeEntry, Member, Registry, ID_KEY};
use crate::error::ApiError;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Optional minus sign, then decimal digits. No whitespace, no `+`.
const INTEGER_PATTERN: &str = r"^-?[0-9]+$";

/// An entity type bound to a concrete identity. Every call goes to the store; nothing is cached.
#[derive(Clone, Debug)]
pub struct EntityObject {
    pub id: String,
    pub entity: Arc<Entity>,
}

impl EntityObject {
    pub fn new(id: impl Into<String>, entity: Arc<Entity>) -> Self {
        Self {
            id: id.into(),
            entity,
        }
    }

    pub async fn fetch(&self, include: &Include) -> Result<Value, ApiError> {
        self.entity.fetch(&self.id, include).await
    }

    /// Fetch a single member. The caller has already checked that `name` is a declared member.
    pub async fn fetch_one_member(&self, name: &str, include: Option<&Include>) -> Result<Value, ApiError> {
        let entry = match include {
            Some(inc) => IncludeEntry::Nested(inc.clone()),
            None => IncludeEntry::All,
        };
        let mut fetched = self.fetch(&Include::single(name, entry)).await?;
        Ok(fetched
            .as_object_mut()
            .and_then(|m| m.remove(name))
            .unwrap_or(Value::Null))
    }

    /// Unvalidated: the body is handed to the mutate hook as is.
    pub async fn mutate(&self, body: Value) -> Result<Value, ApiError> {
        self.entity.mutate(&self.id, body).await
    }

    pub async fn delete(&self) -> Result<Value, ApiError> {
        self.entity.delete(&self.id).await
    }
}

/// The `id` of a projected object, as a string.
pub(crate) fn identity_of(value: &Value) -> Option<String> {
    match value.get(ID_KEY)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One array-typed member of an owning [`EntityObject`].
#[derive(Clone, Debug)]
pub struct ArrayObject {
    pub member_name: String,
    pub owner: EntityObject,
    /// Set iff the array's elements are references.
    pub element_entity: Option<Arc<Entity>>,
}

impl ArrayObject {
    pub fn new(member_name: &str, owner: EntityObject, registry: &Registry) -> Result<Self, ApiError> {
        let element_entity = match owner.entity.member(member_name) {
            Some(Member::Array { element }) => match element.as_ref() {
                Member::Reference { type_name } => Some(registry.require(type_name)?),
                _ => None,
            },
            _ => return Err(ApiError::member_or_method_not_found(owner.entity.name.as_str(), member_name)),
        };
        Ok(Self {
            member_name: member_name.to_string(),
            owner,
            element_entity,
        })
    }

    pub async fn fetch(&self, element_include: Option<&Include>) -> Result<Value, ApiError> {
        self.owner.fetch_one_member(&self.member_name, element_include).await
    }

    /// Resolve a position to the element's id against a fresh id-only fetch.
    pub async fn get_id_by_index(&self, index: &str) -> Result<String, ApiError> {
        let position = Self::parse_index(index)?;
        let ids = self.fetch(Some(&Include::id_only())).await?;
        position
            .and_then(|i| ids.as_array()?.get(i))
            .and_then(identity_of)
            .ok_or_else(|| self.index_not_found(index))
    }

    /// Element value at a position, for arrays of primitives.
    pub async fn get_by_index(&self, index: &str) -> Result<Value, ApiError> {
        let position = Self::parse_index(index)?;
        let mut values = self.fetch(None).await?;
        position
            .and_then(|i| values.as_array_mut()?.get_mut(i).map(Value::take))
            .ok_or_else(|| self.index_not_found(index))
    }

    /// Parse an integer index. `None` means an integer that can never address an
    /// element (negative, or beyond `usize`).
    pub fn parse_index(index: &str) -> Result<Option<usize>, ApiError> {
        let integer = Regex::new(INTEGER_PATTERN).map_err(|e| ApiError::Internal(e.to_string()))?;
        if !integer.is_match(index) {
            return Err(ApiError::IndexIsNaN(index.to_string()));
        }
        Ok(index.parse::<usize>().ok())
    }

    fn index_not_found(&self, index: &str) -> ApiError {
        ApiError::member_or_method_not_found(
            format!("{}.{} array", self.owner.entity.name, self.member_name),
            index,
        )
    }
}
