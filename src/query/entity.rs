use super::{ArrayQueryHandler, QueryHandler, Step};
use crate::config::{Include, IncludeEntry, Member, Registry};
use crate::error::ApiError;
use crate::object::{identity_of, ArrayObject, EntityObject};
use crate::response::ApiResult;
use async_trait::async_trait;
use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;

/// Resolves paths against one entity instance: CRUD on itself, method calls,
/// primitive members, and descent into array or reference members.
pub struct EntityObjectQueryHandler {
    object: EntityObject,
    registry: Arc<Registry>,
}

impl EntityObjectQueryHandler {
    pub fn new(object: EntityObject, registry: Arc<Registry>) -> Self {
        Self { object, registry }
    }

    async fn on_self(&self, verb: &Method, body: &Value) -> Result<ApiResult, ApiError> {
        let object = &self.object;
        let payload = if verb == Method::GET {
            object.fetch(&object.entity.default_include).await?
        } else if verb == Method::POST {
            object.mutate(body.clone()).await?
        } else if verb == Method::DELETE {
            object.delete().await?
        } else {
            return Err(ApiError::InvalidRequestPath);
        };
        Ok(ApiResult::ok(payload))
    }

    async fn on_primitive(
        &self,
        name: &str,
        is_variable: bool,
        verb: &Method,
        body: &Value,
    ) -> Result<ApiResult, ApiError> {
        let object = &self.object;
        if verb == Method::GET {
            Ok(ApiResult::value(object.fetch_one_member(name, None).await?))
        } else if verb == Method::POST {
            if !is_variable {
                return Err(ApiError::TryingToVariateNotVariableMember {
                    entity: object.entity.name.clone(),
                    member: name.to_string(),
                });
            }
            object.entity.mutate(&object.id, body.clone()).await?;
            Ok(ApiResult::default())
        } else {
            Err(ApiError::method_not_allowed())
        }
    }

    /// Id of the instance a reference member currently points at.
    async fn referenced_id(&self, name: &str) -> Result<String, ApiError> {
        let include = Include::single(name, IncludeEntry::Nested(Include::id_only()));
        let fetched = self.object.fetch(&include).await?;
        fetched
            .get(name)
            .and_then(identity_of)
            .ok_or_else(|| ApiError::NotFound(format!("{}.{} is empty", self.object.entity.name, name)))
    }
}

#[async_trait]
impl QueryHandler for EntityObjectQueryHandler {
    async fn step<'p>(
        self: Box<Self>,
        path: &'p [String],
        verb: &Method,
        body: &Value,
    ) -> Result<Step<'p>, ApiError> {
        let rest = path.get(1..).unwrap_or_default();
        let entity = &self.object.entity;
        tracing::debug!(
            entity = %entity.name,
            id = %self.object.id,
            segment = ?rest.first(),
            verb = %verb,
            "entity step"
        );

        let Some(segment) = rest.first() else {
            return self.on_self(verb, body).await.map(Step::Done);
        };

        if let Some(method) = entity.method(segment) {
            if verb != Method::POST {
                return Err(ApiError::MethodNotAllowed(
                    "For methods calling only POST requests are being accepted.".into(),
                ));
            }
            let out = method.invoke(&self.object.id, body.clone()).await?;
            return Ok(Step::Done(ApiResult::ok(out)));
        }

        let member = entity
            .member(segment)
            .ok_or_else(|| ApiError::member_or_method_not_found(entity.name.as_str(), segment.as_str()))?;

        match member {
            Member::Array { .. } => {
                let array = ArrayObject::new(segment, self.object.clone(), &self.registry)?;
                let next = ArrayQueryHandler::new(array, self.registry.clone());
                Ok(Step::Continue(Box::new(next), rest))
            }
            Member::Primitive { is_variable, .. } => {
                if rest.len() > 1 {
                    return Err(ApiError::InvalidRequestPath);
                }
                self.on_primitive(segment, *is_variable, verb, body)
                    .await
                    .map(Step::Done)
            }
            Member::Reference { type_name } => {
                let target = self.registry.require(type_name)?;
                let id = self.referenced_id(segment).await?;
                let next = EntityObjectQueryHandler::new(EntityObject::new(id, target), self.registry.clone());
                Ok(Step::Continue(Box::new(next), rest))
            }
        }
    }
}
