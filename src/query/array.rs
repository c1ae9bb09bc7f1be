use super::{EntityObjectQueryHandler, QueryHandler, Step};
use crate::config::Registry;
use crate::error::ApiError;
use crate::object::{ArrayObject, EntityObject};
use crate::response::ApiResult;
use async_trait::async_trait;
use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;

/// Resolves an index segment against an array member.
pub struct ArrayQueryHandler {
    array: ArrayObject,
    registry: Arc<Registry>,
}

impl ArrayQueryHandler {
    pub fn new(array: ArrayObject, registry: Arc<Registry>) -> Self {
        Self { array, registry }
    }
}

#[async_trait]
impl QueryHandler for ArrayQueryHandler {
    async fn step<'p>(
        self: Box<Self>,
        path: &'p [String],
        verb: &Method,
        _body: &Value,
    ) -> Result<Step<'p>, ApiError> {
        let rest = path.get(1..).unwrap_or_default();
        let array = &self.array;
        tracing::debug!(
            entity = %array.owner.entity.name,
            id = %array.owner.id,
            member = %array.member_name,
            index = ?rest.first(),
            verb = %verb,
            "array step"
        );

        let Some(index) = rest.first() else {
            if verb != Method::GET {
                return Err(ApiError::InvalidRequestPath);
            }
            let include = array.element_entity.as_ref().map(|e| &e.default_include);
            return Ok(Step::Done(ApiResult::value(array.fetch(include).await?)));
        };

        match &array.element_entity {
            Some(element) => {
                let id = array.get_id_by_index(index).await?;
                let next = EntityObjectQueryHandler::new(EntityObject::new(id, element.clone()), self.registry.clone());
                Ok(Step::Continue(Box::new(next), rest))
            }
            None => {
                if rest.len() > 1 {
                    return Err(ApiError::InvalidRequestPath);
                }
                if verb != Method::GET {
                    return Err(ApiError::method_not_allowed());
                }
                Ok(Step::Done(ApiResult::value(array.get_by_index(index).await?)))
            }
        }
    }
}
