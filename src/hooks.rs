//! Storage and method hooks injected into the schema.
//!
//! A single [`EntityStore`] may back many entities; every call names the entity it
//! acts on. Create, mutate and delete are optional: a store that does not override
//! them reports the matching "no ... function provided" error.

use crate::config::Include;
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Materialize one instance projected by `include`.
    async fn fetch(&self, entity: &str, id: &str, include: &Include) -> Result<Value, ApiError>;

    async fn create(&self, entity: &str, _body: Value) -> Result<Value, ApiError> {
        Err(ApiError::NoCreatorFunctionProvided(entity.to_string()))
    }

    async fn mutate(&self, entity: &str, _id: &str, _body: Value) -> Result<Value, ApiError> {
        Err(ApiError::NoMutatorFunctionProvided(entity.to_string()))
    }

    async fn delete(&self, entity: &str, _id: &str) -> Result<Value, ApiError> {
        Err(ApiError::NoDeleterFunctionProvided(entity.to_string()))
    }
}

/// A custom entity method, invoked with the instance id and the raw request body.
#[async_trait]
pub trait EntityMethod: Send + Sync {
    async fn invoke(&self, id: &str, body: Value) -> Result<Value, ApiError>;
}

/// Adapts an async closure `(id, body) -> Result<Value, ApiError>` into an [`EntityMethod`].
pub struct FnMethod<F>(pub F);

#[async_trait]
impl<F, Fut> EntityMethod for FnMethod<F>
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    async fn invoke(&self, id: &str, body: Value) -> Result<Value, ApiError> {
        (self.0)(id.to_string(), body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ReadOnly;

    #[async_trait]
    impl EntityStore for ReadOnly {
        async fn fetch(&self, _entity: &str, id: &str, _include: &Include) -> Result<Value, ApiError> {
            Ok(json!({ "id": id }))
        }
    }

    #[tokio::test]
    async fn missing_hooks_report_entity_name() {
        let store = ReadOnly;
        let err = store.mutate("Pet", "p1", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NoMutatorFunctionProvided(ref e) if e == "Pet"));
        let err = store.delete("Pet", "p1").await.unwrap_err();
        assert!(matches!(err, ApiError::NoDeleterFunctionProvided(_)));
        let err = store.create("Pet", json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::NoCreatorFunctionProvided(_)));
    }

    #[tokio::test]
    async fn fn_method_forwards_id_and_body() {
        let m = FnMethod(|id: String, body: Value| async move { Ok::<_, ApiError>(json!({ "id": id, "got": body })) });
        let out = m.invoke("u1", json!(5)).await.unwrap();
        assert_eq!(out, json!({ "id": "u1", "got": 5 }));
    }
}
